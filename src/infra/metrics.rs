//! Lock-free metrics collection and periodic reporting
//!
//! Counters are monotonic atomics updated on the request path. Snapshots
//! read them without resetting, so the Prometheus endpoint and the periodic
//! log line observe the same cumulative values.
//!
//! NOTE: All atomics use Relaxed ordering - these are statistical counters
//! only and never drive request handling.

use crate::domain::error::ExportError;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Create latency bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
pub const METRICS_BUCKET_BOUNDS: [u64; 10] =
    [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
pub const METRICS_NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    METRICS_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

#[inline]
fn load_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    std::array::from_fn(|i| buckets[i].load(Ordering::Relaxed))
}

/// Upper bound of the bucket containing the given percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

pub struct Metrics {
    exports_created: AtomicU64,
    downloads: AtomicU64,
    not_found: AtomicU64,
    invalid_requests: AtomicU64,
    /// Payload-too-large, attestation and internal failures
    failed_requests: AtomicU64,
    attestation_fallbacks: AtomicU64,
    create_latency_sum_us: AtomicU64,
    create_latency_max_us: AtomicU64,
    create_latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            exports_created: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            invalid_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            attestation_fallbacks: AtomicU64::new(0),
            create_latency_sum_us: AtomicU64::new(0),
            create_latency_max_us: AtomicU64::new(0),
            create_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Record a stored export and its end-to-end create latency
    #[inline]
    pub fn record_export_created(&self, latency_us: u64) {
        self.exports_created.fetch_add(1, Ordering::Relaxed);
        self.create_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.create_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.create_latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_download(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_attestation_fallback(&self) {
        self.attestation_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed request by error kind
    #[inline]
    pub fn record_error(&self, error: &ExportError) {
        let counter = match error {
            ExportError::InvalidRequest(_) => &self.invalid_requests,
            ExportError::NotFound(_) => &self.not_found,
            ExportError::PayloadTooLarge(_)
            | ExportError::Attestation(_)
            | ExportError::Internal(_) => &self.failed_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn exports_created(&self) -> u64 {
        self.exports_created.load(Ordering::Relaxed)
    }

    /// Cumulative snapshot; `registry_size` is sampled by the caller
    pub fn report(&self, registry_size: usize) -> MetricsSummary {
        let created = self.exports_created.load(Ordering::Relaxed);
        let lat_buckets = load_buckets(&self.create_latency_buckets);
        let sum = self.create_latency_sum_us.load(Ordering::Relaxed);

        MetricsSummary {
            exports_created: created,
            downloads: self.downloads.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            invalid_requests: self.invalid_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            attestation_fallbacks: self.attestation_fallbacks.load(Ordering::Relaxed),
            registry_size,
            create_lat_sum_us: sum,
            create_lat_avg_us: if created > 0 { sum / created } else { 0 },
            create_lat_max_us: self.create_latency_max_us.load(Ordering::Relaxed),
            create_lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            create_lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub exports_created: u64,
    pub downloads: u64,
    pub not_found: u64,
    pub invalid_requests: u64,
    pub failed_requests: u64,
    pub attestation_fallbacks: u64,
    pub registry_size: usize,
    pub create_lat_sum_us: u64,
    pub create_lat_avg_us: u64,
    pub create_lat_max_us: u64,
    pub create_lat_p50_us: u64,
    pub create_lat_p99_us: u64,
    pub lat_buckets: [u64; METRICS_NUM_BUCKETS],
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            exports_created = %self.exports_created,
            downloads = %self.downloads,
            not_found = %self.not_found,
            invalid_requests = %self.invalid_requests,
            failed_requests = %self.failed_requests,
            attestation_fallbacks = %self.attestation_fallbacks,
            registry_size = %self.registry_size,
            create_avg_us = %self.create_lat_avg_us,
            create_p99_us = %self.create_lat_p99_us,
            "metrics"
        );
    }
}
