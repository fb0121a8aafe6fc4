//! Prometheus text exposition of export metrics
//!
//! Served by the API server at `/metrics`.

use crate::infra::metrics::{Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with cumulative buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {cumulative}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics, registry_size: usize, site_id: &str) -> String {
    let summary = metrics.report(registry_size);
    let mut output = String::with_capacity(4096);

    write_request_metrics(&mut output, site_id, &summary);
    write_latency_metrics(&mut output, site_id, &summary);

    output
}

fn write_request_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "crm_exports_created_total",
        "Exports created and stored",
        MetricType::Counter,
        site,
        summary.exports_created,
    );
    write_metric(
        output,
        "crm_export_downloads_total",
        "Export documents served",
        MetricType::Counter,
        site,
        summary.downloads,
    );
    write_metric(
        output,
        "crm_export_not_found_total",
        "Lookups for unknown export ids",
        MetricType::Counter,
        site,
        summary.not_found,
    );
    write_metric(
        output,
        "crm_export_invalid_requests_total",
        "Create requests rejected as malformed",
        MetricType::Counter,
        site,
        summary.invalid_requests,
    );
    write_metric(
        output,
        "crm_export_failed_requests_total",
        "Requests failed with an internal or size error",
        MetricType::Counter,
        site,
        summary.failed_requests,
    );
    write_metric(
        output,
        "crm_attestation_fallbacks_total",
        "Exports attested locally because the authority failed",
        MetricType::Counter,
        site,
        summary.attestation_fallbacks,
    );
    write_metric(
        output,
        "crm_export_registry_size",
        "Export records resident in memory",
        MetricType::Gauge,
        site,
        summary.registry_size as u64,
    );
}

fn write_latency_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_histogram(
        output,
        "crm_export_create_latency_us",
        "Export creation latency in microseconds",
        site,
        &summary.lat_buckets,
        summary.create_lat_sum_us,
    );
    write_metric(
        output,
        "crm_export_create_latency_p99_us",
        "99th percentile export creation latency",
        MetricType::Gauge,
        site,
        summary.create_lat_p99_us,
    );
    write_metric(
        output,
        "crm_export_create_latency_max_us",
        "Maximum export creation latency",
        MetricType::Gauge,
        site,
        summary.create_lat_max_us,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ExportError;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_export_created(150);
        metrics.record_export_created(250);
        metrics.record_download();
        metrics.record_error(&ExportError::NotFound("x".into()));

        let output = format_prometheus_metrics(&metrics, 2, "office");

        assert!(output.contains("crm_exports_created_total{site=\"office\"} 2"));
        assert!(output.contains("crm_export_downloads_total{site=\"office\"} 1"));
        assert!(output.contains("crm_export_not_found_total{site=\"office\"} 1"));
        assert!(output.contains("crm_export_registry_size{site=\"office\"} 2"));
        assert!(output.contains("crm_export_create_latency_us_bucket{site=\"office\",le=\"100\"} 0"));
        assert!(output.contains("crm_export_create_latency_us_bucket{site=\"office\",le=\"+Inf\"} 2"));
        assert!(output.contains("crm_export_create_latency_us_sum{site=\"office\"} 400"));
        assert!(output.contains("# TYPE crm_export_create_latency_us histogram"));
    }
}
