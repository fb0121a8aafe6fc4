//! Attestation providers
//!
//! An attestation id stands for third-party proof that an export with a
//! given fingerprint was created. When no proof authority is reachable the
//! export still succeeds with a locally generated placeholder id.

use crate::domain::error::ExportError;
use crate::domain::types::{Attestation, AttestationSource, Fingerprint};
use crate::infra::metrics::Metrics;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Obtain an attestation for the given fingerprint
    async fn attest(&self, fingerprint: &Fingerprint) -> Result<Attestation, ExportError>;
}

/// Generates placeholder ids; never a real proof
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFallbackAttestor;

impl LocalFallbackAttestor {
    pub fn issue(&self) -> Attestation {
        Attestation {
            id: format!("FALLBACK_{}", uuid::Uuid::new_v4()),
            source: AttestationSource::LocalFallback,
        }
    }
}

#[async_trait]
impl AttestationProvider for LocalFallbackAttestor {
    async fn attest(&self, _fingerprint: &Fingerprint) -> Result<Attestation, ExportError> {
        Ok(self.issue())
    }
}

/// Uses the primary provider when available, otherwise the local fallback.
///
/// Never fails: a primary error is logged, counted and replaced by a
/// fallback attestation.
pub struct FallbackAttestor {
    primary: Option<Arc<dyn AttestationProvider>>,
    fallback: LocalFallbackAttestor,
    metrics: Arc<Metrics>,
}

impl FallbackAttestor {
    pub fn new(primary: Option<Arc<dyn AttestationProvider>>, metrics: Arc<Metrics>) -> Self {
        Self { primary, fallback: LocalFallbackAttestor, metrics }
    }

    /// Local fallback only
    pub fn local(metrics: Arc<Metrics>) -> Self {
        Self::new(None, metrics)
    }
}

#[async_trait]
impl AttestationProvider for FallbackAttestor {
    async fn attest(&self, fingerprint: &Fingerprint) -> Result<Attestation, ExportError> {
        let Some(ref primary) = self.primary else {
            return Ok(self.fallback.issue());
        };

        match primary.attest(fingerprint).await {
            Ok(attestation) => Ok(attestation),
            Err(e) => {
                self.metrics.record_attestation_fallback();
                warn!(hash = %fingerprint, error = %e, "attestation_fallback");
                Ok(self.fallback.issue())
            }
        }
    }
}
