//! Export service - orchestrates canonicalize, fingerprint, attest, store
//!
//! Creation is all-or-nothing from the caller's point of view: the record
//! is inserted into the registry only after every preceding step succeeded.

use crate::domain::error::ExportError;
use crate::domain::request::CreateExportRequest;
use crate::domain::store::StoreSnapshot;
use crate::domain::types::{
    Attestation, ExportDocument, ExportId, ExportReceipt, ExportRecord, Fingerprint, RecordId,
};
use crate::infra::metrics::Metrics;
use crate::services::attestation::AttestationProvider;
use crate::services::canonicalizer::canonicalize;
use crate::services::fingerprint::fingerprint;
use crate::services::registry::ExportRegistry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Stored document plus the integrity metadata served alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedExport {
    pub export_id: ExportId,
    pub document: ExportDocument,
    pub fingerprint: Fingerprint,
    pub attestation: Attestation,
}

impl RetrievedExport {
    pub fn filename(&self) -> String {
        self.export_id.filename()
    }
}

pub struct ExportService {
    registry: Arc<ExportRegistry>,
    attestor: Arc<dyn AttestationProvider>,
    metrics: Arc<Metrics>,
}

impl ExportService {
    pub fn new(
        registry: Arc<ExportRegistry>,
        attestor: Arc<dyn AttestationProvider>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { registry, attestor, metrics }
    }

    pub fn registry(&self) -> &ExportRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Decode a raw create body and run the export
    pub async fn create_export_json(&self, body: &[u8]) -> Result<ExportReceipt, ExportError> {
        let request = CreateExportRequest::from_json(body)?;
        self.create_export(&request.store_data, &request.customer_ids).await
    }

    /// Canonicalize, fingerprint and store an export; returns metadata only
    pub async fn create_export(
        &self,
        store: &StoreSnapshot,
        customer_ids: &[RecordId],
    ) -> Result<ExportReceipt, ExportError> {
        let start = Instant::now();

        let document = canonicalize(store, customer_ids)?;
        let fingerprint = fingerprint(&document)?;
        let attestation = self.attestor.attest(&fingerprint).await?;

        let record = ExportRecord {
            export_id: ExportId::generate(),
            fingerprint,
            created_at: Utc::now(),
            attestation,
            document,
        };
        let record = self.registry.put(record)?;

        let latency_us = start.elapsed().as_micros() as u64;
        self.metrics.record_export_created(latency_us);
        info!(
            export_id = %record.export_id,
            hash = %record.fingerprint,
            customers = %record.document.customers.len(),
            jobs = %record.document.jobs.len(),
            notes = %record.document.notes.len(),
            attestation_source = %record.attestation.source.as_str(),
            latency_us = %latency_us,
            "export_created"
        );

        Ok(record.receipt())
    }

    /// Creation metadata for an existing export
    pub fn get_receipt(&self, export_id: &ExportId) -> Result<ExportReceipt, ExportError> {
        self.registry
            .get(export_id)
            .map(|record| record.receipt())
            .ok_or_else(|| ExportError::NotFound(export_id.to_string()))
    }

    /// Document plus fingerprint and attestation id; no side effects on the registry
    pub fn get_export(&self, export_id: &ExportId) -> Result<RetrievedExport, ExportError> {
        let record = self
            .registry
            .get(export_id)
            .ok_or_else(|| ExportError::NotFound(export_id.to_string()))?;

        debug!(export_id = %export_id, "export_retrieved");
        Ok(RetrievedExport {
            export_id: record.export_id.clone(),
            document: record.document.clone(),
            fingerprint: record.fingerprint.clone(),
            attestation: record.attestation.clone(),
        })
    }
}
