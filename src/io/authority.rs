//! Proof authority client
//!
//! Submits an export fingerprint to an external attestation authority and
//! returns the proof id it issues. Request: `POST <url>` with
//! `{"hash": "<fingerprint>"}`; response: `{"proofId": "..."}`.

use crate::domain::error::ExportError;
use crate::domain::types::{Attestation, AttestationSource, Fingerprint};
use crate::services::attestation::AttestationProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Serialize)]
struct ProofRequest<'a> {
    hash: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofResponse {
    proof_id: String,
}

pub struct AuthorityAttestor {
    url: String,
    http_client: reqwest::Client,
}

impl AuthorityAttestor {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ExportError> {
        // Create HTTP client once for reuse (connection pooling)
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .http1_only()
            .build()
            .map_err(|e| ExportError::Internal(format!("attestation client init failed: {}", e)))?;

        info!(url = %url, timeout_ms = %timeout.as_millis(), "attestation_authority_configured");
        Ok(Self { url: url.to_string(), http_client })
    }
}

#[async_trait]
impl AttestationProvider for AuthorityAttestor {
    async fn attest(&self, fingerprint: &Fingerprint) -> Result<Attestation, ExportError> {
        let start = Instant::now();
        let body = serde_json::to_vec(&ProofRequest { hash: fingerprint.as_str() })
            .map_err(|e| ExportError::Internal(e.to_string()))?;

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| ExportError::Attestation(format!("authority unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Attestation(format!("authority returned {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::Attestation(format!("authority body read failed: {}", e)))?;
        let proof: ProofResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ExportError::Attestation(format!("authority response malformed: {}", e)))?;

        if proof.proof_id.trim().is_empty() {
            return Err(ExportError::Attestation("authority returned empty proof id".into()));
        }

        debug!(
            hash = %fingerprint,
            proof_id = %proof.proof_id,
            latency_us = %start.elapsed().as_micros(),
            "attestation_issued"
        );
        Ok(Attestation { id: proof.proof_id, source: AttestationSource::Authority })
    }
}
