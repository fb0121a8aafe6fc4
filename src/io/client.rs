//! Export API client - the consumer side of the verification protocol
//!
//! Creates exports, downloads documents together with their integrity
//! headers, and hands the raw bytes to `verify_download`.

use crate::domain::error::ExportError;
use crate::domain::request::CreateExportRequest;
use crate::domain::store::StoreSnapshot;
use crate::domain::types::{ExportId, ExportReceipt, RecordId};
use crate::io::api::ATTESTATION_ID_HEADER;
use crate::services::verification::{etag_value, verify_download, VerificationReport};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// A downloaded export document with the metadata served next to it
#[derive(Debug, Clone)]
pub struct DownloadedExport {
    pub export_id: ExportId,
    pub body: Bytes,
    /// Fingerprint advertised in the ETag header, quotes stripped
    pub etag_hash: Option<String>,
    pub attestation_id: Option<String>,
    pub filename: Option<String>,
}

impl DownloadedExport {
    /// Recompute the fingerprint and compare with the ETag and `expected`
    pub fn verify(&self, expected: Option<&str>) -> Result<VerificationReport, ExportError> {
        verify_download(&self.body, self.etag_hash.as_deref(), expected)
    }

    /// Filename suggested by the server, or the conventional one
    pub fn suggested_filename(&self) -> String {
        self.filename.clone().unwrap_or_else(|| self.export_id.filename())
    }
}

pub struct ExportClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl ExportClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExportError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .http1_only()
            .build()
            .map_err(|e| ExportError::Internal(format!("http client init failed: {}", e)))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http_client })
    }

    pub async fn health(&self) -> Result<bool, ExportError> {
        let response = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        Ok(response.status().is_success())
    }

    pub async fn create_export(
        &self,
        store: &StoreSnapshot,
        customer_ids: &[RecordId],
    ) -> Result<ExportReceipt, ExportError> {
        let request = CreateExportRequest::new(customer_ids.to_vec(), store.clone());
        let body = serde_json::to_vec(&request).map_err(|e| ExportError::Internal(e.to_string()))?;
        self.create_export_raw(body).await
    }

    /// Send a pre-encoded create body as-is
    pub async fn create_export_raw(&self, body: Vec<u8>) -> Result<ExportReceipt, ExportError> {
        let response = self
            .http_client
            .post(format!("{}/api/export", self.base_url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &bytes));
        }

        let receipt: ExportReceipt = serde_json::from_slice(&bytes)
            .map_err(|e| ExportError::Internal(format!("malformed create response: {}", e)))?;
        debug!(export_id = %receipt.export_id, hash = %receipt.hash, "export_create_response");
        Ok(receipt)
    }

    pub async fn download_export(&self, export_id: &ExportId) -> Result<DownloadedExport, ExportError> {
        let response = self
            .http_client
            .get(format!("{}/api/export/{}/download", self.base_url, export_id))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        Ok(DownloadedExport {
            export_id: export_id.clone(),
            body,
            etag_hash: header_str(&headers, "ETag").map(|v| etag_value(v).to_string()),
            attestation_id: header_str(&headers, ATTESTATION_ID_HEADER).map(str::to_string),
            filename: header_str(&headers, "Content-Disposition").and_then(disposition_filename),
        })
    }
}

fn transport_error(e: reqwest::Error) -> ExportError {
    ExportError::Internal(format!("request failed: {}", e))
}

/// Map an error response back onto the error taxonomy
fn status_error(status: u16, body: &[u8]) -> ExportError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    match status {
        400 => ExportError::InvalidRequest(message),
        404 => ExportError::NotFound(message),
        413 => ExportError::PayloadTooLarge(0),
        _ => ExportError::Internal(format!("server returned {}: {}", status, message)),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract `filename` from `attachment; filename="export-x.json"`
fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"export-abc.json\""),
            Some("export-abc.json".to_string())
        );
        assert_eq!(disposition_filename("attachment"), None);
        assert_eq!(disposition_filename("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error(404, br#"{"error":"Export not found"}"#),
            ExportError::NotFound("Export not found".to_string())
        );
        assert_eq!(
            status_error(400, br#"{"error":"customerIds array required"}"#),
            ExportError::InvalidRequest("customerIds array required".to_string())
        );
        assert!(matches!(status_error(500, b"oops"), ExportError::Internal(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ExportClient::new("http://localhost:3001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url, "http://localhost:3001");
    }

    #[test]
    fn test_suggested_filename_fallback() {
        let download = DownloadedExport {
            export_id: ExportId::from("abc"),
            body: Bytes::new(),
            etag_hash: None,
            attestation_id: None,
            filename: None,
        };
        assert_eq!(download.suggested_filename(), "export-abc.json");
    }
}
