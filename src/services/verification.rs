//! Verification protocol - consumer-side integrity check of a downloaded export
//!
//! The consumer recomputes the fingerprint of the document it received and
//! compares it with every fingerprint it was told about: the one advertised
//! next to the download (ETag) and the one returned at creation time, if
//! retained. MATCH requires all available values to agree.
//!
//! Downloaded bytes are hashed as received: they are parsed only to drop
//! formatting whitespace, keeping every field, its key order and its JSON
//! type. A body that was coerced, reordered or padded with extra fields
//! therefore hashes differently from the canonical document.

use crate::domain::error::ExportError;
use crate::domain::types::{ExportDocument, Fingerprint};
use crate::services::fingerprint::{fingerprint, fingerprint_bytes};
use serde::Serialize;
use serde_json::Value;

const DOCUMENT_COLLECTIONS: [&str; 3] = ["customers", "jobs", "notes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationOutcome {
    Match,
    Mismatch,
}

impl VerificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationOutcome::Match => "MATCH",
            VerificationOutcome::Mismatch => "MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub computed: Fingerprint,
    pub advertised: Option<String>,
    pub expected: Option<String>,
    pub outcome: VerificationOutcome,
}

impl VerificationReport {
    pub fn is_match(&self) -> bool {
        self.outcome == VerificationOutcome::Match
    }
}

fn report(
    computed: Fingerprint,
    advertised: Option<&str>,
    expected: Option<&str>,
) -> VerificationReport {
    let outcome = if [advertised, expected].into_iter().flatten().all(|fp| computed.matches(fp)) {
        VerificationOutcome::Match
    } else {
        VerificationOutcome::Mismatch
    };

    VerificationReport {
        computed,
        advertised: advertised.map(str::to_string),
        expected: expected.map(str::to_string),
        outcome,
    }
}

/// Verify an already-decoded document
pub fn verify_document(
    document: &ExportDocument,
    advertised: Option<&str>,
    expected: Option<&str>,
) -> Result<VerificationReport, ExportError> {
    Ok(report(fingerprint(document)?, advertised, expected))
}

/// Verify downloaded bytes.
///
/// Bytes that are not JSON, or not an object holding `customers`, `jobs`
/// and `notes` arrays, are an error rather than a mismatch. Anything that
/// passes that check is hashed exactly as received.
pub fn verify_download(
    body: &[u8],
    advertised: Option<&str>,
    expected: Option<&str>,
) -> Result<VerificationReport, ExportError> {
    let not_a_document = |reason: String| {
        ExportError::InvalidRequest(format!("downloaded body is not an export document: {}", reason))
    };

    let value: Value = serde_json::from_slice(body).map_err(|e| not_a_document(e.to_string()))?;
    let shaped = value.as_object().is_some_and(|fields| {
        DOCUMENT_COLLECTIONS.iter().all(|key| matches!(fields.get(*key), Some(Value::Array(_))))
    });
    if !shaped {
        return Err(not_a_document("expected customers, jobs and notes arrays".to_string()));
    }

    let compact = serde_json::to_vec(&value).map_err(|e| ExportError::Internal(e.to_string()))?;
    Ok(report(fingerprint_bytes(&compact), advertised, expected))
}

/// Strip the quotes from an HTTP entity tag (`"abc"` or `W/"abc"`)
pub fn etag_value(etag: &str) -> &str {
    let etag = etag.trim();
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Customer, RecordId};
    use crate::services::fingerprint::canonical_bytes;

    fn document() -> ExportDocument {
        ExportDocument {
            customers: vec![Customer {
                id: RecordId(1),
                name: "Acme Corp".to_string(),
                email: None,
                phone: Some("555-0100".to_string()),
            }],
            jobs: vec![],
            notes: vec![],
        }
    }

    #[test]
    fn test_match_all_sources() {
        let doc = document();
        let fp = fingerprint(&doc).unwrap();
        let upper = fp.as_str().to_ascii_uppercase();

        let report = verify_document(&doc, Some(fp.as_str()), Some(upper.as_str())).unwrap();
        assert!(report.is_match());
        assert_eq!(report.computed, fp);
    }

    #[test]
    fn test_mismatch_when_any_source_differs() {
        let doc = document();
        let fp = fingerprint(&doc).unwrap();
        let other = "0".repeat(64);

        let report = verify_document(&doc, Some(fp.as_str()), Some(other.as_str())).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);

        let report = verify_document(&doc, Some(other.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_missing_sources_are_skipped() {
        let doc = document();
        let fp = fingerprint(&doc).unwrap();
        assert!(verify_document(&doc, None, Some(fp.as_str())).unwrap().is_match());
        assert!(verify_document(&doc, None, None).unwrap().is_match());
    }

    #[test]
    fn test_verify_pretty_printed_download() {
        let doc = document();
        let fp = fingerprint(&doc).unwrap();
        let body = serde_json::to_vec_pretty(&doc).unwrap();

        let report = verify_download(&body, Some(fp.as_str()), Some(fp.as_str())).unwrap();
        assert!(report.is_match());
    }

    #[test]
    fn test_tampered_download_detected() {
        let doc = document();
        let fp = fingerprint(&doc).unwrap();
        let body = serde_json::to_string_pretty(&doc).unwrap().replace("Acme Corp", "Acme Co");

        let report = verify_download(body.as_bytes(), Some(fp.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_undecodable_download_is_error() {
        assert!(verify_download(b"<html>", None, None).is_err());
        assert!(verify_download(b"[1, 2]", None, None).is_err());
        assert!(verify_download(br#"{"customers": [], "jobs": []}"#, None, None).is_err());
    }

    #[test]
    fn test_download_hash_matches_canonical_fingerprint() {
        let doc = document();
        let canonical = String::from_utf8(canonical_bytes(&doc).unwrap()).unwrap();
        let report = verify_download(canonical.as_bytes(), None, None).unwrap();
        assert_eq!(report.computed, fingerprint(&doc).unwrap());
    }

    #[test]
    fn test_type_coerced_download_detected() {
        let fp = fingerprint(&document()).unwrap();
        let body = r#"{"customers":[{"id":"1","name":"Acme Corp","phone":"555-0100"}],"jobs":[],"notes":[]}"#;

        let report = verify_download(body.as_bytes(), Some(fp.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_injected_fields_detected() {
        let fp = fingerprint(&document()).unwrap();

        let extra_record_field = r#"{"customers":[{"id":1,"name":"Acme Corp","phone":"555-0100","isAdmin":true}],"jobs":[],"notes":[]}"#;
        let report = verify_download(extra_record_field.as_bytes(), Some(fp.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);

        let null_email = r#"{"customers":[{"id":1,"name":"Acme Corp","email":null,"phone":"555-0100"}],"jobs":[],"notes":[]}"#;
        let report = verify_download(null_email.as_bytes(), Some(fp.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);

        let extra_top_level = r#"{"customers":[{"id":1,"name":"Acme Corp","phone":"555-0100"}],"jobs":[],"notes":[],"extra":1}"#;
        let report = verify_download(extra_top_level.as_bytes(), Some(fp.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_reordered_keys_detected() {
        let fp = fingerprint(&document()).unwrap();
        let body = r#"{"customers":[{"name":"Acme Corp","id":1,"phone":"555-0100"}],"jobs":[],"notes":[]}"#;

        let report = verify_download(body.as_bytes(), Some(fp.as_str()), None).unwrap();
        assert_eq!(report.outcome, VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_etag_value() {
        assert_eq!(etag_value("\"abc\""), "abc");
        assert_eq!(etag_value("W/\"abc\""), "abc");
        assert_eq!(etag_value("abc"), "abc");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(VerificationOutcome::Match.as_str(), "MATCH");
        assert_eq!(serde_json::to_string(&VerificationOutcome::Mismatch).unwrap(), "\"MISMATCH\"");
    }
}
