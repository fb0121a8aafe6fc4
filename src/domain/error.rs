use thiserror::Error;

/// Errors surfaced by the export pipeline.
///
/// Every variant terminates the current request; none is retried internally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    /// Missing or wrong-shaped `customerIds` or store snapshot
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Export not found")]
    NotFound(String),
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    /// Attestation authority unreachable or answered badly
    #[error("attestation failed: {0}")]
    Attestation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExportError {
    /// HTTP status used at the transport boundary
    pub fn status_code(&self) -> u16 {
        match self {
            ExportError::InvalidRequest(_) => 400,
            ExportError::NotFound(_) => 404,
            ExportError::PayloadTooLarge(_) => 413,
            ExportError::Attestation(_) => 502,
            ExportError::Internal(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::InvalidRequest(_) => "invalid_request",
            ExportError::NotFound(_) => "not_found",
            ExportError::PayloadTooLarge(_) => "payload_too_large",
            ExportError::Attestation(_) => "attestation",
            ExportError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_distinct_from_success() {
        let errors = [
            ExportError::InvalidRequest("customerIds array required".into()),
            ExportError::NotFound("x".into()),
            ExportError::PayloadTooLarge(10),
            ExportError::Attestation("down".into()),
            ExportError::Internal("boom".into()),
        ];
        for e in &errors {
            assert!(e.status_code() >= 400);
        }
        assert_eq!(errors[0].status_code(), 400);
        assert_eq!(errors[1].status_code(), 404);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ExportError::InvalidRequest("storeData object required".into()).to_string(),
            "storeData object required"
        );
        assert_eq!(ExportError::NotFound("abc".into()).to_string(), "Export not found");
    }
}
