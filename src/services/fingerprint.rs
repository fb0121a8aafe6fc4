//! Fingerprint engine - SHA-256 over the canonical JSON encoding
//!
//! The canonical encoding is compact JSON with keys in declaration order
//! (`customers`, `jobs`, `notes`, then each record's fields). This matches
//! what a browser produces with `JSON.stringify` on the same document, so
//! producer and consumer agree byte for byte.

use crate::domain::error::ExportError;
use crate::domain::types::{ExportDocument, Fingerprint};
use sha2::{Digest, Sha256};

/// Canonical byte encoding of a document
pub fn canonical_bytes(document: &ExportDocument) -> Result<Vec<u8>, ExportError> {
    serde_json::to_vec(document)
        .map_err(|e| ExportError::Internal(format!("document serialization failed: {}", e)))
}

/// Compute the lowercase hex SHA-256 fingerprint of a document
pub fn fingerprint(document: &ExportDocument) -> Result<Fingerprint, ExportError> {
    let bytes = canonical_bytes(document)?;
    Ok(fingerprint_bytes(&bytes))
}

/// Fingerprint of already-canonical bytes
#[inline]
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let digest = Sha256::digest(bytes);
    Fingerprint::from_hex(&hex::encode(digest))
}
