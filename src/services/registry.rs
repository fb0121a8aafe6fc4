//! Export registry - in-memory map from export id to immutable export record
//!
//! Append-only: records are inserted once and never updated or removed.
//! Every export stays resident for the lifetime of the registry (there is
//! no eviction), which bounds how long a process can run under load.

use crate::domain::error::ExportError;
use crate::domain::types::{ExportId, ExportRecord};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ExportRegistry {
    records: RwLock<FxHashMap<ExportId, Arc<ExportRecord>>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its export id.
    ///
    /// Re-inserting an identical record is a no-op. A different record under
    /// an existing id is refused and the stored record is left untouched.
    pub fn put(&self, record: ExportRecord) -> Result<Arc<ExportRecord>, ExportError> {
        let mut records = self.records.write();
        if let Some(existing) = records.get(&record.export_id) {
            if **existing == record {
                return Ok(existing.clone());
            }
            return Err(ExportError::Internal(format!(
                "export id collision: {}",
                record.export_id
            )));
        }
        let record = Arc::new(record);
        records.insert(record.export_id.clone(), record.clone());
        Ok(record)
    }

    pub fn get(&self, export_id: &ExportId) -> Option<Arc<ExportRecord>> {
        self.records.read().get(export_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Attestation, AttestationSource, ExportDocument, Fingerprint};
    use chrono::Utc;

    fn record(id: &str, hash: &str) -> ExportRecord {
        ExportRecord {
            export_id: ExportId::from(id),
            fingerprint: Fingerprint::from_hex(hash),
            created_at: Utc::now(),
            attestation: Attestation {
                id: "FALLBACK_test".to_string(),
                source: AttestationSource::LocalFallback,
            },
            document: ExportDocument::default(),
        }
    }

    #[test]
    fn test_put_then_get() {
        let registry = ExportRegistry::new();
        assert!(registry.is_empty());

        let stored = registry.put(record("a", "aa")).unwrap();
        assert_eq!(registry.len(), 1);

        let fetched = registry.get(&ExportId::from("a")).unwrap();
        assert_eq!(fetched, stored);
        assert!(registry.get(&ExportId::from("missing")).is_none());
    }

    #[test]
    fn test_identical_put_is_idempotent() {
        let registry = ExportRegistry::new();
        let rec = record("a", "aa");
        registry.put(rec.clone()).unwrap();
        registry.put(rec).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_put_keeps_original() {
        let registry = ExportRegistry::new();
        registry.put(record("a", "aa")).unwrap();

        let err = registry.put(record("a", "bb")).unwrap_err();
        assert!(matches!(err, ExportError::Internal(_)));
        assert_eq!(registry.get(&ExportId::from("a")).unwrap().fingerprint.as_str(), "aa");
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = ExportRegistry::new();
        let second = ExportRegistry::new();
        first.put(record("a", "aa")).unwrap();
        assert!(second.get(&ExportId::from("a")).is_none());
    }

    #[test]
    fn test_concurrent_puts_distinct_ids() {
        let registry = Arc::new(ExportRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let id = ExportId::generate();
                        registry.put(record(id.as_str(), "aa")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }
}
