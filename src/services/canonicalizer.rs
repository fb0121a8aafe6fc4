//! Canonicalizer - projects a store snapshot onto a customer subset
//!
//! Selection rules:
//! - customers whose id is requested
//! - jobs whose `customerId` is requested
//! - notes whose parent is a requested customer or a selected job; notes
//!   with any other parent type are left out
//!
//! Each output sequence is sorted ascending by id. That ordering is what
//! makes the document (and therefore its fingerprint) reproducible.

use crate::domain::error::ExportError;
use crate::domain::store::StoreSnapshot;
use crate::domain::types::{ExportDocument, ParentType, RecordId};
use rustc_hash::FxHashSet;

/// Build the canonical export document for `customer_ids`.
///
/// Input order and duplicates in `customer_ids` do not affect the result.
/// Fails with `InvalidRequest` if a snapshot collection repeats an id.
pub fn canonicalize(
    store: &StoreSnapshot,
    customer_ids: &[RecordId],
) -> Result<ExportDocument, ExportError> {
    ensure_unique("customer", store.customers.iter().map(|c| c.id))?;
    ensure_unique("job", store.jobs.iter().map(|j| j.id))?;
    ensure_unique("note", store.notes.iter().map(|n| n.id))?;

    let requested: FxHashSet<RecordId> = customer_ids.iter().copied().collect();

    let mut customers: Vec<_> =
        store.customers.iter().filter(|c| requested.contains(&c.id)).cloned().collect();
    customers.sort_by_key(|c| c.id);

    let mut jobs: Vec<_> =
        store.jobs.iter().filter(|j| requested.contains(&j.customer_id)).cloned().collect();
    jobs.sort_by_key(|j| j.id);

    let selected_jobs: FxHashSet<RecordId> = jobs.iter().map(|j| j.id).collect();

    let mut notes: Vec<_> = store
        .notes
        .iter()
        .filter(|n| match n.parent_type {
            ParentType::Customer => requested.contains(&n.parent_id),
            ParentType::Job => selected_jobs.contains(&n.parent_id),
            ParentType::Other => false,
        })
        .cloned()
        .collect();
    notes.sort_by_key(|n| n.id);

    Ok(ExportDocument { customers, jobs, notes })
}

fn ensure_unique(
    kind: &str,
    ids: impl Iterator<Item = RecordId>,
) -> Result<(), ExportError> {
    let mut seen = FxHashSet::default();
    for id in ids {
        if !seen.insert(id) {
            return Err(ExportError::InvalidRequest(format!("duplicate {} id {} in storeData", kind, id)));
        }
    }
    Ok(())
}
