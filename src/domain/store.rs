//! Client-held record store snapshot
//!
//! The snapshot is the sole source of truth the export pipeline reads from.
//! It also supports the lookups and appends the record-entry UI performs:
//! ids are auto-incremented per record kind and `createdAt` is stamped at
//! insertion time.

use crate::domain::types::{iso_timestamp, Customer, Job, JobStatus, Note, ParentType, RecordId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub customers: Vec<Customer>,
    pub jobs: Vec<Job>,
    pub notes: Vec<Note>,
}

/// Job fields supplied by the caller; id and `createdAt` are assigned
#[derive(Debug, Clone)]
pub struct NewJob {
    pub customer_id: RecordId,
    pub description: String,
    pub scheduled_at: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub parent_type: ParentType,
    pub parent_id: RecordId,
    pub text: String,
}

/// Next auto-increment id: max(existing, 0) + 1
fn next_id(ids: impl Iterator<Item = RecordId>) -> RecordId {
    RecordId(ids.map(|id| id.0).fold(0, i64::max) + 1)
}

impl StoreSnapshot {
    /// Seed data used when no stored state exists yet
    pub fn sample() -> Self {
        let now = iso_timestamp(&Utc::now());
        Self {
            customers: vec![
                Customer {
                    id: RecordId(1),
                    name: "Acme Corp".to_string(),
                    email: Some("contact@acme.com".to_string()),
                    phone: Some("555-0100".to_string()),
                },
                Customer {
                    id: RecordId(2),
                    name: "Globex Inc".to_string(),
                    email: Some("info@globex.com".to_string()),
                    phone: Some("555-0200".to_string()),
                },
                Customer {
                    id: RecordId(3),
                    name: "Initech Ltd".to_string(),
                    email: Some("hello@initech.com".to_string()),
                    phone: Some("555-0300".to_string()),
                },
            ],
            jobs: vec![Job {
                id: RecordId(1),
                customer_id: RecordId(1),
                description: "Install new HVAC system".to_string(),
                scheduled_at: "2026-02-10T09:00".to_string(),
                status: JobStatus::Pending,
                created_at: now.clone(),
            }],
            notes: vec![Note {
                id: RecordId(1),
                parent_type: ParentType::Customer,
                parent_id: RecordId(1),
                text: "Prefers morning appointments".to_string(),
                created_at: now,
            }],
        }
    }

    pub fn customer_by_id(&self, id: RecordId) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    pub fn jobs_for_customer(&self, customer_id: RecordId) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(move |j| j.customer_id == customer_id)
    }

    pub fn notes_for_parent(
        &self,
        parent_type: ParentType,
        parent_id: RecordId,
    ) -> impl Iterator<Item = &Note> {
        self.notes
            .iter()
            .filter(move |n| n.parent_type == parent_type && n.parent_id == parent_id)
    }

    pub fn add_job(&mut self, job: NewJob) -> Job {
        let job = Job {
            id: next_id(self.jobs.iter().map(|j| j.id)),
            customer_id: job.customer_id,
            description: job.description,
            scheduled_at: job.scheduled_at,
            status: job.status,
            created_at: iso_timestamp(&Utc::now()),
        };
        self.jobs.push(job.clone());
        job
    }

    pub fn add_note(&mut self, note: NewNote) -> Note {
        let note = Note {
            id: next_id(self.notes.iter().map(|n| n.id)),
            parent_type: note.parent_type,
            parent_id: note.parent_id,
            text: note.text,
            created_at: iso_timestamp(&Utc::now()),
        };
        self.notes.push(note.clone());
        note
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_store() {
        let store = StoreSnapshot::sample();
        assert_eq!(store.customers.len(), 3);
        assert_eq!(store.customer_by_id(RecordId(2)).map(|c| c.name.as_str()), Some("Globex Inc"));
        assert!(store.customer_by_id(RecordId(9)).is_none());
        assert_eq!(store.jobs_for_customer(RecordId(1)).count(), 1);
        assert_eq!(store.notes_for_parent(ParentType::Customer, RecordId(1)).count(), 1);
        assert_eq!(store.notes_for_parent(ParentType::Job, RecordId(1)).count(), 0);
    }

    #[test]
    fn test_add_job_auto_increments() {
        let mut store = StoreSnapshot::default();
        let first = store.add_job(NewJob {
            customer_id: RecordId(1),
            description: "Survey".to_string(),
            scheduled_at: "2026-03-01T10:00".to_string(),
            status: JobStatus::Scheduled,
        });
        assert_eq!(first.id, RecordId(1));

        store.jobs[0].id = RecordId(41);
        let second = store.add_job(NewJob {
            customer_id: RecordId(2),
            description: "Repair".to_string(),
            scheduled_at: "2026-03-02T10:00".to_string(),
            status: JobStatus::Pending,
        });
        assert_eq!(second.id, RecordId(42));
        assert!(second.created_at.ends_with('Z'));
        assert_eq!(store.jobs.len(), 2);
    }

    #[test]
    fn test_add_note_ids_independent_of_jobs() {
        let mut store = StoreSnapshot::sample();
        let note = store.add_note(NewNote {
            parent_type: ParentType::Job,
            parent_id: RecordId(1),
            text: "Bring ladder".to_string(),
        });
        assert_eq!(note.id, RecordId(2));
        assert_eq!(store.notes_for_parent(ParentType::Job, RecordId(1)).count(), 1);
    }
}
