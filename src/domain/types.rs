//! Shared record and export types for the CRM export pipeline

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Integer identity of a Customer, Job or Note.
///
/// Deserializes from a JSON integer or from a string holding a base-10
/// integer, so `"2"` and `2` name the same record. Always serializes as a
/// JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value)
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(RecordId)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct RecordIdVisitor;

        impl<'de> Visitor<'de> for RecordIdVisitor {
            type Value = RecordId;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an integer id or a string containing one")
            }

            fn visit_i64<E>(self, value: i64) -> Result<RecordId, E>
            where
                E: de::Error,
            {
                Ok(RecordId(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<RecordId, E>
            where
                E: de::Error,
            {
                i64::try_from(value)
                    .map(RecordId)
                    .map_err(|_| E::custom(format!("id {} out of range", value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<RecordId, E>
            where
                E: de::Error,
            {
                // JSON producers sometimes emit integral ids as 1.0
                if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
                    Ok(RecordId(value as i64))
                } else {
                    Err(E::custom(format!("id {} is not an integer", value)))
                }
            }

            fn visit_str<E>(self, value: &str) -> Result<RecordId, E>
            where
                E: de::Error,
            {
                value
                    .parse::<RecordId>()
                    .map_err(|_| E::custom(format!("id {:?} is not an integer", value)))
            }
        }

        deserializer.deserialize_any(RecordIdVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(JobStatus::Pending),
            "scheduled" => Ok(JobStatus::Scheduled),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            other => Err(format!("unknown job status {:?}", other)),
        }
    }
}

/// Field order is the canonical key order used for fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: RecordId,
    pub customer_id: RecordId,
    pub description: String,
    /// Carried verbatim, e.g. "2026-02-10T09:00"
    pub scheduled_at: String,
    pub status: JobStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentType {
    Customer,
    Job,
    /// Any other parent kind; such notes are never exported
    #[serde(other)]
    Other,
}

impl ParentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentType::Customer => "customer",
            ParentType::Job => "job",
            ParentType::Other => "other",
        }
    }
}

/// Only the exportable parent kinds parse; `Other` exists for decoded input
impl std::str::FromStr for ParentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "customer" => Ok(ParentType::Customer),
            "job" => Ok(ParentType::Job),
            other => Err(format!("unknown parent type {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: RecordId,
    pub parent_type: ParentType,
    pub parent_id: RecordId,
    pub text: String,
    pub created_at: String,
}

/// Filtered, id-ordered projection of the records owned by a customer subset.
///
/// Serialized key order (`customers`, `jobs`, `notes`, then each record's
/// declaration order) is what the fingerprint is computed over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub customers: Vec<Customer>,
    pub jobs: Vec<Job>,
    pub notes: Vec<Note>,
}

/// Lowercase hex SHA-256 digest of a canonical export document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-rendered digest, normalizing to lowercase.
    pub fn from_hex(hex: &str) -> Self {
        Fingerprint(hex.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive hex comparison
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque export identifier (random UUID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportId(String);

impl ExportId {
    pub fn generate() -> Self {
        ExportId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Suggested filename for client-side saving
    pub fn filename(&self) -> String {
        format!("export-{}.json", self.0)
    }
}

impl From<&str> for ExportId {
    fn from(value: &str) -> Self {
        ExportId(value.to_string())
    }
}

impl std::fmt::Display for ExportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationSource {
    /// Issued by the external proof authority
    Authority,
    /// Locally generated placeholder, not a real proof
    LocalFallback,
}

impl AttestationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationSource::Authority => "authority",
            AttestationSource::LocalFallback => "local_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub id: String,
    pub source: AttestationSource,
}

/// Immutable record held by the export registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub export_id: ExportId,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub attestation: Attestation,
    pub document: ExportDocument,
}

impl ExportRecord {
    pub fn receipt(&self) -> ExportReceipt {
        ExportReceipt {
            export_id: self.export_id.clone(),
            hash: self.fingerprint.clone(),
            timestamp: iso_timestamp(&self.created_at),
            attestation_id: self.attestation.id.clone(),
            attestation_source: self.attestation.source,
        }
    }
}

/// Metadata returned from export creation (the document is fetched separately)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
    pub export_id: ExportId,
    pub hash: Fingerprint,
    pub timestamp: String,
    pub attestation_id: String,
    pub attestation_source: AttestationSource,
}

/// ISO-8601 UTC with millisecond precision, e.g. `2026-02-10T09:00:00.000Z`
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_int_and_string() {
        let ids: Vec<RecordId> = serde_json::from_str(r#"[1, "2", " 3 ", 4.0]"#).unwrap();
        assert_eq!(ids, vec![RecordId(1), RecordId(2), RecordId(3), RecordId(4)]);
    }

    #[test]
    fn test_record_id_rejects_garbage() {
        assert!(serde_json::from_str::<RecordId>(r#""abc""#).is_err());
        assert!(serde_json::from_str::<RecordId>("1.5").is_err());
        assert!(serde_json::from_str::<RecordId>("true").is_err());
        assert!(serde_json::from_str::<RecordId>("null").is_err());
    }

    #[test]
    fn test_record_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&RecordId(7)).unwrap(), "7");
    }

    #[test]
    fn test_customer_omits_missing_contact_fields() {
        let customer: Customer =
            serde_json::from_str(r#"{"id":"1","name":"Acme","email":null,"extra":true}"#).unwrap();
        assert_eq!(customer.email, None);
        assert_eq!(serde_json::to_string(&customer).unwrap(), r#"{"id":1,"name":"Acme"}"#);
    }

    #[test]
    fn test_job_key_order_and_status() {
        let job: Job = serde_json::from_str(
            r#"{"status":"in_progress","id":10,"createdAt":"c","customerId":1,
                "scheduledAt":"s","description":"d"}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(
            serde_json::to_string(&job).unwrap(),
            r#"{"id":10,"customerId":1,"description":"d","scheduledAt":"s","status":"in_progress","createdAt":"c"}"#
        );
    }

    #[test]
    fn test_unknown_job_status_rejected() {
        let bad_status = r#"{"id":1,"customerId":1,"description":"d","scheduledAt":"s","status":"cancelled","createdAt":"c"}"#;
        assert!(serde_json::from_str::<Job>(bad_status).is_err());
    }

    #[test]
    fn test_foreign_parent_type_decodes_as_other() {
        let note: Note = serde_json::from_str(
            r#"{"id":1,"parentType":"invoice","parentId":1,"text":"t","createdAt":"c"}"#,
        )
        .unwrap();
        assert_eq!(note.parent_type, ParentType::Other);

        let note: Note = serde_json::from_str(
            r#"{"id":2,"parentType":"job","parentId":1,"text":"t","createdAt":"c"}"#,
        )
        .unwrap();
        assert_eq!(note.parent_type, ParentType::Job);
    }

    #[test]
    fn test_enum_labels_parse() {
        assert_eq!("in_progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert!("cancelled".parse::<JobStatus>().is_err());
        assert_eq!("job".parse::<ParentType>(), Ok(ParentType::Job));
        assert!("invoice".parse::<ParentType>().is_err());
        assert!("other".parse::<ParentType>().is_err());
    }

    #[test]
    fn test_fingerprint_case_insensitive() {
        let fp = Fingerprint::from_hex("ABCDEF01");
        assert_eq!(fp.as_str(), "abcdef01");
        assert!(fp.matches("AbCdEf01"));
        assert!(!fp.matches("abcdef02"));
    }

    #[test]
    fn test_export_id_filename() {
        let id = ExportId::from("abc");
        assert_eq!(id.filename(), "export-abc.json");
        assert_ne!(ExportId::generate(), ExportId::generate());
    }
}
