//! Create-export request decoding
//!
//! The request shape is checked once, here, before any canonicalization
//! work happens. Each shape problem maps to a typed `InvalidRequest`.

use crate::domain::error::ExportError;
use crate::domain::store::StoreSnapshot;
use crate::domain::types::RecordId;
use serde::Serialize;
use serde_json::{Map, Value};

const STORE_COLLECTIONS: [&str; 3] = ["customers", "jobs", "notes"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExportRequest {
    pub customer_ids: Vec<RecordId>,
    pub store_data: StoreSnapshot,
}

impl CreateExportRequest {
    pub fn new(customer_ids: Vec<RecordId>, store_data: StoreSnapshot) -> Self {
        Self { customer_ids, store_data }
    }

    /// Decode and validate a `{customerIds, storeData}` JSON body
    pub fn from_json(body: &[u8]) -> Result<Self, ExportError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| ExportError::InvalidRequest(format!("malformed JSON body: {}", e)))?;

        let Value::Object(mut fields) = payload else {
            return Err(ExportError::InvalidRequest("request body must be a JSON object".into()));
        };

        let Some(Value::Array(raw_ids)) = fields.remove("customerIds") else {
            return Err(ExportError::InvalidRequest("customerIds array required".into()));
        };

        let Some(Value::Object(store)) = fields.remove("storeData") else {
            return Err(ExportError::InvalidRequest("storeData object required".into()));
        };
        check_store_shape(&store)?;

        let customer_ids = raw_ids
            .into_iter()
            .map(|raw| {
                serde_json::from_value::<RecordId>(raw.clone()).map_err(|_| {
                    ExportError::InvalidRequest(format!("invalid customer id: {}", raw))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let store_data: StoreSnapshot = serde_json::from_value(Value::Object(store))
            .map_err(|e| ExportError::InvalidRequest(format!("invalid storeData: {}", e)))?;

        Ok(Self { customer_ids, store_data })
    }
}

fn check_store_shape(store: &Map<String, Value>) -> Result<(), ExportError> {
    let complete = STORE_COLLECTIONS
        .iter()
        .all(|key| matches!(store.get(*key), Some(Value::Array(_))));
    if complete {
        Ok(())
    } else {
        Err(ExportError::InvalidRequest("storeData missing customers, jobs, or notes".into()))
    }
}
