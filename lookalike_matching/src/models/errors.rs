// src/models/errors.rs
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

pub const MISSING_STATE_HINT: &str =
    "Pass billing_state from deal or lc_us_state from associated company";

/// Errors a caller of the lookalike engine can see.
///
/// Both variants serialize to an `{ "error": ... }` object so they can be
/// returned to API clients as-is.
#[derive(Debug, Clone, Error)]
pub enum LookalikeError {
    #[error("Missing required field: state")]
    MissingState {
        hint: String,
        received_fields: Vec<String>,
    },

    /// The organization data source failed. Carries the original company
    /// data so the caller can retry without rebuilding the request.
    #[error("Failed to query organization data: {message}")]
    DataSource {
        message: String,
        company_data: Map<String, JsonValue>,
    },
}

impl LookalikeError {
    pub fn missing_state(company_data: &Map<String, JsonValue>) -> Self {
        let mut received_fields: Vec<String> = company_data.keys().cloned().collect();
        received_fields.sort();
        LookalikeError::MissingState {
            hint: MISSING_STATE_HINT.to_string(),
            received_fields,
        }
    }

    pub fn data_source(err: &anyhow::Error, company_data: &Map<String, JsonValue>) -> Self {
        LookalikeError::DataSource {
            message: format!("{:#}", err),
            company_data: company_data.clone(),
        }
    }
}

impl Serialize for LookalikeError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("error", &self.to_string())?;
        match self {
            LookalikeError::MissingState {
                hint,
                received_fields,
            } => {
                map.serialize_entry("hint", hint)?;
                map.serialize_entry("received_fields", received_fields)?;
            }
            LookalikeError::DataSource { company_data, .. } => {
                map.serialize_entry("company_data", company_data)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_state_serialization() {
        let data = json!({ "specialty": "Cardiology", "city": "Austin" });
        let err = LookalikeError::missing_state(data.as_object().unwrap());
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"], "Missing required field: state");
        assert_eq!(value["hint"], MISSING_STATE_HINT);
        assert_eq!(value["received_fields"], json!(["city", "specialty"]));
    }

    #[test]
    fn test_data_source_error_echoes_company_data() {
        let data = json!({ "state": "TX" });
        let cause = anyhow::anyhow!("connection refused").context("query failed");
        let err = LookalikeError::data_source(&cause, data.as_object().unwrap());
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value["error"],
            "Failed to query organization data: query failed: connection refused"
        );
        assert_eq!(value["company_data"]["state"], "TX");
    }
}
