// src/models/target.rs
use serde_json::{Map, Value as JsonValue};

use crate::models::errors::LookalikeError;

/// Property names checked, in priority order, for each target attribute.
/// Deal billing fields win over the associated company's fields.
const STATE_FIELDS: [&str; 3] = ["billing_state", "lc_us_state", "state"];
const CITY_FIELDS: [&str; 3] = ["billing_city", "lc_city", "city"];
const SPECIALTY_FIELDS: [&str; 3] = ["specialty", "specialties", "primary_specialty"];

/// The organization used as the search basis.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProfile {
    /// Upper-cased, trimmed state code. Always present.
    pub state: String,
    pub city: Option<String>,
    /// Specialties split from the semicolon-delimited field, in original order.
    pub specialties: Vec<String>,
    /// The caller's raw property bag, echoed back in responses.
    pub company_data: Map<String, JsonValue>,
}

impl TargetProfile {
    /// Resolves a target from loosely-typed CRM deal/company properties.
    pub fn from_company_data(company_data: &Map<String, JsonValue>) -> Result<Self, LookalikeError> {
        let state = first_present(company_data, &STATE_FIELDS)
            .map(|s| s.to_uppercase())
            .ok_or_else(|| LookalikeError::missing_state(company_data))?;

        let city = first_present(company_data, &CITY_FIELDS);
        let specialties = first_present(company_data, &SPECIALTY_FIELDS)
            .map(|raw| split_specialties(&raw))
            .unwrap_or_default();

        Ok(Self {
            state,
            city,
            specialties,
            company_data: company_data.clone(),
        })
    }

    /// Builds a profile directly from typed attributes.
    pub fn new(state: &str, city: Option<&str>, specialty: Option<&str>) -> Result<Self, LookalikeError> {
        let mut company_data = Map::new();
        company_data.insert("state".to_string(), JsonValue::String(state.to_string()));
        if let Some(city) = city {
            company_data.insert("city".to_string(), JsonValue::String(city.to_string()));
        }
        if let Some(specialty) = specialty {
            company_data.insert("specialty".to_string(), JsonValue::String(specialty.to_string()));
        }
        Self::from_company_data(&company_data)
    }
}

/// Splits "General Practice;Cardiology" into trimmed, non-empty parts.
pub fn split_specialties(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_present(data: &Map<String, JsonValue>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| data.get(*field).and_then(scalar_to_string))
        .find(|value| !value.is_empty())
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Normalized, scoring-ready view of a target plus its expanded specialties.
///
/// Derived once per request and shared read-only by all scoring workers; the
/// caller's `TargetProfile` is never mutated to carry derived fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringContext {
    pub state: String,
    pub city: Option<String>,
    pub specialties: Vec<String>,
    pub expanded_specialties: Vec<String>,
}

impl ScoringContext {
    pub fn new(target: &TargetProfile, expanded_specialties: &[String]) -> Self {
        Self {
            state: target.state.trim().to_uppercase(),
            city: target
                .city
                .as_deref()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty()),
            specialties: target
                .specialties
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            expanded_specialties: expanded_specialties
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn has_expansions(&self) -> bool {
        !self.expanded_specialties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_billing_fields_take_priority() {
        let data = props(json!({
            "billing_state": "tx",
            "state": "CA",
            "lc_city": "Dallas",
            "billing_city": "Austin",
            "specialties": "Cardiology; ;Pediatrics",
        }));
        let target = TargetProfile::from_company_data(&data).unwrap();
        assert_eq!(target.state, "TX");
        assert_eq!(target.city.as_deref(), Some("Austin"));
        assert_eq!(target.specialties, vec!["Cardiology", "Pediatrics"]);
    }

    #[test]
    fn test_empty_state_falls_through_to_next_field() {
        let data = props(json!({ "billing_state": "  ", "lc_us_state": "wa" }));
        let target = TargetProfile::from_company_data(&data).unwrap();
        assert_eq!(target.state, "WA");
        assert!(target.city.is_none());
        assert!(target.specialties.is_empty());
    }

    #[test]
    fn test_missing_state_is_structured_error() {
        let data = props(json!({ "city": "Austin", "specialty": "Cardiology" }));
        match TargetProfile::from_company_data(&data) {
            Err(LookalikeError::MissingState { received_fields, .. }) => {
                assert_eq!(received_fields, vec!["city", "specialty"]);
            }
            other => panic!("expected MissingState, got {:?}", other),
        }
    }

    #[test]
    fn test_scoring_context_normalizes_case() {
        let target = TargetProfile::new("tx", Some(" Austin "), Some("Cardiology;Internal Medicine")).unwrap();
        let ctx = ScoringContext::new(&target, &["Vascular Surgery".to_string()]);
        assert_eq!(ctx.state, "TX");
        assert_eq!(ctx.city.as_deref(), Some("austin"));
        assert_eq!(ctx.specialties, vec!["cardiology", "internal medicine"]);
        assert_eq!(ctx.expanded_specialties, vec!["vascular surgery"]);
        assert!(ctx.has_expansions());
        // The caller's profile is untouched.
        assert_eq!(target.specialties, vec!["Cardiology", "Internal Medicine"]);
    }
}
