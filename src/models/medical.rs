//! Cumulative medical history fields

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::data_service::Filter;

use super::identifier::identifier_from_body;
use super::Record;

/// Free-text columns of `additional_details` that only ever grow
pub const MEDICAL_TEXT_FIELDS: [&str; 3] = ["medical_history", "current_medication", "allergies"];

/// Body of the update-medical-details operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalDetailsUpdate {
    #[serde(default)]
    pub patient_id: Option<Value>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub current_medication: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
}

impl MedicalDetailsUpdate {
    /// Patient identifier as a string, if one was supplied
    pub fn patient_id(&self) -> Option<String> {
        identifier_from_body(self.patient_id.as_ref())
    }

    fn incoming(&self, field: &str) -> Option<&str> {
        match field {
            "medical_history" => self.medical_history.as_deref(),
            "current_medication" => self.current_medication.as_deref(),
            "allergies" => self.allergies.as_deref(),
            _ => None,
        }
    }

    /// New column values after appending this update to `existing`
    pub fn apply_to(&self, existing: &Record) -> Record {
        MEDICAL_TEXT_FIELDS
            .iter()
            .map(|field| {
                let merged = append_text(existing_text(existing, field).as_deref(), self.incoming(field));
                (field.to_string(), merged.map_or(Value::Null, Value::String))
            })
            .collect()
    }
}

/// Append `incoming` to `existing` with a `", "` separator.
///
/// Existing text that is missing or empty is replaced by the incoming value;
/// otherwise the result always keeps the existing text as its prefix.
pub fn append_text(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match existing {
        Some(current) if !current.is_empty() => {
            Some(format!("{}, {}", current, incoming.unwrap_or_default()))
        }
        _ => incoming.map(str::to_string),
    }
}

fn existing_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Filter that matches `existing` only while its version column is unchanged.
///
/// The version is a short row token, so the filter stays bounded however
/// long the appended text grows.
pub fn unchanged_filter(existing: &Record, version_column: &str) -> Filter {
    match existing_text(existing, version_column) {
        Some(version) => Filter::eq(version_column, version),
        None => Filter::is_null(version_column),
    }
}

/// Fresh version token written with every append
pub fn next_version() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
