//! # Data Service
//!
//! The hosted database is an external collaborator. Everything this service
//! needs from it fits in four calls: two stored procedures, a single-row
//! read and a filtered update.
//!
//! - [`RestDataService`] talks to a PostgREST endpoint over HTTP.
//! - [`InMemoryDataService`] is a test double with call recording and
//!   fault injection.

mod errors;
mod memory;
mod rest;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Record;

pub use errors::{DataResult, DataServiceError};
pub use memory::{DataCall, FaultPoint, InMemoryDataService};
pub use rest::RestDataService;

/// Boxed future returned by [`DataService`] calls
pub type DataFuture<'a, T> = Pin<Box<dyn Future<Output = DataResult<T>> + Send + 'a>>;

/// Stored procedure listing a patient's prescription ids
pub const LIST_PRESCRIPTION_IDS_FN: &str = "display_prescription_id";

/// Stored procedure creating a prescription and both eye records
pub const ADD_PRESCRIPTION_FN: &str = "add_prescription";

/// Tables this service reads or updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Prescription,
    LeftEye,
    RightEye,
    AdditionalDetails,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Prescription => "prescription",
            Table::LeftEye => "left_eye",
            Table::RightEye => "right_eye",
            Table::AdditionalDetails => "additional_details",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row filter on a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    IsNull { column: String },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::IsNull { column } => column,
        }
    }

    /// PostgREST query pair, e.g. `("id", "eq.42")`
    pub fn to_query_pair(&self) -> (String, String) {
        match self {
            Filter::Eq { column, value } => (column.clone(), format!("eq.{}", value)),
            Filter::IsNull { column } => (column.clone(), "is.null".to_string()),
        }
    }

    /// Whether `row` satisfies this filter. Values compare by string form.
    pub fn matches(&self, row: &Record) -> bool {
        match self {
            Filter::Eq { column, value } => match row.get(column) {
                Some(Value::String(s)) => s == value,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *value,
            },
            Filter::IsNull { column } => matches!(row.get(column), None | Some(Value::Null)),
        }
    }
}

/// Contract of the external data service
pub trait DataService: Send + Sync {
    /// Identifiers of every prescription of a patient, in data-service order
    fn list_prescription_ids<'a>(&'a self, patient_id: &'a str) -> DataFuture<'a, Vec<Value>>;

    /// Exactly one row of `table` matching `filter`, or `None` if there is none
    fn read_one<'a>(&'a self, table: Table, filter: &'a Filter) -> DataFuture<'a, Option<Record>>;

    /// Set `fields` on every row matching all `filters`; returns rows changed
    fn update_where<'a>(
        &'a self,
        table: Table,
        filters: &'a [Filter],
        fields: &'a Record,
    ) -> DataFuture<'a, u64>;

    /// Run the `add_prescription` procedure and return its result verbatim
    fn add_prescription<'a>(&'a self, params: &'a Record) -> DataFuture<'a, Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            Filter::eq("id", "42").to_query_pair(),
            ("id".to_string(), "eq.42".to_string())
        );
        assert_eq!(
            Filter::is_null("allergies").to_query_pair(),
            ("allergies".to_string(), "is.null".to_string())
        );
    }

    #[test]
    fn test_filter_matches_by_string_form() {
        let row = json!({"id": 42, "patient_id": "p-1", "allergies": null});
        let row = row.as_object().unwrap();

        assert!(Filter::eq("id", "42").matches(row));
        assert!(Filter::eq("patient_id", "p-1").matches(row));
        assert!(!Filter::eq("patient_id", "p-2").matches(row));
        assert!(Filter::is_null("allergies").matches(row));
        assert!(Filter::is_null("missing").matches(row));
        assert!(!Filter::eq("allergies", "null").matches(row));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::Prescription.as_str(), "prescription");
        assert_eq!(Table::LeftEye.to_string(), "left_eye");
        assert_eq!(Table::AdditionalDetails.as_str(), "additional_details");
    }
}
