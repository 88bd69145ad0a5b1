//! Transport models for prescriptions and patient details
//!
//! Records owned by the data store are carried as raw JSON objects and
//! returned verbatim. Request bodies get typed views so that the handlers
//! never index into untyped maps.

mod identifier;
mod lens_options;
mod medical;
mod prescription;

pub use identifier::{identifier_from_body, identifier_to_string, require_identifier};
pub use lens_options::LensOptions;
pub use medical::{
    append_text, next_version, unchanged_filter, MedicalDetailsUpdate, MEDICAL_TEXT_FIELDS,
};
pub use prescription::{EyeMeasurements, NewPrescription, EYE_MEASUREMENT_FIELDS};

/// A raw row as returned by the data service
pub type Record = serde_json::Map<String, serde_json::Value>;
