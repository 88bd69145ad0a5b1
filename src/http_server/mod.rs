//! # Prescription HTTP Server
//!
//! Axum server exposing the prescription API.
//!
//! # Endpoints
//!
//! - `GET  /prescriptions/patient/:patient_id` - prescription ids of a patient
//! - `GET  /prescriptions/prescription/:id` - raw prescription row
//! - `GET  /prescription/:id` - prescription with left and right eye rows
//! - `POST /prescriptions/add` - create a prescription
//! - `PUT  /patients/medical-details` - append to a patient's medical history
//! - `/health`, `/metrics` - observability

pub mod config;
pub mod errors;
pub mod medical_routes;
pub mod middleware;
pub mod observability_routes;
pub mod prescription_routes;
pub mod server;
pub mod state;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::{build_router, HttpServer};
pub use state::AppState;
