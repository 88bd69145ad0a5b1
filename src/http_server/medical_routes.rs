//! Medical Details HTTP Routes
//!
//! `PUT /patients/medical-details` appends to the cumulative history,
//! medication and allergy text of a patient.
//!
//! The append is a read-modify-write against the data store. Every write
//! stores a fresh token in the version column and only applies while the row
//! still holds the token that was read; a lost race restarts the cycle, up to
//! `max_append_attempts` times.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::put,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::data_service::{Filter, Table};
use crate::models::{next_version, unchanged_filter, MedicalDetailsUpdate};
use crate::observability::Logger;

use super::errors::{ApiError, ApiResult};
use super::prescription_routes::PATIENT_ID_REQUIRED;
use super::state::AppState;

pub const DETAILS_NOT_FOUND: &str = "Medical details not found for this patient";
pub const FETCH_FAILED: &str = "Failed to fetch existing details";
pub const UPDATE_FAILED: &str = "Failed to update medical details";
pub const CONCURRENT_UPDATE: &str = "Medical details were modified concurrently";
pub const DETAILS_UPDATED: &str = "Medical details updated successfully";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create medical details routes
pub fn medical_routes() -> Router<AppState> {
    Router::new().route("/patients/medical-details", put(update_medical_details_handler))
}

async fn update_medical_details_handler(
    State(state): State<AppState>,
    payload: Result<Json<MedicalDetailsUpdate>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(update) = payload?;
    let patient_id = update
        .patient_id()
        .ok_or_else(|| ApiError::Validation(PATIENT_ID_REQUIRED.to_string()))?;

    let by_patient = Filter::eq("patient_id", patient_id.as_str());

    for attempt in 1..=state.max_append_attempts {
        let existing = state
            .call(
                "read_additional_details",
                state.data.read_one(Table::AdditionalDetails, &by_patient),
            )
            .await
            .map_err(|e| ApiError::data_service(e, FETCH_FAILED))?
            .ok_or_else(|| ApiError::NotFound(DETAILS_NOT_FOUND.to_string()))?;

        let mut fields = update.apply_to(&existing);
        fields.insert(state.version_column.clone(), Value::String(next_version()));
        let filters = [
            by_patient.clone(),
            unchanged_filter(&existing, &state.version_column),
        ];

        let changed = state
            .call(
                "update_additional_details",
                state
                    .data
                    .update_where(Table::AdditionalDetails, &filters, &fields),
            )
            .await
            .map_err(|e| ApiError::data_service(e, UPDATE_FAILED))?;

        if changed > 0 {
            state.metrics.increment_medical_details_updated();
            Logger::info(
                "MEDICAL_DETAILS_UPDATED",
                &[
                    ("attempt", attempt.to_string().as_str()),
                    ("patient_id", patient_id.as_str()),
                ],
            );
            return Ok(Json(MessageResponse {
                message: DETAILS_UPDATED.to_string(),
            }));
        }

        state.metrics.increment_append_conflicts();
        Logger::warn(
            "MEDICAL_DETAILS_CONFLICT",
            &[
                ("attempt", attempt.to_string().as_str()),
                ("patient_id", patient_id.as_str()),
            ],
        );
    }

    Err(ApiError::Conflict(CONCURRENT_UPDATE.to_string()))
}
