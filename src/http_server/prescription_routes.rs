//! Prescription HTTP Routes
//!
//! - `GET  /prescriptions/patient/:patient_id` - prescription ids of a patient
//! - `GET  /prescriptions/prescription/:id` - one prescription row
//! - `GET  /prescription/:id` - prescription with both eye records
//! - `POST /prescriptions/add` - create through the `add_prescription` procedure

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::data_service::{DataServiceError, Filter, Table};
use crate::models::{identifier_to_string, require_identifier, NewPrescription, Record};
use crate::observability::Logger;

use super::errors::{ApiError, ApiResult};
use super::state::AppState;

pub const PATIENT_ID_REQUIRED: &str = "Patient ID is required";
pub const PRESCRIPTION_ID_REQUIRED: &str = "Prescription ID is required";
pub const NO_PRESCRIPTIONS: &str = "No prescriptions found for this patient";
pub const PRESCRIPTION_NOT_FOUND: &str = "Prescription not found";
pub const LEFT_EYE_NOT_FOUND: &str = "Left eye details not found";
pub const RIGHT_EYE_NOT_FOUND: &str = "Right eye details not found";
pub const PRESCRIPTION_ADDED: &str = "Prescription added successfully";

#[derive(Debug, Serialize)]
pub struct PrescriptionIdsResponse {
    pub prescription_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PrescriptionDetailsResponse {
    pub prescription: Record,
    #[serde(rename = "leftEye")]
    pub left_eye: Record,
    #[serde(rename = "rightEye")]
    pub right_eye: Record,
}

#[derive(Debug, Serialize)]
pub struct PrescriptionCreatedResponse {
    pub message: String,
    pub prescription_id: Value,
}

/// Create prescription routes
pub fn prescription_routes() -> Router<AppState> {
    Router::new()
        .route("/prescriptions/patient/", get(missing_patient_id_handler))
        .route(
            "/prescriptions/patient/:patient_id",
            get(list_prescription_ids_handler),
        )
        .route(
            "/prescriptions/prescription/:id",
            get(get_prescription_handler),
        )
        .route("/prescription/:id", get(get_prescription_details_handler))
        .route("/prescriptions/add", post(add_prescription_handler))
}

fn path_identifier(
    path: Result<Path<String>, PathRejection>,
    missing: &str,
) -> ApiResult<String> {
    let Path(raw) = path?;
    require_identifier(&raw).ok_or_else(|| ApiError::Validation(missing.to_string()))
}

async fn missing_patient_id_handler() -> ApiError {
    ApiError::Validation(PATIENT_ID_REQUIRED.to_string())
}

async fn list_prescription_ids_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<PrescriptionIdsResponse>> {
    let patient_id = path_identifier(path, PATIENT_ID_REQUIRED)?;

    let ids = state
        .call(
            "list_prescription_ids",
            state.data.list_prescription_ids(&patient_id),
        )
        .await?;

    if ids.is_empty() {
        return Err(ApiError::NotFound(NO_PRESCRIPTIONS.to_string()));
    }

    let prescription_ids = ids
        .iter()
        .map(|id| {
            identifier_to_string(id)
                .ok_or_else(|| ApiError::Unexpected(format!("unsupported prescription id: {}", id)))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(PrescriptionIdsResponse { prescription_ids }))
}

async fn get_prescription_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Record>> {
    let id = path_identifier(path, PRESCRIPTION_ID_REQUIRED)?;

    let filter = Filter::eq("id", id);
    state
        .call(
            "read_prescription",
            state.data.read_one(Table::Prescription, &filter),
        )
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(PRESCRIPTION_NOT_FOUND.to_string()))
}

/// One step of the composed read. Missing rows and reported errors become the
/// step's 404; transport failures stay unexpected.
async fn read_step(
    state: &AppState,
    table: Table,
    id: Option<String>,
    not_found: &str,
) -> ApiResult<Record> {
    let missing = || ApiError::NotFound(not_found.to_string());
    let filter = Filter::eq("id", id.ok_or_else(missing)?);

    match state
        .call(table.as_str(), state.data.read_one(table, &filter))
        .await
    {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err(missing()),
        Err(err @ DataServiceError::Api { .. }) => {
            Logger::warn(
                "PRESCRIPTION_STEP_FAILED",
                &[("table", table.as_str()), ("error", err.message().as_str())],
            );
            Err(missing())
        }
        Err(err) => Err(err.into()),
    }
}

fn foreign_key(record: &Record, column: &str) -> Option<String> {
    record.get(column).and_then(identifier_to_string)
}

async fn get_prescription_details_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<PrescriptionDetailsResponse>> {
    let id = path_identifier(path, PRESCRIPTION_ID_REQUIRED)?;

    let prescription = read_step(&state, Table::Prescription, Some(id), PRESCRIPTION_NOT_FOUND).await?;

    let left_eye = read_step(
        &state,
        Table::LeftEye,
        foreign_key(&prescription, "left_eye_id"),
        LEFT_EYE_NOT_FOUND,
    )
    .await?;

    let right_eye = read_step(
        &state,
        Table::RightEye,
        foreign_key(&prescription, "right_eye_id"),
        RIGHT_EYE_NOT_FOUND,
    )
    .await?;

    Ok(Json(PrescriptionDetailsResponse {
        prescription,
        left_eye,
        right_eye,
    }))
}

async fn add_prescription_handler(
    State(state): State<AppState>,
    payload: Result<Json<Record>, JsonRejection>,
) -> ApiResult<Json<PrescriptionCreatedResponse>> {
    let Json(body) = payload?;
    let prescription = NewPrescription::from_body(&body).map_err(ApiError::Validation)?;

    let patient = prescription
        .patient_id
        .as_ref()
        .and_then(identifier_to_string)
        .unwrap_or_default();
    let doctor = prescription
        .doctor_id
        .as_ref()
        .and_then(identifier_to_string)
        .unwrap_or_default();
    Logger::trace(
        "PRESCRIPTION_ADD_REQUEST",
        &[("patient_id", patient.as_str()), ("doctor_id", doctor.as_str())],
    );

    let params = prescription.to_rpc_params();
    let prescription_id = state
        .call("add_prescription", state.data.add_prescription(&params))
        .await?;

    state.metrics.increment_prescriptions_created();
    let id_text = identifier_to_string(&prescription_id).unwrap_or_else(|| prescription_id.to_string());
    Logger::info(
        "PRESCRIPTION_ADDED",
        &[("patient_id", patient.as_str()), ("prescription_id", id_text.as_str())],
    );

    Ok(Json(PrescriptionCreatedResponse {
        message: PRESCRIPTION_ADDED.to_string(),
        prescription_id,
    }))
}
