//! Medical details append, including lost races against concurrent writers

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use optica::data_service::{DataCall, DataServiceError, FaultPoint, Filter, InMemoryDataService, Table};

use common::TestApp;

const ROUTE: &str = "/patients/medical-details";

fn patient(history: Value, medication: Value, allergies: Value) -> InMemoryDataService {
    InMemoryDataService::new().with_row(
        Table::AdditionalDetails,
        json!({
            "patient_id": 42,
            "medical_history": history,
            "current_medication": medication,
            "allergies": allergies,
            "updated_at": "2026-10-16T08:00:00.000000Z"
        }),
    )
}

fn stored(app: &TestApp) -> Value {
    Value::Object(app.data.rows(Table::AdditionalDetails)[0].clone())
}

#[tokio::test]
async fn missing_patient_id_is_rejected_without_data_call() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null));

    let (status, body) = app.put(ROUTE, json!({"medical_history": "B"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Patient ID is required"}));

    let (status, _) = app.put(ROUTE, json!({"patient_id": "", "allergies": "B"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.data.calls().is_empty());
}

#[tokio::test]
async fn appends_to_existing_text() {
    let app = TestApp::new(patient(json!("A"), json!("Metformin"), Value::Null));

    let (status, body) = app
        .put(
            ROUTE,
            json!({
                "patient_id": 42,
                "medical_history": "B",
                "current_medication": "Insulin",
                "allergies": "Pollen"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Medical details updated successfully"}));

    let row = stored(&app);
    assert_eq!(row["medical_history"], "A, B");
    assert_eq!(row["current_medication"], "Metformin, Insulin");
    assert_eq!(row["allergies"], "Pollen");
}

#[tokio::test]
async fn absent_field_on_existing_text_appends_empty() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null));

    let (status, _) = app.put(ROUTE, json!({"patient_id": "42"})).await;
    assert_eq!(status, StatusCode::OK);

    let row = stored(&app);
    assert_eq!(row["medical_history"], "A, ");
    assert_eq!(row["current_medication"], Value::Null);
}

#[tokio::test]
async fn update_is_guarded_by_row_version() {
    let app = TestApp::new(patient(json!("A"), Value::Null, json!("Dust")));

    app.put(ROUTE, json!({"patient_id": 42, "medical_history": "B"}))
        .await;

    let (filters, fields) = app
        .data
        .calls()
        .into_iter()
        .find_map(|call| match call {
            DataCall::UpdateWhere { filters, fields, .. } => Some((filters, fields)),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        filters,
        vec![
            Filter::eq("patient_id", "42"),
            Filter::eq("updated_at", "2026-10-16T08:00:00.000000Z"),
        ]
    );
    assert_ne!(fields["updated_at"], "2026-10-16T08:00:00.000000Z");
    assert_eq!(stored(&app)["updated_at"], fields["updated_at"]);
}

#[tokio::test]
async fn long_history_keeps_the_guard_bounded() {
    let history = "Glaucoma follow-up; ".repeat(10_000);
    let app = TestApp::new(patient(json!(history), Value::Null, Value::Null));

    for entry in ["Drops twice daily", "Pressure stable"] {
        let (status, _) = app
            .put(ROUTE, json!({"patient_id": 42, "medical_history": entry}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    for call in app.data.calls() {
        if let DataCall::UpdateWhere { filters, .. } = call {
            assert!(filters.iter().all(|f| match f {
                Filter::Eq { value, .. } => value.len() < 64,
                Filter::IsNull { .. } => true,
            }));
        }
    }
    let stored_history = stored(&app)["medical_history"].as_str().unwrap().to_string();
    assert!(stored_history.ends_with("; , Drops twice daily, Pressure stable"));
}

#[tokio::test]
async fn row_without_version_is_guarded_by_null() {
    let data = InMemoryDataService::new().with_row(
        Table::AdditionalDetails,
        json!({"patient_id": 5, "medical_history": null}),
    );
    let app = TestApp::new(data);

    let (status, _) = app
        .put(ROUTE, json!({"patient_id": 5, "medical_history": "Dry eye"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let row = stored(&app);
    assert_eq!(row["medical_history"], "Dry eye");
    assert!(row["updated_at"].is_string());
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null));

    let (status, body) = app
        .put(ROUTE, json!({"patient_id": 7, "medical_history": "B"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Medical details not found for this patient"}));
    assert_eq!(app.data.calls().len(), 1);
}

#[tokio::test]
async fn fetch_failure_is_reported() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null));
    app.data.fail(
        FaultPoint::Read(Table::AdditionalDetails),
        DataServiceError::api(401, None, "JWT expired"),
    );

    let (status, body) = app
        .put(ROUTE, json!({"patient_id": 42, "medical_history": "B"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch existing details"}));
}

#[tokio::test]
async fn update_failure_is_reported() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null));
    app.data.fail(
        FaultPoint::Update(Table::AdditionalDetails),
        DataServiceError::api(403, Some("42501".into()), "permission denied"),
    );

    let (status, body) = app
        .put(ROUTE, json!({"patient_id": 42, "medical_history": "B"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to update medical details"}));
    assert_eq!(stored(&app)["medical_history"], "A");
}

#[tokio::test]
async fn lost_race_is_retried_without_losing_the_other_write() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null));
    app.data.interfere_before_update(
        Table::AdditionalDetails,
        Filter::eq("patient_id", "42"),
        json!({"medical_history": "A, Z", "updated_at": "2026-10-16T08:00:01.000000Z"}),
    );

    let (status, _) = app
        .put(ROUTE, json!({"patient_id": 42, "medical_history": "B"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored(&app)["medical_history"], "A, Z, B");

    let (_, metrics) = app.get("/metrics").await;
    assert_eq!(metrics["append_conflicts"], 1);
    assert_eq!(metrics["medical_details_updated"], 1);
}

#[tokio::test]
async fn persistent_conflicts_give_up() {
    let app = TestApp::new(patient(json!("A"), Value::Null, Value::Null)).with_max_append_attempts(3);
    for (second, text) in [(1, "A, X"), (2, "A, X, Y"), (3, "A, X, Y, Z")] {
        app.data.interfere_before_update(
            Table::AdditionalDetails,
            Filter::eq("patient_id", "42"),
            json!({
                "medical_history": text,
                "updated_at": format!("2026-10-16T08:00:0{}.000000Z", second)
            }),
        );
    }

    let (status, body) = app
        .put(ROUTE, json!({"patient_id": 42, "medical_history": "B"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": "Medical details were modified concurrently"}));
    assert_eq!(stored(&app)["medical_history"], "A, X, Y, Z");

    let updates = app
        .data
        .calls()
        .iter()
        .filter(|call| matches!(call, DataCall::UpdateWhere { .. }))
        .count();
    assert_eq!(updates, 3);
}
