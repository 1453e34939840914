use std::sync::Arc;

use axum::{
    extract::{State, Path, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{UpdateHealthOverviewRequest, CreateMedicationRequest, UpdateMedicationRequest, RecordError};
use crate::services::HealthRecordService;

fn map_record_error(e: RecordError) -> AppError {
    match e {
        RecordError::MedicationNotFound => AppError::NotFound("Medication not found".to_string()),
        RecordError::Unauthorized => AppError::Auth("Not authorized to access these health records".to_string()),
        RecordError::Validation(msg) => AppError::ValidationError(msg),
        RecordError::Database(msg) => AppError::Database(msg),
    }
}

/// Health overview plus active medications in one response.
#[axum::debug_handler]
pub async fn get_patient_records(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = HealthRecordService::new(&state);

    service.ensure_record_access(&patient_id, &user.id, user.role.as_deref().unwrap_or(""), token)
        .await
        .map_err(map_record_error)?;

    let overview = service.get_overview(&patient_id, token)
        .await
        .map_err(map_record_error)?;

    let medications = service.list_medications(&patient_id, token)
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "overview": overview,
        "medications": medications,
        "total_medications": medications.len()
    })))
}

#[axum::debug_handler]
pub async fn update_health_overview(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateHealthOverviewRequest>,
) -> Result<Json<Value>, AppError> {
    let service = HealthRecordService::new(&state);

    service.ensure_record_access(&patient_id, &user.id, user.role.as_deref().unwrap_or(""), auth.token())
        .await
        .map_err(map_record_error)?;

    let overview = service.update_overview(&patient_id, request, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!(overview)))
}

#[axum::debug_handler]
pub async fn add_medication(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMedicationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = HealthRecordService::new(&state);

    service.ensure_record_access(&patient_id, &user.id, user.role.as_deref().unwrap_or(""), auth.token())
        .await
        .map_err(map_record_error)?;

    let medication = service.add_medication(&patient_id, request, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn update_medication(
    State(state): State<Arc<AppConfig>>,
    Path((patient_id, medication_id)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateMedicationRequest>,
) -> Result<Json<Value>, AppError> {
    let service = HealthRecordService::new(&state);

    service.ensure_record_access(&patient_id, &user.id, user.role.as_deref().unwrap_or(""), auth.token())
        .await
        .map_err(map_record_error)?;

    let medication = service.update_medication(&patient_id, &medication_id, request, auth.token())
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn delete_medication(
    State(state): State<Arc<AppConfig>>,
    Path((patient_id, medication_id)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = HealthRecordService::new(&state);

    service.ensure_record_access(&patient_id, &user.id, user.role.as_deref().unwrap_or(""), token)
        .await
        .map_err(map_record_error)?;

    service.delete_medication(&patient_id, &medication_id, token)
        .await
        .map_err(map_record_error)?;

    Ok(Json(json!({ "success": true })))
}
