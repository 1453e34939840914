use std::sync::Arc;
use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{UpdatePatientRequest, PatientError};
use crate::services::PatientService;

fn require_patient(user: &User) -> Result<(), AppError> {
    match user.role.as_deref() {
        Some("patient") => Ok(()),
        _ => Err(AppError::Auth("Only patients have a patient profile".to_string())),
    }
}

fn require_doctor(user: &User) -> Result<(), AppError> {
    match user.role.as_deref() {
        Some("doctor") => Ok(()),
        _ => Err(AppError::Auth("Only doctors can view their patient roster".to_string())),
    }
}

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::Unauthorized => AppError::Auth("Not authorized to view this patient".to_string()),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_my_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = PatientService::new(&config);

    let patient = service.get_patient(&user.id, auth.token())
        .await
        .map_err(|e| match e {
            PatientError::NotFound => AppError::NotFound("Patient profile not found".to_string()),
            other => map_patient_error(other),
        })?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let service = PatientService::new(&config);

    let patient = service.update_patient(&user.id, request, auth.token())
        .await
        .map_err(|e| match e {
            PatientError::NotFound => AppError::NotFound("Patient profile not found".to_string()),
            other => map_patient_error(other),
        })?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);

    let patient = service.get_patient_for(
        &patient_id,
        &user.id,
        user.role.as_deref().unwrap_or(""),
        auth.token(),
    )
    .await
    .map_err(map_patient_error)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient_roster(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let service = PatientService::new(&config);

    let roster = service.patient_roster(&user.id, auth.token())
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "patients": roster,
        "total": roster.len()
    })))
}
