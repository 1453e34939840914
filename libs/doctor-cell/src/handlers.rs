use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use serde::Deserialize;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateSlotRequest, DoctorError, DoctorSearchFilters, UpdateDoctorRequest,
};
use crate::services::{doctor::DoctorService, slots::SlotService};

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub specialty: Option<String>,
    pub name: Option<String>,
    pub verified_only: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if user.role.as_deref() != Some("doctor") {
        return Err(AppError::Auth("Only doctors can manage a doctor profile".to_string()));
    }
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        DoctorError::SlotTaken => AppError::Conflict("Slot is currently booked".to_string()),
        DoctorError::SlotOverlap => AppError::Conflict("Slot overlaps an existing slot".to_string()),
        DoctorError::InvalidSlotTime(msg) => AppError::BadRequest(msg),
        DoctorError::UnauthorizedAccess => AppError::Auth("Not authorized to manage this slot".to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let filters = DoctorSearchFilters {
        specialty: query.specialty,
        name: query.name,
        // Unverified profiles stay off the public listing unless asked for
        verified_only: Some(query.verified_only.unwrap_or(true)),
    };

    let doctors = doctor_service.search_doctors_public(filters, query.limit, query.offset).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_public(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor_public(&doctor_id.to_string()).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot_service = SlotService::new(&state);

    let slots = slot_service.list_bookable_slots(doctor_id).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots": slots,
        "total": slots.len()
    })))
}

// ==============================================================================
// PROTECTED PROFILE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_doctor(&user)?;

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(&user.id, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_doctor(&user)?;

    let doctor_service = DoctorService::new(&state);

    let updated_doctor = doctor_service.update_doctor(&user.id, request, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(updated_doctor)))
}

// ==============================================================================
// PROTECTED SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_id = require_doctor(&user)?;

    let slot_service = SlotService::new(&state);

    let slot = slot_service.create_slot(doctor_id, request, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
        "message": "Slot created"
    })))
}

#[axum::debug_handler]
pub async fn get_my_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_id = require_doctor(&user)?;

    let slot_service = SlotService::new(&state);

    let slots = slot_service.list_doctor_slots(doctor_id, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<AppConfig>>,
    Path(slot_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_id = require_doctor(&user)?;

    let slot_service = SlotService::new(&state);

    slot_service.delete_slot(doctor_id, slot_id, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted"
    })))
}
