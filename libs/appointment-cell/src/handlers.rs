// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use serde::Deserialize;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, AppointmentStatus, BookAppointmentRequest,
    CompleteAppointmentRequest, Party, ProposeRescheduleRequest, RejectAppointmentRequest,
    RescheduleDecisionRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::buckets::classify_appointments;
use crate::services::reschedule::RescheduleService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl AppointmentQueryParams {
    fn into_search_query(self) -> AppointmentSearchQuery {
        AppointmentSearchQuery {
            status: self.status,
            from_date: self.from_date,
            to_date: self.to_date,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn parse_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients book for themselves; a doctor has no patient side to book
    if user.role.as_deref() == Some("doctor") {
        return Err(AppError::Auth("Doctors cannot book appointments".to_string()));
    }
    let patient_id = parse_user_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.book_appointment(patient_id, request, token).await
        .map_err(|e| match e {
            AppointmentError::SlotNotFound => {
                AppError::NotFound("Slot not found".to_string())
            },
            AppointmentError::SlotNotAvailable => {
                AppError::Conflict("Slot is no longer available".to_string())
            },
            AppointmentError::InvalidTime(msg) => {
                AppError::BadRequest(msg)
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment requested successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    // Only a participant or an admin can view
    let is_participant = appointment.party_of(&user.id).is_some();
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_participant && !is_admin {
        return Err(AppError::Auth("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// LISTING AND BUCKET HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let patient_id = parse_user_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .search_appointments(Some(patient_id), None, params.into_search_query(), token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.role.as_deref() != Some("doctor") {
        return Err(AppError::Auth("Only doctors can view their schedule".to_string()));
    }
    let doctor_id = parse_user_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .search_appointments(None, Some(doctor_id), params.into_search_query(), token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_my_appointment_buckets(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let patient_id = parse_user_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .search_appointments(
            Some(patient_id),
            None,
            AppointmentSearchQuery {
                status: None,
                from_date: None,
                to_date: None,
                limit: None,
                offset: None,
            },
            token,
        )
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let buckets = classify_appointments(appointments, Utc::now(), Party::Patient);
    let counts = buckets.counts();

    Ok(Json(json!({
        "buckets": buckets,
        "counts": counts
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointment_buckets(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.role.as_deref() != Some("doctor") {
        return Err(AppError::Auth("Only doctors can view their schedule".to_string()));
    }
    let doctor_id = parse_user_id(&user)?;

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .search_appointments(
            None,
            Some(doctor_id),
            AppointmentSearchQuery {
                status: None,
                from_date: None,
                to_date: None,
                limit: None,
                offset: None,
            },
            token,
        )
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let buckets = classify_appointments(appointments, Utc::now(), Party::Doctor);
    let counts = buckets.counts();

    Ok(Json(json!({
        "buckets": buckets,
        "counts": counts
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<SearchQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Non-admins are always scoped to their own side
    let is_admin = user.role.as_deref() == Some("admin");
    let (patient_id, doctor_id) = if is_admin {
        (params.patient_id, params.doctor_id)
    } else if user.role.as_deref() == Some("doctor") {
        (None, Some(parse_user_id(&user)?))
    } else {
        (Some(parse_user_id(&user)?), None)
    };

    let query = AppointmentSearchQuery {
        status: params.status,
        from_date: params.from_date,
        to_date: params.to_date,
        limit: params.limit,
        offset: params.offset,
    };

    let booking_service = AppointmentBookingService::new(&state);

    let appointments = booking_service
        .search_appointments(patient_id, doctor_id, query, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
        "limit": params.limit,
        "offset": params.offset
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn approve_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    let is_doctor = appointment.party_of(&user.id) == Some(Party::Doctor);
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth("Only the doctor can approve this appointment".to_string()));
    }

    let approved = booking_service.approve_appointment(&appointment, token).await
        .map_err(|e| match e {
            AppointmentError::InvalidStatusTransition(status) => {
                AppError::Conflict(format!("Cannot approve appointment in status: {}", status))
            },
            AppointmentError::TransitionConflict => {
                AppError::Conflict("Appointment was modified concurrently".to_string())
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": approved,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RejectAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    let is_doctor = appointment.party_of(&user.id) == Some(Party::Doctor);
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth("Only the doctor can reject this appointment".to_string()));
    }

    let rejected = booking_service
        .reject_appointment(&appointment, request.reason, token)
        .await
        .map_err(|e| match e {
            AppointmentError::InvalidStatusTransition(status) => {
                AppError::Conflict(format!("Cannot reject appointment in status: {}", status))
            },
            AppointmentError::TransitionConflict => {
                AppError::Conflict("Appointment was modified concurrently".to_string())
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": rejected,
        "message": "Appointment rejected"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    let is_doctor = appointment.party_of(&user.id) == Some(Party::Doctor);
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_doctor && !is_admin {
        return Err(AppError::Auth("Only the doctor can complete this appointment".to_string()));
    }

    let completed = booking_service
        .complete_appointment(&appointment, request.notes, token)
        .await
        .map_err(|e| match e {
            AppointmentError::InvalidStatusTransition(status) => {
                AppError::Conflict(format!("Cannot complete appointment in status: {}", status))
            },
            AppointmentError::TransitionConflict => {
                AppError::Conflict("Appointment was modified concurrently".to_string())
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": completed,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    let is_participant = appointment.party_of(&user.id).is_some();
    let is_admin = user.role.as_deref() == Some("admin");

    if !is_participant && !is_admin {
        return Err(AppError::Auth("Not authorized to cancel this appointment".to_string()));
    }

    let cancelled = booking_service.cancel_appointment(&appointment, token).await
        .map_err(|e| match e {
            AppointmentError::InvalidStatusTransition(status) => {
                AppError::Conflict(format!("Cannot cancel appointment in status: {}", status))
            },
            AppointmentError::TransitionConflict => {
                AppError::Conflict("Appointment was modified concurrently".to_string())
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled,
        "message": "Appointment cancelled"
    })))
}

// ==============================================================================
// RESCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn propose_reschedule(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ProposeRescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    // Only the two parties themselves can open a proposal
    let proposer = appointment.party_of(&user.id)
        .ok_or_else(|| AppError::Auth("Not authorized to reschedule this appointment".to_string()))?;

    let reschedule_service = RescheduleService::new(&state);

    let updated = reschedule_service
        .propose(&appointment, proposer, request, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotReschedulable(status) => {
                AppError::Conflict(format!("Appointment in status {} cannot be rescheduled", status))
            },
            AppointmentError::ReschedulePending => {
                AppError::Conflict("A reschedule proposal is already pending".to_string())
            },
            AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
            AppointmentError::TransitionConflict => {
                AppError::Conflict("Appointment was modified concurrently".to_string())
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": updated,
        "message": "Reschedule proposed"
    })))
}

#[axum::debug_handler]
pub async fn decide_reschedule(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleDecisionRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    let decider = appointment.party_of(&user.id)
        .ok_or_else(|| AppError::Auth("Not authorized to decide this proposal".to_string()))?;

    let reschedule_service = RescheduleService::new(&state);

    let outcome = reschedule_service
        .decide(&appointment, decider, request, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NoActiveReschedule => {
                AppError::BadRequest("No reschedule proposal is pending".to_string())
            },
            AppointmentError::NotProposalRecipient => {
                AppError::Auth("Only the receiving party can decide this proposal".to_string())
            },
            AppointmentError::InvalidStatusTransition(status) => {
                AppError::Conflict(format!("Cannot transition from current status: {}", status))
            },
            AppointmentError::TransitionConflict => {
                AppError::Conflict("Appointment was modified concurrently".to_string())
            },
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "decision": outcome.decision,
        "decline_reason": outcome.decline_reason,
        "message": "Reschedule decision recorded"
    })))
}
