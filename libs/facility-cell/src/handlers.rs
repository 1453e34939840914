use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{FacilityError, FacilitySearchFilters, FacilityType, UpdateFacilityRequest};
use crate::services::FacilityService;

#[derive(Debug, Deserialize)]
pub struct FacilityQueryParams {
    pub facility_type: Option<FacilityType>,
    pub name: Option<String>,
    pub verified_only: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn require_care_provider(user: &User) -> Result<(), AppError> {
    match user.role.as_deref() {
        Some("care_provider") => Ok(()),
        _ => Err(AppError::Auth("Only care providers have a facility profile".to_string())),
    }
}

fn map_facility_error(e: FacilityError) -> AppError {
    match e {
        FacilityError::NotFound => AppError::NotFound("Facility not found".to_string()),
        FacilityError::Unauthorized => AppError::Auth("Not authorized to view this facility".to_string()),
        FacilityError::ValidationError(msg) => AppError::ValidationError(msg),
        FacilityError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_facilities(
    State(config): State<Arc<AppConfig>>,
    Query(params): Query<FacilityQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = FacilityService::new(&config);

    let filters = FacilitySearchFilters {
        facility_type: params.facility_type,
        name: params.name,
        verified_only: params.verified_only,
    };

    let facilities = service
        .search_facilities(filters, params.limit, params.offset)
        .await
        .map_err(map_facility_error)?;

    Ok(Json(json!({
        "facilities": facilities,
        "total": facilities.len()
    })))
}

#[axum::debug_handler]
pub async fn get_facility_public(
    State(config): State<Arc<AppConfig>>,
    Path(facility_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = FacilityService::new(&config);

    let facility = service
        .get_facility_public(&facility_id)
        .await
        .map_err(map_facility_error)?;

    Ok(Json(json!(facility)))
}

#[axum::debug_handler]
pub async fn get_my_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_care_provider(&user)?;

    let service = FacilityService::new(&config);

    let facility = service
        .get_facility(&user.id, auth.token())
        .await
        .map_err(|e| match e {
            FacilityError::NotFound => AppError::NotFound("Facility profile not found".to_string()),
            other => map_facility_error(other),
        })?;

    Ok(Json(json!(facility)))
}

#[axum::debug_handler]
pub async fn update_my_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateFacilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_care_provider(&user)?;

    let service = FacilityService::new(&config);

    let facility = service
        .update_facility(&user.id, request, auth.token())
        .await
        .map_err(|e| match e {
            FacilityError::NotFound => AppError::NotFound("Facility profile not found".to_string()),
            other => map_facility_error(other),
        })?;

    Ok(Json(json!(facility)))
}
