use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use facility_cell::router::facility_routes;
use health_record_cell::router::health_record_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareLink Scheduling API is running!" }))
        .nest("/api/v1/auth", auth_routes(state.clone()))
        .nest("/api/v1/appointments", appointment_routes(state.clone()))
        .nest("/api/v1/doctors", doctor_routes(state.clone()))
        .nest("/api/v1/patients", patient_routes(state.clone()))
        .nest("/api/v1/health-records", health_record_routes(state.clone()))
        .nest("/api/v1/facilities", facility_routes(state.clone()))
}
