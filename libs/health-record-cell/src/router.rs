use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn health_record_routes(state: Arc<AppConfig>) -> Router {
    // Protected routes
    let protected_routes = Router::new()
        .route("/{patient_id}", get(handlers::get_patient_records))
        .route("/{patient_id}/overview", put(handlers::update_health_overview))

        // Medication endpoints
        .route("/{patient_id}/medications", post(handlers::add_medication))
        .route("/{patient_id}/medications/{medication_id}", put(handlers::update_medication))
        .route("/{patient_id}/medications/{medication_id}", delete(handlers::delete_medication))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
