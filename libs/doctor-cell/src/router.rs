use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor_public))
        .route("/{doctor_id}/slots", get(handlers::get_doctor_slots));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_my_profile))
        .route("/me", put(handlers::update_my_profile))
        .route("/me/slots", post(handlers::create_slot))
        .route("/me/slots", get(handlers::get_my_slots))
        .route("/me/slots/{slot_id}", delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
