use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn facility_routes(state: Arc<AppConfig>) -> Router {
    // The facility directory is public; profile management is not
    let public_routes = Router::new()
        .route("/", get(handlers::list_facilities));

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_my_profile))
        .route("/me", put(handlers::update_my_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .route("/{facility_id}", get(handlers::get_facility_public))
        .with_state(state)
}
