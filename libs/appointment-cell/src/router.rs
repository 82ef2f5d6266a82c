// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::AppState;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    // Booking is open to anonymous patients; the handler reads the token itself
    let public_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/available-dates", get(handlers::get_available_dates))
        .route("/available-slots", get(handlers::get_available_slots));

    let protected_routes = Router::new()
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn blocked_slot_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_blocked_slots));

    // Admin role is checked in the handlers
    let protected_routes = Router::new()
        .route("/", post(handlers::create_blocked_slot))
        .route("/{blocked_slot_id}", delete(handlers::delete_blocked_slot))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn settings_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/appointment-mode", get(handlers::get_appointment_mode));

    let protected_routes = Router::new()
        .route("/appointment-mode", put(handlers::update_appointment_mode))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn service_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_services))
        .with_state(state)
}
