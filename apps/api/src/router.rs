use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::{appointment_routes, blocked_slot_routes, service_routes, settings_routes};
use appointment_cell::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/services", service_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/blocked-slots", blocked_slot_routes(state.clone()))
        .nest("/settings", settings_routes(state))
}
