pub mod handlers;
pub mod router;
pub mod models;
pub mod services;
pub mod state;

// Re-export all models and services for external use
pub use models::*;
pub use services::*;
pub use state::AppState;
