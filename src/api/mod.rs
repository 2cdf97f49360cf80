//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All endpoints except `/health` are mounted under `/api/v1`.

mod admin_identity;
pub mod dto;
pub mod handlers;
pub mod openapi;

#[cfg(test)]
#[allow(clippy::panic)]
mod test_support;

pub use admin_identity::{ADMIN_ID_HEADER, AdminIdentity};

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
