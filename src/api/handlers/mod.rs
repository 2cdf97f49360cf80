//! REST endpoint handlers organized by resource.

pub mod accounts;
pub mod admin;
pub mod dashboard;
pub mod events;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(accounts::routes())
        .merge(admin::routes())
        .merge(events::routes())
        .merge(dashboard::routes())
}
