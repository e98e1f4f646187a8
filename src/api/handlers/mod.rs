//! REST endpoint handlers organized by resource.

pub mod emissions;
pub mod system;
pub mod users;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(emissions::routes())
        .merge(users::routes())
}
