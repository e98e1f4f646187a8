//! REST API layer: route handlers, DTOs, extractors, and router composition.
//!
//! Resource endpoints are mounted under `/api`; service info and health
//! live at the root.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod openapi;

use std::any::Any;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any as CorsAny, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::TrackerConfig;
use crate::error::TrackerError;

/// Builds the complete API router with all REST endpoints.
///
/// Unmatched paths answer with a structured 404.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::system::routes());

    with_docs(router).fallback(handlers::system::not_found_handler)
}

/// Applies state and the HTTP middleware stack: request timeout, panic
/// recovery, request tracing, and CORS.
///
/// # Errors
///
/// Returns [`TrackerError::Config`] if an allowed origin is not a valid
/// header value.
pub fn build_app(state: AppState, config: &TrackerConfig) -> Result<Router, TrackerError> {
    let cors = cors_layer(&config.allowed_origins)?;

    Ok(build_router()
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;
    use utoipa::OpenApi;

    router.route(
        "/api-docs/openapi.json",
        get(|| async { Json(openapi::ApiDoc::openapi()) }),
    )
}

/// A wildcard entry allows any origin without credentials; otherwise the
/// listed origins are allowed with credentials.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, TrackerError> {
    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(CorsAny)
            .allow_methods(CorsAny)
            .allow_headers(CorsAny));
    }

    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| TrackerError::Config(format!("invalid allowed origin '{o}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

fn handle_panic(_payload: Box<dyn Any + Send + 'static>) -> Response {
    TrackerError::Internal("request handler panicked".to_string()).into_response()
}
