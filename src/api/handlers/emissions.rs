//! Emission handlers: activity catalog, categories, calculation, and history.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ActivityResponse, CalculateRequest, CalculateResponse, CategoriesResponse};
use crate::api::extract::ValidatedJson;
use crate::app_state::AppState;
use crate::domain::{EmailAddress, PublicActivity};
use crate::error::{ErrorResponse, TrackerError};

/// `GET /emissions/activities`: Activity catalog grouped by category.
#[utoipa::path(
    get,
    path = "/api/emissions/activities",
    tag = "Emissions",
    summary = "List activities",
    description = "Returns every known activity grouped by category, with name, unit, and description. Emission factors are not exposed.",
    responses(
        (status = 200, description = "Activity catalog", body = BTreeMap<String, BTreeMap<String, PublicActivity>>),
    )
)]
pub async fn list_activities(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.emission_service.activities())
}

/// `GET /emissions/categories`: Category names.
#[utoipa::path(
    get,
    path = "/api/emissions/categories",
    tag = "Emissions",
    summary = "List categories",
    responses(
        (status = 200, description = "Category names", body = CategoriesResponse),
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    Json(CategoriesResponse {
        categories: state.emission_service.categories(),
    })
}

/// `POST /emissions/calculate`: Compute emissions, optionally logging them.
///
/// # Errors
///
/// Returns [`TrackerError`] for an unknown activity, an invalid body, or a
/// persistence failure while logging.
#[utoipa::path(
    post,
    path = "/api/emissions/calculate",
    tag = "Emissions",
    summary = "Calculate emissions",
    description = "Multiplies the quantity by the activity's emission factor and rounds to three decimals. When `user_email` is supplied the result is appended to that user's history, creating the user if needed.",
    request_body = CalculateRequest,
    responses(
        (status = 200, description = "Calculation result", body = CalculateResponse),
        (status = 400, description = "Unknown activity or invalid body", body = ErrorResponse),
        (status = 500, description = "Activity could not be logged", body = ErrorResponse),
    )
)]
pub async fn calculate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CalculateRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let calculation = state
        .emission_service
        .calculate_and_record(&req.activity_type, req.quantity, req.user_email)
        .await?;
    Ok(Json(CalculateResponse::from(calculation)))
}

/// `GET /emissions/history/{email}`: Recent activities for a user.
///
/// # Errors
///
/// Returns [`TrackerError`] for a malformed email or a persistence failure.
#[utoipa::path(
    get,
    path = "/api/emissions/history/{email}",
    tag = "Emissions",
    summary = "Activity history",
    description = "Returns up to 50 of the user's logged activities, newest first. Unknown users get an empty list.",
    params(
        ("email" = String, Path, description = "User email address"),
    ),
    responses(
        (status = 200, description = "Activity history", body = Vec<ActivityResponse>),
        (status = 400, description = "Malformed email", body = ErrorResponse),
    )
)]
pub async fn history(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, TrackerError> {
    let email = EmailAddress::parse(&email)?;
    let activities = state.emission_service.history(&email).await?;
    let body: Vec<ActivityResponse> = activities.into_iter().map(ActivityResponse::from).collect();
    Ok(Json(body))
}

/// Emission routes, nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/emissions/activities", get(list_activities))
        .route("/emissions/categories", get(list_categories))
        .route("/emissions/calculate", post(calculate))
        .route("/emissions/history/{email}", get(history))
}
