//! Subscriber handlers: subscribe, unsubscribe, tips, and listing.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    MessageResponse, SubscribeRequest, TipRequest, UnsubscribeParams, UserResponse,
};
use crate::api::extract::{ValidatedJson, ValidatedQuery};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, TrackerError};

/// `POST /users/subscribe`: Subscribe an email to weekly tips.
///
/// # Errors
///
/// Returns [`TrackerError`] if the user is already subscribed or the body
/// is invalid.
#[utoipa::path(
    post,
    path = "/api/users/subscribe",
    tag = "Users",
    summary = "Subscribe",
    description = "Creates the user (sending a welcome email) or re-subscribes a previously unsubscribed user.",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscribed user", body = UserResponse),
        (status = 400, description = "Already subscribed or invalid body", body = ErrorResponse),
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SubscribeRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let user = state
        .subscription_service
        .subscribe(&req.email, req.is_subscribed)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// `POST /users/unsubscribe?email=`: Stop weekly tips.
///
/// # Errors
///
/// Returns [`TrackerError`] if the email is unknown or malformed.
#[utoipa::path(
    post,
    path = "/api/users/unsubscribe",
    tag = "Users",
    summary = "Unsubscribe",
    params(UnsubscribeParams),
    responses(
        (status = 200, description = "Unsubscribed", body = MessageResponse),
        (status = 400, description = "Malformed email", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<UnsubscribeParams>,
) -> Result<impl IntoResponse, TrackerError> {
    state.subscription_service.unsubscribe(&params.email).await?;
    Ok(Json(MessageResponse::new("Successfully unsubscribed")))
}

/// `POST /users/send-tip`: Queue a random tip for a subscriber.
///
/// # Errors
///
/// Returns [`TrackerError`] if the user is unknown or not subscribed.
#[utoipa::path(
    post,
    path = "/api/users/send-tip",
    tag = "Users",
    summary = "Send a tip",
    description = "Queues one random sustainability tip for delivery and returns immediately.",
    request_body = TipRequest,
    responses(
        (status = 200, description = "Tip queued", body = MessageResponse),
        (status = 400, description = "User is not subscribed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn send_tip(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TipRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let job_id = state.subscription_service.send_tip(&req.email).await?;
    tracing::debug!(email = %req.email, ?job_id, "tip requested");
    Ok(Json(MessageResponse::new("Weekly tip will be sent shortly")))
}

/// `GET /users/`: List every user.
///
/// # Errors
///
/// Returns [`TrackerError`] on persistence failure.
#[utoipa::path(
    get,
    path = "/api/users/",
    tag = "Users",
    summary = "List users",
    description = "Returns every user ordered by id. Also served at `/api/users`.",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
    )
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, TrackerError> {
    let users = state.subscription_service.list_users().await?;
    let body: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(body))
}

/// User routes, nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/subscribe", post(subscribe))
        .route("/users/unsubscribe", post(unsubscribe))
        .route("/users/send-tip", post(send_tip))
        .route("/users/", get(list_users))
        .route("/users", get(list_users))
}
