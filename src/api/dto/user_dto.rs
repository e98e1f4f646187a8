//! Subscriber DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::EmailAddress;
use crate::persistence::User;

/// Request body for `POST /api/users/subscribe`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubscribeRequest {
    /// Address to subscribe.
    pub email: EmailAddress,
    /// Initial flag for a newly created user. Defaults to `true`.
    #[serde(default = "default_subscribed")]
    pub is_subscribed: bool,
}

/// Query parameters for `POST /api/users/unsubscribe`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UnsubscribeParams {
    /// Address to unsubscribe.
    #[param(value_type = String)]
    pub email: EmailAddress,
}

/// Request body for `POST /api/users/send-tip`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TipRequest {
    /// Recipient of the tip.
    pub email: EmailAddress,
}

/// A subscriber record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Row identifier.
    pub id: i64,
    /// Email address.
    pub email: String,
    /// Whether tips are sent to this user.
    pub is_subscribed: bool,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_subscribed: u.is_subscribed,
            created_at: u.created_at,
        }
    }
}

fn default_subscribed() -> bool {
    true
}
