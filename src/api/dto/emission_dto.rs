//! Emission calculation, catalog, and history DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Calculation, EmailAddress};
use crate::persistence::Activity;

/// Request body for `POST /api/emissions/calculate`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CalculateRequest {
    /// Activity identifier from the factor table (e.g. `"car_gasoline"`).
    #[validate(length(min = 1, max = 100))]
    pub activity_type: String,
    /// Amount of the activity in the factor's unit. Not bounds-checked.
    pub quantity: f64,
    /// When present, the calculation is logged for this user.
    #[serde(default)]
    pub user_email: Option<EmailAddress>,
}

/// Response body for `POST /api/emissions/calculate`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalculateResponse {
    /// Activity identifier.
    pub activity_type: String,
    /// Quantity echoed from the request.
    pub quantity: f64,
    /// Emissions in kg CO₂, rounded to three decimals.
    pub co2_emissions: f64,
    /// Unit of the emission factor (e.g. `"kg CO₂/km"`).
    pub unit: String,
}

impl From<Calculation> for CalculateResponse {
    fn from(calc: Calculation) -> Self {
        Self {
            activity_type: calc.activity_type,
            quantity: calc.quantity,
            co2_emissions: calc.co2_emissions,
            unit: calc.unit,
        }
    }
}

/// Response body for `GET /api/emissions/categories`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoriesResponse {
    /// Category names.
    pub categories: Vec<String>,
}

/// One entry of `GET /api/emissions/history/{email}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivityResponse {
    /// Row identifier.
    pub id: i64,
    /// Owner email.
    pub user_email: String,
    /// Activity identifier.
    pub activity_type: String,
    /// Quantity supplied at calculation time.
    pub quantity: f64,
    /// Emissions computed at calculation time.
    pub co2_emissions: f64,
    /// When the calculation was logged.
    pub created_at: DateTime<Utc>,
}

impl From<Activity> for ActivityResponse {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id,
            user_email: a.user_email,
            activity_type: a.activity_type,
            quantity: a.quantity,
            co2_emissions: a.co2_emissions,
            created_at: a.created_at,
        }
    }
}
