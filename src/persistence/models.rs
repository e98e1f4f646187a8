//! Database models for users and activities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Calculation, EmailAddress};

/// A stored row from the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Auto-increment row ID.
    pub id: i64,
    /// Unique email address.
    pub email: String,
    /// Whether the user currently receives tips.
    pub is_subscribed: bool,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A stored row from the `activities` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Auto-increment row ID.
    pub id: i64,
    /// Email of the user the calculation was logged for.
    pub user_email: String,
    /// Activity identifier from the emission factor table.
    pub activity_type: String,
    /// Quantity supplied by the caller.
    pub quantity: f64,
    /// Emissions computed at calculation time, in kg CO₂.
    pub co2_emissions: f64,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// An activity about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    /// Owner of the activity; created on the fly if unknown.
    pub user_email: EmailAddress,
    /// Activity identifier.
    pub activity_type: String,
    /// Quantity supplied by the caller.
    pub quantity: f64,
    /// Computed emissions.
    pub co2_emissions: f64,
}

impl NewActivity {
    /// Builds the row to append for `calculation` on behalf of `user_email`.
    #[must_use]
    pub fn from_calculation(user_email: EmailAddress, calculation: &Calculation) -> Self {
        Self {
            user_email,
            activity_type: calculation.activity_type.clone(),
            quantity: calculation.quantity,
            co2_emissions: calculation.co2_emissions,
        }
    }
}

/// Result of appending an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedActivity {
    /// The stored row.
    pub activity: Activity,
    /// `true` if the owning user did not exist and was created.
    pub user_created: bool,
}

/// Result of a subscribe request, decided atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOutcome {
    /// No user existed; a new row was inserted.
    Created(User),
    /// The user existed unsubscribed and was flipped back to subscribed.
    Resubscribed(User),
    /// The user exists and is already subscribed. Nothing changed.
    AlreadySubscribed,
}
