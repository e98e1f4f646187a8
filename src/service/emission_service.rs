//! Emission service: calculation, activity logging, and history.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{Calculation, EmailAddress, EmissionFactorTable, PublicActivity};
use crate::error::TrackerError;
use crate::persistence::{Activity, NewActivity, Store};

/// Maximum number of activities returned by [`EmissionService::history`].
pub const HISTORY_LIMIT: u32 = 50;

/// Orchestrates the calculate-then-log workflow.
///
/// Owns a shared reference to the immutable [`EmissionFactorTable`] and
/// the [`Store`] the activity log lives in.
#[derive(Debug, Clone)]
pub struct EmissionService {
    factors: Arc<EmissionFactorTable>,
    store: Arc<dyn Store>,
}

impl EmissionService {
    /// Creates a new `EmissionService`.
    #[must_use]
    pub fn new(factors: Arc<EmissionFactorTable>, store: Arc<dyn Store>) -> Self {
        Self { factors, store }
    }

    /// Computes emissions for `quantity` units of `activity_type`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ActivityNotFound`] if the activity is not in
    /// the factor table.
    pub fn calculate(&self, activity_type: &str, quantity: f64) -> Result<Calculation, TrackerError> {
        self.factors
            .calculate(activity_type, quantity)
            .ok_or_else(|| TrackerError::ActivityNotFound(activity_type.to_string()))
    }

    /// Computes emissions and, when `user_email` is given, appends the
    /// result to that user's activity log (creating the user if needed).
    ///
    /// The calculation is returned whether or not anything was persisted.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ActivityNotFound`] for an unknown activity,
    /// or a [`TrackerError::Persistence`] if the log cannot be written.
    pub async fn calculate_and_record(
        &self,
        activity_type: &str,
        quantity: f64,
        user_email: Option<EmailAddress>,
    ) -> Result<Calculation, TrackerError> {
        let calculation = self.calculate(activity_type, quantity)?;

        if let Some(email) = user_email {
            let recorded = self
                .store
                .record_activity(&NewActivity::from_calculation(email, &calculation))
                .await?;
            if recorded.user_created {
                tracing::info!(email = %recorded.activity.user_email, "user created from calculation");
            }
            tracing::info!(
                activity_id = recorded.activity.id,
                email = %recorded.activity.user_email,
                activity_type = %calculation.activity_type,
                co2_emissions = calculation.co2_emissions,
                "activity recorded"
            );
        }

        Ok(calculation)
    }

    /// Returns the most recent [`HISTORY_LIMIT`] activities for `email`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::Persistence`] on database failure.
    pub async fn history(&self, email: &EmailAddress) -> Result<Vec<Activity>, TrackerError> {
        self.store.recent_activities(email, HISTORY_LIMIT).await
    }

    /// The factor table grouped by category, factors omitted.
    #[must_use]
    pub fn activities(&self) -> BTreeMap<String, BTreeMap<String, PublicActivity>> {
        self.factors.public_activities()
    }

    /// Category names.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.factors.categories()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::persistence::tests::FailingStore;

    const BUNDLED: &str = include_str!("../../data/emission_factors.json");

    fn make_service() -> (EmissionService, Arc<MemoryStore>) {
        let Ok(table) = EmissionFactorTable::from_json_str(BUNDLED) else {
            panic!("bundled factors must parse");
        };
        let store = Arc::new(MemoryStore::new());
        let service = EmissionService::new(Arc::new(table), Arc::clone(&store) as Arc<dyn Store>);
        (service, store)
    }

    fn email(raw: &str) -> EmailAddress {
        let Ok(email) = EmailAddress::parse(raw) else {
            panic!("valid address");
        };
        email
    }

    #[tokio::test]
    async fn anonymous_calculation_is_not_persisted() {
        let (service, store) = make_service();
        let Ok(calc) = service.calculate_and_record("car_gasoline", 10.0, None).await else {
            panic!("calculation should succeed");
        };
        assert_eq!(calc.co2_emissions, 2.1);
        assert_eq!(store.activity_count().await, 0);
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn calculation_with_email_logs_activity() {
        let (service, store) = make_service();
        let owner = email("eco@example.com");

        let Ok(calc) = service
            .calculate_and_record("beef", 0.5, Some(owner.clone()))
            .await
        else {
            panic!("calculation should succeed");
        };
        assert_eq!(calc.co2_emissions, 13.5);

        let Ok(history) = service.history(&owner).await else {
            panic!("history should load");
        };
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().map(|a| a.co2_emissions), Some(13.5));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_activity_is_rejected_before_persistence() {
        let (service, store) = make_service();
        let result = service
            .calculate_and_record("nonexistent", 1.0, Some(email("x@example.com")))
            .await;
        let Err(TrackerError::ActivityNotFound(id)) = result else {
            panic!("expected ActivityNotFound");
        };
        assert_eq!(id, "nonexistent");
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let (service, _store) = make_service();
        let owner = email("busy@example.com");
        for _ in 0..(HISTORY_LIMIT + 5) {
            let _ = service
                .calculate_and_record("train", 12.0, Some(owner.clone()))
                .await;
        }
        let Ok(history) = service.history(&owner).await else {
            panic!("history should load");
        };
        assert_eq!(history.len(), HISTORY_LIMIT as usize);
    }

    #[test]
    fn catalog_views_are_stable() {
        let (service, _store) = make_service();
        assert_eq!(service.categories(), service.categories());
        assert_eq!(service.activities(), service.activities());
    }

    #[tokio::test]
    async fn persistence_failure_fails_logged_calculation() {
        let Ok(table) = EmissionFactorTable::from_json_str(BUNDLED) else {
            panic!("bundled factors must parse");
        };
        let service = EmissionService::new(Arc::new(table), Arc::new(FailingStore));

        let result = service
            .calculate_and_record("car_gasoline", 10.0, Some(email("down@example.com")))
            .await;
        assert!(matches!(result, Err(TrackerError::Persistence(_))));

        // Nothing to persist, so the outage is not observed.
        let Ok(calc) = service.calculate_and_record("car_gasoline", 10.0, None).await else {
            panic!("anonymous calculation should succeed");
        };
        assert_eq!(calc.co2_emissions, 2.1);
    }
}
