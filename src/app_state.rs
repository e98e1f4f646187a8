//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{EmissionService, SubscriptionService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Calculation, activity logging, and history.
    pub emission_service: Arc<EmissionService>,
    /// Subscriber lifecycle and tip scheduling.
    pub subscription_service: Arc<SubscriptionService>,
}

impl AppState {
    /// Bundles the services.
    #[must_use]
    pub fn new(emission_service: EmissionService, subscription_service: SubscriptionService) -> Self {
        Self {
            emission_service: Arc::new(emission_service),
            subscription_service: Arc::new(subscription_service),
        }
    }
}
