//! Service layer: business logic orchestration.
//!
//! [`EmissionService`] runs the calculate-then-log workflow and
//! [`SubscriptionService`] the subscriber lifecycle. Both delegate storage
//! to a [`crate::persistence::Store`]; notifications go through the
//! [`notifier::NotificationDispatcher`] queue.

pub mod emission_service;
pub mod notifier;
pub mod subscription_service;

pub use emission_service::{EmissionService, HISTORY_LIMIT};
pub use notifier::{
    LogMailer, Mailer, NotificationDispatcher, NotificationTally, NotificationWorker, tally_outcomes,
};
pub use subscription_service::SubscriptionService;
