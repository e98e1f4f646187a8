//! Subscription service: subscribe, unsubscribe, tips, and user listing.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{EmailAddress, NotificationKind};
use crate::error::TrackerError;
use crate::persistence::{Store, SubscribeOutcome, User};

use super::notifier::NotificationDispatcher;

/// Orchestrates the subscriber lifecycle
/// (*unknown → subscribed → unsubscribed → subscribed*).
///
/// Notifications are queued on the [`NotificationDispatcher`] and never
/// awaited.
#[derive(Debug, Clone)]
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    dispatcher: NotificationDispatcher,
}

impl SubscriptionService {
    /// Creates a new `SubscriptionService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Subscribes `email`.
    ///
    /// A new user is created with `is_subscribed` and always gets a welcome
    /// notification. A previously unsubscribed user is flipped back without
    /// a second welcome.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::AlreadySubscribed`] if the user is already
    /// subscribed, or a [`TrackerError::Persistence`] on database failure.
    pub async fn subscribe(
        &self,
        email: &EmailAddress,
        is_subscribed: bool,
    ) -> Result<User, TrackerError> {
        match self.store.subscribe(email, is_subscribed).await? {
            SubscribeOutcome::Created(user) => {
                tracing::info!(user_id = user.id, %email, is_subscribed, "user created");
                self.dispatcher
                    .schedule(NotificationKind::Welcome, email.clone());
                Ok(user)
            }
            SubscribeOutcome::Resubscribed(user) => {
                tracing::info!(user_id = user.id, %email, "user re-subscribed");
                Ok(user)
            }
            SubscribeOutcome::AlreadySubscribed => {
                Err(TrackerError::AlreadySubscribed(email.to_string()))
            }
        }
    }

    /// Clears the subscription flag, whatever its current value.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UserNotFound`] if the email is unknown, or a
    /// [`TrackerError::Persistence`] on database failure.
    pub async fn unsubscribe(&self, email: &EmailAddress) -> Result<User, TrackerError> {
        let user = self
            .store
            .unsubscribe(email)
            .await?
            .ok_or_else(|| TrackerError::UserNotFound(email.to_string()))?;
        tracing::info!(user_id = user.id, %email, "user unsubscribed");
        Ok(user)
    }

    /// Queues a random tip for a subscribed user and returns at once.
    ///
    /// Returns the queued job id, or `None` if the dispatcher dropped it.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UserNotFound`] for an unknown email,
    /// [`TrackerError::NotSubscribed`] for an unsubscribed user, or a
    /// [`TrackerError::Persistence`] on database failure.
    pub async fn send_tip(&self, email: &EmailAddress) -> Result<Option<Uuid>, TrackerError> {
        let user = self
            .store
            .find_user(email)
            .await?
            .ok_or_else(|| TrackerError::UserNotFound(email.to_string()))?;
        if !user.is_subscribed {
            return Err(TrackerError::NotSubscribed(email.to_string()));
        }
        Ok(self
            .dispatcher
            .schedule(NotificationKind::WeeklyTip, email.clone()))
    }

    /// Returns every user ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::Persistence`] on database failure.
    pub async fn list_users(&self) -> Result<Vec<User>, TrackerError> {
        self.store.list_users().await
    }
}
