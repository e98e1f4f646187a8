//! Persistence layer: users and the activity log.
//!
//! Provides the [`Store`] trait for durable storage of users and logged
//! calculations. [`postgres::PostgresStore`] is the production backend;
//! [`memory::MemoryStore`] keeps everything in process for development and
//! tests.
//!
//! Every "create if missing" path is decided by the backend in one atomic
//! step (an `ON CONFLICT` upsert against the unique email, or under the
//! memory store's write lock), never by a separate read followed by a write.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use futures_util::future::BoxFuture;

use crate::domain::EmailAddress;
use crate::error::TrackerError;

pub use memory::MemoryStore;
pub use models::{Activity, NewActivity, RecordedActivity, SubscribeOutcome, User};
pub use postgres::PostgresStore;

/// Storage backend for users and activities.
///
/// Methods return boxed `Send` futures so the store can be shared as
/// `Arc<dyn Store>` across handlers.
pub trait Store: Send + Sync + fmt::Debug {
    /// Subscribes `email`. Creates the user with `is_subscribed` when
    /// unknown, re-subscribes an unsubscribed user, and reports
    /// [`SubscribeOutcome::AlreadySubscribed`] otherwise.
    fn subscribe<'a>(
        &'a self,
        email: &'a EmailAddress,
        is_subscribed: bool,
    ) -> BoxFuture<'a, Result<SubscribeOutcome, TrackerError>>;

    /// Clears the subscription flag. Returns `None` if the user is unknown.
    fn unsubscribe<'a>(
        &'a self,
        email: &'a EmailAddress,
    ) -> BoxFuture<'a, Result<Option<User>, TrackerError>>;

    /// Looks up a user by email.
    fn find_user<'a>(
        &'a self,
        email: &'a EmailAddress,
    ) -> BoxFuture<'a, Result<Option<User>, TrackerError>>;

    /// Returns every user ordered by id.
    fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TrackerError>>;

    /// Ensures the owning user exists (subscribed by default) and appends
    /// the activity, as one unit.
    fn record_activity<'a>(
        &'a self,
        activity: &'a NewActivity,
    ) -> BoxFuture<'a, Result<RecordedActivity, TrackerError>>;

    /// Returns at most `limit` activities for `email`, newest first.
    fn recent_activities<'a>(
        &'a self,
        email: &'a EmailAddress,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Activity>, TrackerError>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use futures_util::FutureExt;

    use super::*;

    /// Store whose every operation fails as if the database were down.
    #[derive(Debug)]
    pub(crate) struct FailingStore;

    fn unavailable<'a, T: Send + 'a>() -> BoxFuture<'a, Result<T, TrackerError>> {
        async { Err(TrackerError::Persistence("connection refused".to_string())) }.boxed()
    }

    impl Store for FailingStore {
        fn subscribe<'a>(
            &'a self,
            _email: &'a EmailAddress,
            _is_subscribed: bool,
        ) -> BoxFuture<'a, Result<SubscribeOutcome, TrackerError>> {
            unavailable()
        }

        fn unsubscribe<'a>(
            &'a self,
            _email: &'a EmailAddress,
        ) -> BoxFuture<'a, Result<Option<User>, TrackerError>> {
            unavailable()
        }

        fn find_user<'a>(
            &'a self,
            _email: &'a EmailAddress,
        ) -> BoxFuture<'a, Result<Option<User>, TrackerError>> {
            unavailable()
        }

        fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TrackerError>> {
            unavailable()
        }

        fn record_activity<'a>(
            &'a self,
            _activity: &'a NewActivity,
        ) -> BoxFuture<'a, Result<RecordedActivity, TrackerError>> {
            unavailable()
        }

        fn recent_activities<'a>(
            &'a self,
            _email: &'a EmailAddress,
            _limit: u32,
        ) -> BoxFuture<'a, Result<Vec<Activity>, TrackerError>> {
            unavailable()
        }
    }
}
