//! Process-local implementation of the persistence layer.
//!
//! All tables live behind a single [`tokio::sync::RwLock`]; every mutation
//! takes the write lock once, so the "create if missing" decisions are as
//! atomic as the PostgreSQL upserts.

use std::collections::BTreeMap;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use super::models::{Activity, NewActivity, RecordedActivity, SubscribeOutcome, User};
use super::Store;
use crate::domain::EmailAddress;
use crate::error::TrackerError;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, User>,
    activities: Vec<Activity>,
    last_user_id: i64,
    last_activity_id: i64,
}

impl Tables {
    fn insert_user(&mut self, email: &EmailAddress, is_subscribed: bool) -> User {
        self.last_user_id += 1;
        let user = User {
            id: self.last_user_id,
            email: email.as_str().to_string(),
            is_subscribed,
            created_at: Utc::now(),
        };
        self.users.insert(user.email.clone(), user.clone());
        user
    }
}

/// In-memory store. Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of stored activities.
    pub async fn activity_count(&self) -> usize {
        self.tables.read().await.activities.len()
    }
}

impl Store for MemoryStore {
    fn subscribe<'a>(
        &'a self,
        email: &'a EmailAddress,
        is_subscribed: bool,
    ) -> BoxFuture<'a, Result<SubscribeOutcome, TrackerError>> {
        async move {
            let mut tables = self.tables.write().await;
            let outcome = match tables.users.get_mut(email.as_str()) {
                Some(user) if user.is_subscribed => SubscribeOutcome::AlreadySubscribed,
                Some(user) => {
                    user.is_subscribed = true;
                    SubscribeOutcome::Resubscribed(user.clone())
                }
                None => SubscribeOutcome::Created(tables.insert_user(email, is_subscribed)),
            };
            Ok(outcome)
        }
        .boxed()
    }

    fn unsubscribe<'a>(
        &'a self,
        email: &'a EmailAddress,
    ) -> BoxFuture<'a, Result<Option<User>, TrackerError>> {
        async move {
            let mut tables = self.tables.write().await;
            Ok(tables.users.get_mut(email.as_str()).map(|user| {
                user.is_subscribed = false;
                user.clone()
            }))
        }
        .boxed()
    }

    fn find_user<'a>(
        &'a self,
        email: &'a EmailAddress,
    ) -> BoxFuture<'a, Result<Option<User>, TrackerError>> {
        async move { Ok(self.tables.read().await.users.get(email.as_str()).cloned()) }.boxed()
    }

    fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TrackerError>> {
        async move {
            let tables = self.tables.read().await;
            let mut users: Vec<User> = tables.users.values().cloned().collect();
            users.sort_by_key(|u| u.id);
            Ok(users)
        }
        .boxed()
    }

    fn record_activity<'a>(
        &'a self,
        activity: &'a NewActivity,
    ) -> BoxFuture<'a, Result<RecordedActivity, TrackerError>> {
        async move {
            let mut tables = self.tables.write().await;
            let user_created = if tables.users.contains_key(activity.user_email.as_str()) {
                false
            } else {
                tables.insert_user(&activity.user_email, true);
                true
            };

            tables.last_activity_id += 1;
            let stored = Activity {
                id: tables.last_activity_id,
                user_email: activity.user_email.as_str().to_string(),
                activity_type: activity.activity_type.clone(),
                quantity: activity.quantity,
                co2_emissions: activity.co2_emissions,
                created_at: Utc::now(),
            };
            tables.activities.push(stored.clone());

            Ok(RecordedActivity {
                activity: stored,
                user_created,
            })
        }
        .boxed()
    }

    fn recent_activities<'a>(
        &'a self,
        email: &'a EmailAddress,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Activity>, TrackerError>> {
        async move {
            let tables = self.tables.read().await;
            let mut matching: Vec<Activity> = tables
                .activities
                .iter()
                .filter(|a| a.user_email == email.as_str())
                .cloned()
                .collect();
            matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            matching.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(matching)
        }
        .boxed()
    }
}
