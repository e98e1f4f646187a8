//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{Activity, NewActivity, RecordedActivity, SubscribeOutcome, User};
use super::Store;
use crate::config::TrackerConfig;
use crate::domain::EmailAddress;
use crate::error::TrackerError;

type UserRow = (i64, String, bool, DateTime<Utc>);
type ActivityRow = (i64, String, String, f64, f64, DateTime<Utc>);

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::Persistence`] if the database cannot be
    /// reached within the configured timeout.
    pub async fn connect(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), TrackerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TrackerError::Persistence(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    async fn subscribe_inner(
        &self,
        email: &EmailAddress,
        is_subscribed: bool,
    ) -> Result<SubscribeOutcome, TrackerError> {
        // The conditional DO UPDATE only touches unsubscribed rows, so an
        // already-subscribed email yields no row at all. `xmax = 0` holds
        // for freshly inserted tuples.
        let row = sqlx::query_as::<_, (i64, String, bool, DateTime<Utc>, bool)>(
            "INSERT INTO users (email, is_subscribed) VALUES ($1, $2) \
             ON CONFLICT (email) DO UPDATE SET is_subscribed = TRUE \
             WHERE users.is_subscribed = FALSE \
             RETURNING id, email, is_subscribed, created_at, (xmax = 0) AS inserted",
        )
        .bind(email.as_str())
        .bind(is_subscribed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            None => SubscribeOutcome::AlreadySubscribed,
            Some((id, email, is_subscribed, created_at, inserted)) => {
                let user = User {
                    id,
                    email,
                    is_subscribed,
                    created_at,
                };
                if inserted {
                    SubscribeOutcome::Created(user)
                } else {
                    SubscribeOutcome::Resubscribed(user)
                }
            }
        })
    }

    async fn unsubscribe_inner(&self, email: &EmailAddress) -> Result<Option<User>, TrackerError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET is_subscribed = FALSE WHERE email = $1 \
             RETURNING id, email, is_subscribed, created_at",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_user_inner(&self, email: &EmailAddress) -> Result<Option<User>, TrackerError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, is_subscribed, created_at FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn list_users_inner(&self) -> Result<Vec<User>, TrackerError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, is_subscribed, created_at FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn record_activity_inner(
        &self,
        activity: &NewActivity,
    ) -> Result<RecordedActivity, TrackerError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (email) VALUES ($1) ON CONFLICT (email) DO NOTHING",
        )
        .bind(activity.user_email.as_str())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, ActivityRow>(
            "INSERT INTO activities (user_email, activity_type, quantity, co2_emissions) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_email, activity_type, quantity, co2_emissions, created_at",
        )
        .bind(activity.user_email.as_str())
        .bind(&activity.activity_type)
        .bind(activity.quantity)
        .bind(activity.co2_emissions)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RecordedActivity {
            activity: activity_from_row(row),
            user_created: inserted.rows_affected() == 1,
        })
    }

    async fn recent_activities_inner(
        &self,
        email: &EmailAddress,
        limit: u32,
    ) -> Result<Vec<Activity>, TrackerError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, user_email, activity_type, quantity, co2_emissions, created_at \
             FROM activities WHERE user_email = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(email.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(activity_from_row).collect())
    }
}

impl Store for PostgresStore {
    fn subscribe<'a>(
        &'a self,
        email: &'a EmailAddress,
        is_subscribed: bool,
    ) -> BoxFuture<'a, Result<SubscribeOutcome, TrackerError>> {
        self.subscribe_inner(email, is_subscribed).boxed()
    }

    fn unsubscribe<'a>(
        &'a self,
        email: &'a EmailAddress,
    ) -> BoxFuture<'a, Result<Option<User>, TrackerError>> {
        self.unsubscribe_inner(email).boxed()
    }

    fn find_user<'a>(
        &'a self,
        email: &'a EmailAddress,
    ) -> BoxFuture<'a, Result<Option<User>, TrackerError>> {
        self.find_user_inner(email).boxed()
    }

    fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TrackerError>> {
        self.list_users_inner().boxed()
    }

    fn record_activity<'a>(
        &'a self,
        activity: &'a NewActivity,
    ) -> BoxFuture<'a, Result<RecordedActivity, TrackerError>> {
        self.record_activity_inner(activity).boxed()
    }

    fn recent_activities<'a>(
        &'a self,
        email: &'a EmailAddress,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Activity>, TrackerError>> {
        self.recent_activities_inner(email, limit).boxed()
    }
}

fn user_from_row((id, email, is_subscribed, created_at): UserRow) -> User {
    User {
        id,
        email,
        is_subscribed,
        created_at,
    }
}

fn activity_from_row(
    (id, user_email, activity_type, quantity, co2_emissions, created_at): ActivityRow,
) -> Activity {
    Activity {
        id,
        user_email,
        activity_type,
        quantity,
        co2_emissions,
        created_at,
    }
}
