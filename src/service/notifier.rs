//! Fire-and-forget notification dispatch.
//!
//! Handlers call [`NotificationDispatcher::schedule`], which pushes a
//! [`NotificationJob`] onto a bounded queue and returns immediately. A
//! single [`NotificationWorker`] task drains the queue, renders each job,
//! hands it to a [`Mailer`], logs the outcome, and publishes it on the
//! [`EventBus`]. Delivery is attempted once; failures are never reported
//! back to the request that queued the job.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::{
    EmailAddress, EventBus, NotificationEvent, NotificationJob, NotificationKind, OutboundEmail,
    TipCatalog,
};
use crate::error::TrackerError;

/// Outbound mail transport.
pub trait Mailer: Send + Sync + fmt::Debug {
    /// Delivers one message.
    fn deliver<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, Result<(), TrackerError>>;
}

/// Mailer that writes each message to the structured log instead of a
/// network transport.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    credentials_configured: bool,
}

impl LogMailer {
    /// Creates a log mailer. `api_key` only affects what gets logged.
    #[must_use]
    pub fn new(api_key: Option<&str>) -> Self {
        Self {
            credentials_configured: api_key.is_some(),
        }
    }
}

impl Mailer for LogMailer {
    fn deliver<'a>(&'a self, email: &'a OutboundEmail) -> BoxFuture<'a, Result<(), TrackerError>> {
        async move {
            tracing::info!(
                from = %email.from,
                to = %email.to,
                subject = %email.subject,
                body = %email.body,
                credentials_configured = self.credentials_configured,
                "email sent"
            );
            Ok(())
        }
        .boxed()
    }
}

/// Background worker that delivers queued notifications.
#[derive(Debug)]
pub struct NotificationWorker {
    mailer: Arc<dyn Mailer>,
    tips: TipCatalog,
    from: String,
    events: EventBus,
}

impl NotificationWorker {
    /// Creates a worker delivering through `mailer` from address `from`.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, tips: TipCatalog, from: String, events: EventBus) -> Self {
        Self {
            mailer,
            tips,
            from,
            events,
        }
    }

    /// Renders and delivers one job, then logs and publishes the outcome.
    pub async fn handle(&self, job: NotificationJob) -> NotificationEvent {
        let email = self.tips.render(&job, &self.from);
        let event = match self.mailer.deliver(&email).await {
            Ok(()) => {
                tracing::info!(
                    job_id = %job.job_id,
                    kind = job.kind.as_str(),
                    recipient = %job.recipient,
                    "notification delivered"
                );
                NotificationEvent::Delivered {
                    job_id: job.job_id,
                    kind: job.kind,
                    recipient: job.recipient,
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job.job_id,
                    kind = job.kind.as_str(),
                    recipient = %job.recipient,
                    error = %e,
                    "notification delivery failed"
                );
                NotificationEvent::Failed {
                    job_id: job.job_id,
                    kind: job.kind,
                    recipient: job.recipient,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                }
            }
        };
        let _ = self.events.publish(event.clone());
        event
    }

    async fn run(self, mut jobs: mpsc::Receiver<NotificationJob>) {
        tracing::debug!("notification worker started");
        while let Some(job) = jobs.recv().await {
            self.handle(job).await;
        }
        tracing::debug!("notification worker stopped");
    }
}

/// Delivery outcome counts gathered from the [`EventBus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationTally {
    /// Jobs the mailer accepted.
    pub delivered: u64,
    /// Jobs the mailer rejected.
    pub failed: u64,
    /// Events missed because the receiver fell behind.
    pub missed: u64,
}

/// Counts outcomes from `events` until every publisher is gone.
///
/// Each failure is logged as it arrives; the totals are logged once the
/// bus closes.
pub async fn tally_outcomes(mut events: broadcast::Receiver<NotificationEvent>) -> NotificationTally {
    let mut tally = NotificationTally::default();
    loop {
        match events.recv().await {
            Ok(NotificationEvent::Delivered { .. }) => tally.delivered += 1,
            Ok(NotificationEvent::Failed { job_id, reason, .. }) => {
                tally.failed += 1;
                tracing::debug!(%job_id, %reason, failed = tally.failed, "notification failure observed");
            }
            Err(RecvError::Lagged(n)) => {
                tally.missed += n;
                tracing::warn!(missed = n, "notification monitor lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!(
        delivered = tally.delivered,
        failed = tally.failed,
        missed = tally.missed,
        "notification totals"
    );
    tally
}

/// Handle used by services to queue notifications.
///
/// Cloning is cheap; all clones feed the same worker. The worker exits once
/// every clone has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: Option<mpsc::Sender<NotificationJob>>,
}

impl NotificationDispatcher {
    /// Spawns `worker` on the current Tokio runtime behind a queue of
    /// `capacity` jobs.
    #[must_use]
    pub fn start(worker: NotificationWorker, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(worker.run(receiver));
        (
            Self {
                sender: Some(sender),
            },
            handle,
        )
    }

    /// A dispatcher that discards every job.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { sender: None }
    }

    /// Queues a notification without waiting for delivery.
    ///
    /// Returns the job id, or `None` if the job was dropped because
    /// delivery is disabled or the queue is full or closed.
    pub fn schedule(&self, kind: NotificationKind, recipient: EmailAddress) -> Option<Uuid> {
        let Some(sender) = &self.sender else {
            tracing::debug!(kind = kind.as_str(), %recipient, "notifications disabled, dropping");
            return None;
        };

        let job = NotificationJob::new(kind, recipient);
        let job_id = job.job_id;
        match sender.try_send(job) {
            Ok(()) => {
                tracing::debug!(%job_id, kind = kind.as_str(), "notification queued");
                Some(job_id)
            }
            Err(TrySendError::Full(job)) => {
                tracing::warn!(%job_id, recipient = %job.recipient, "notification queue full, dropping");
                None
            }
            Err(TrySendError::Closed(job)) => {
                tracing::warn!(%job_id, recipient = %job.recipient, "notification worker gone, dropping");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;

    /// Mailer that always fails.
    #[derive(Debug)]
    pub(crate) struct FailingMailer;

    impl Mailer for FailingMailer {
        fn deliver<'a>(
            &'a self,
            _email: &'a OutboundEmail,
        ) -> BoxFuture<'a, Result<(), TrackerError>> {
            async { Err(TrackerError::Notification("transport unavailable".to_string())) }.boxed()
        }
    }

    fn recipient() -> EmailAddress {
        let Ok(email) = EmailAddress::parse("notify@example.com") else {
            panic!("valid address");
        };
        email
    }

    fn worker(mailer: Arc<dyn Mailer>, events: &EventBus) -> NotificationWorker {
        NotificationWorker::new(
            mailer,
            TipCatalog::default(),
            "noreply@carbontracker.com".to_string(),
            events.clone(),
        )
    }

    #[tokio::test]
    async fn scheduled_job_is_delivered_and_published() {
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let (dispatcher, _handle) =
            NotificationDispatcher::start(worker(Arc::new(LogMailer::default()), &events), 8);

        let Some(job_id) = dispatcher.schedule(NotificationKind::WeeklyTip, recipient()) else {
            panic!("job should be queued");
        };

        let Ok(event) = rx.recv().await else {
            panic!("expected delivery event");
        };
        assert_eq!(event.job_id(), job_id);
        assert_eq!(event.event_type_str(), "delivered");
    }

    #[tokio::test]
    async fn failed_delivery_is_published_not_propagated() {
        let events = EventBus::new(16);
        let w = worker(Arc::new(FailingMailer), &events);
        let job = NotificationJob::new(NotificationKind::Welcome, recipient());

        let event = w.handle(job).await;
        let NotificationEvent::Failed { reason, .. } = event else {
            panic!("expected failure event");
        };
        assert!(reason.contains("transport unavailable"));
    }

    #[test]
    fn disabled_dispatcher_drops_jobs() {
        let dispatcher = NotificationDispatcher::disabled();
        assert!(dispatcher.schedule(NotificationKind::Welcome, recipient()).is_none());
    }

    #[tokio::test]
    async fn worker_drains_queue_after_senders_drop() {
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let (dispatcher, handle) =
            NotificationDispatcher::start(worker(Arc::new(LogMailer::default()), &events), 8);

        for _ in 0..3 {
            let _ = dispatcher.schedule(NotificationKind::WeeklyTip, recipient());
        }
        drop(dispatcher);

        tokio_test::assert_ok!(handle.await);
        for _ in 0..3 {
            let Ok(event) = rx.recv().await else {
                panic!("each queued job should produce an event");
            };
            assert_eq!(event.event_type_str(), "delivered");
        }
    }

    #[tokio::test]
    async fn tally_counts_each_outcome_until_closed() {
        let events = EventBus::new(16);
        let monitor = tokio::spawn(tally_outcomes(events.subscribe()));

        let ok = worker(Arc::new(LogMailer::default()), &events);
        let failing = worker(Arc::new(FailingMailer), &events);
        drop(events);

        ok.handle(NotificationJob::new(NotificationKind::Welcome, recipient()))
            .await;
        ok.handle(NotificationJob::new(NotificationKind::WeeklyTip, recipient()))
            .await;
        failing
            .handle(NotificationJob::new(NotificationKind::WeeklyTip, recipient()))
            .await;
        drop(ok);
        drop(failing);

        let Ok(tally) = monitor.await else {
            panic!("monitor task should finish");
        };
        assert_eq!(
            tally,
            NotificationTally {
                delivered: 2,
                failed: 1,
                missed: 0
            }
        );
    }
}
