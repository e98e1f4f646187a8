//! Notification jobs, message templates, and delivery events.
//!
//! A [`NotificationJob`] is what request handlers enqueue; the background
//! worker renders it into an [`OutboundEmail`] and reports the result as a
//! [`NotificationEvent`] on the [`super::EventBus`].

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use uuid::Uuid;

use super::EmailAddress;

const WELCOME_SUBJECT: &str = "Welcome to Carbon Footprint Tracker";

const WELCOME_BODY: &str = "Welcome to Carbon Footprint Tracker!

Thank you for taking the first step towards a more sustainable lifestyle.

You'll receive weekly tips to help reduce your carbon footprint.
Every small action counts towards a healthier planet!

Best regards,
The Carbon Tracker Team
";

const TIP_SUBJECT: &str = "Your weekly carbon reduction tip";

const DEFAULT_TIPS: [&str; 10] = [
    "Try carpooling or using public transport once this week to reduce your transport emissions by up to 45%.",
    "Switch to LED bulbs: they use 75% less energy and last 25 times longer than incandescent bulbs.",
    "Try having one plant-based meal today. Beef production creates 27kg of CO₂ per kg, while vegetables create only 2kg.",
    "Recycle properly this week. Recycling aluminum cans saves 95% of the energy needed to make new ones.",
    "Take shorter showers. A 4-minute shower uses about 40 gallons less water than an 8-minute shower.",
    "Lower your thermostat by 2°F in winter and raise it by 2°F in summer to save energy without sacrificing comfort.",
    "Unplug electronics when not in use. Many devices consume energy even when turned off.",
    "Walk or bike for short trips under 2 miles. It's good for you and produces zero emissions!",
    "Buy only what you need. The production of new items has a significant carbon footprint.",
    "Start composting food scraps. It reduces methane emissions from landfills and creates nutrient-rich soil.",
];

/// Kind of notification being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// One-off welcome message for a new subscriber.
    Welcome,
    /// A randomly chosen carbon reduction tip.
    WeeklyTip,
}

impl NotificationKind {
    /// Stable string form used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::WeeklyTip => "weekly_tip",
        }
    }
}

/// A queued notification.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    /// Identifier used to correlate log lines and events.
    pub job_id: Uuid,
    /// What to send.
    pub kind: NotificationKind,
    /// Recipient address.
    pub recipient: EmailAddress,
    /// When the job was queued.
    pub enqueued_at: DateTime<Utc>,
}

impl NotificationJob {
    /// Creates a job with a fresh id.
    #[must_use]
    pub fn new(kind: NotificationKind, recipient: EmailAddress) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            kind,
            recipient,
            enqueued_at: Utc::now(),
        }
    }
}

/// A fully rendered message ready for a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: EmailAddress,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// The fixed list of carbon reduction tips.
#[derive(Debug, Clone)]
pub struct TipCatalog {
    tips: Vec<String>,
}

impl TipCatalog {
    /// Picks one tip uniformly at random.
    #[must_use]
    pub fn random_tip(&self) -> &str {
        self.tips
            .choose(&mut rand::thread_rng())
            .map_or("", String::as_str)
    }

    /// Renders `job` into a message sent from `from`.
    #[must_use]
    pub fn render(&self, job: &NotificationJob, from: &str) -> OutboundEmail {
        let (subject, body) = match job.kind {
            NotificationKind::Welcome => (WELCOME_SUBJECT.to_string(), WELCOME_BODY.to_string()),
            NotificationKind::WeeklyTip => (TIP_SUBJECT.to_string(), self.random_tip().to_string()),
        };
        OutboundEmail {
            from: from.to_string(),
            to: job.recipient.clone(),
            subject,
            body,
        }
    }
}

impl Default for TipCatalog {
    fn default() -> Self {
        Self {
            tips: DEFAULT_TIPS.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// Delivery outcome published after the worker handles a job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// The mailer accepted the message.
    Delivered {
        /// Job identifier.
        job_id: Uuid,
        /// Kind of notification.
        kind: NotificationKind,
        /// Recipient address.
        recipient: EmailAddress,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The mailer returned an error. The job is not retried.
    Failed {
        /// Job identifier.
        job_id: Uuid,
        /// Kind of notification.
        kind: NotificationKind,
        /// Recipient address.
        recipient: EmailAddress,
        /// Error reported by the mailer.
        reason: String,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    /// Returns the job this event refers to.
    #[must_use]
    pub const fn job_id(&self) -> Uuid {
        match self {
            Self::Delivered { job_id, .. } | Self::Failed { job_id, .. } => *job_id,
        }
    }

    /// Returns the event type as a static string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn recipient() -> EmailAddress {
        let Ok(email) = EmailAddress::parse("reader@example.com") else {
            panic!("valid address");
        };
        email
    }

    #[test]
    fn default_catalog_has_ten_tips() {
        assert_eq!(TipCatalog::default().tips.len(), 10);
    }

    #[test]
    fn random_tip_comes_from_catalog() {
        let catalog = TipCatalog {
            tips: vec!["a".to_string(), "b".to_string()],
        };
        for _ in 0..20 {
            let tip = catalog.random_tip();
            assert!(tip == "a" || tip == "b");
        }
    }

    #[test]
    fn welcome_uses_fixed_template() {
        let catalog = TipCatalog::default();
        let job = NotificationJob::new(NotificationKind::Welcome, recipient());
        let email = catalog.render(&job, "noreply@carbontracker.com");
        assert_eq!(email.subject, WELCOME_SUBJECT);
        assert!(email.body.contains("weekly tips"));
        assert_eq!(email.to, recipient());
    }

    #[test]
    fn tip_body_is_a_catalog_entry() {
        let catalog = TipCatalog::default();
        let job = NotificationJob::new(NotificationKind::WeeklyTip, recipient());
        let email = catalog.render(&job, "noreply@carbontracker.com");
        assert!(catalog.tips.iter().any(|t| *t == email.body));
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = NotificationEvent::Failed {
            job_id: Uuid::new_v4(),
            kind: NotificationKind::WeeklyTip,
            recipient: recipient(),
            reason: "smtp down".to_string(),
            timestamp: Utc::now(),
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("event must serialize");
        };
        assert_eq!(json["event_type"], "failed");
        assert_eq!(json["kind"], "weekly_tip");
        assert_eq!(event.event_type_str(), "failed");
    }
}
