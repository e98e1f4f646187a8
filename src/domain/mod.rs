//! Domain layer: emission factors, validated identities, and notifications.
//!
//! This module holds the server-side domain model: the read-only emission
//! factor table with its calculator, the validated [`EmailAddress`]
//! newtype, notification jobs and templates, and the event bus that
//! reports notification outcomes.

pub mod email;
pub mod emission_factor;
pub mod event_bus;
pub mod notification;

pub use email::EmailAddress;
pub use emission_factor::{Calculation, EmissionFactor, EmissionFactorTable, PublicActivity};
pub use event_bus::EventBus;
pub use notification::{
    NotificationEvent, NotificationJob, NotificationKind, OutboundEmail, TipCatalog,
};
