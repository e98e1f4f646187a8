//! # carbon-tracker
//!
//! REST API for calculating and tracking personal carbon emissions.
//!
//! Clients look up emission factors, compute the CO₂ footprint of an
//! activity, keep a per-user history of calculations, and subscribe to
//! weekly sustainability tips delivered by a background worker.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── EmissionService, SubscriptionService (service/)
//!     ├── NotificationDispatcher ─► NotificationWorker ─► Mailer
//!     │                                   │
//!     │                                   └── EventBus (domain/)
//!     │
//!     ├── EmissionFactorTable (domain/)
//!     │
//!     └── Store: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
