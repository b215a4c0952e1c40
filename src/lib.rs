//! Vigil Agent - detection state tracking and alert arbitration for a
//! live camera monitoring dashboard.
//!
//! A background sensing loop samples frames, classifies them (identity,
//! motion, fall posture), and folds the noisy per-frame results into a
//! stable detection snapshot plus a small number of de-duplicated,
//! rate-limited alerts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Vigil Agent                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐              │
//! │  │  Sensing  │──▶│ Detection │──▶│   Alert   │              │
//! │  │  (frames) │   │  Tracker  │   │  Arbiter  │              │
//! │  └───────────┘   └───────────┘   └───────────┘              │
//! │                        │               │                     │
//! │                        ▼               ▼                     │
//! │                  ┌──────────────────────────┐   ┌─────────┐ │
//! │                  │    Shared State Store    │◀──│  HTTP   │ │
//! │                  │  (snapshot + history)    │   │   API   │ │
//! │                  └──────────────────────────┘   └─────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sensing loop is the sole writer of tracker state and the store;
//! API handlers are concurrent readers that copy values out. Hysteresis
//! (stranger persistence, ghost identity continuity, sustained-absence
//! re-arming) lives in the tracker; duplicate suppression and category
//! cooldowns live in the arbiter.

pub mod config;
pub mod core;
pub mod processor;
pub mod sensing;
pub mod server;
pub mod store;
pub mod users;

// Re-export key types at crate root for convenience
pub use crate::config::{Config, ConfigError, CooldownConfig};
pub use crate::core::{
    Alert, AlertArbiter, AlertCategory, CandidateAlert, DetectionKind, DetectionSnapshot,
    DetectionTracker, Submission,
};
pub use crate::processor::{Processor, ProcessorStats, StatsSnapshot};
pub use crate::sensing::{Classification, Frame, FrameEvent, Identity, SensorError, Sensors};
pub use crate::store::{SharedStateStore, StateStore};
pub use crate::users::{UserDirectory, UserRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
