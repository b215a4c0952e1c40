//! Core logic for the Vigil agent.
//!
//! This module contains:
//! - Detection state tracking with hysteresis (stranger persistence,
//!   ghost identity continuity)
//! - Alert arbitration (duplicate suppression, category cooldowns,
//!   bounded history)

pub mod arbiter;
pub mod tracker;

// Re-export commonly used types
pub use arbiter::{Alert, AlertArbiter, AlertCategory, CandidateAlert, CooldownTable, Submission};
pub use tracker::{DetectionKind, DetectionSnapshot, DetectionTracker};
