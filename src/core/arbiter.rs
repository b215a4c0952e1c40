//! Alert arbitration: the gate between candidate alerts and the history.
//!
//! Two independent suppression layers sit in front of the history. A
//! candidate whose exact message text was stored recently is a duplicate
//! and returns the existing alert; a candidate whose category fired too
//! recently is dropped. Only accepted alerts consume the cooldown.

use crate::config::CooldownConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Closed set of alert categories.
///
/// Free-form category strings are deliberately not representable; the
/// wire format is the lowercase variant name under the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Motion,
    Reminder,
    Emergency,
    Warning,
    Security,
}

/// An alert the tracker wants to raise; not yet accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAlert {
    pub category: AlertCategory,
    pub message: String,
}

impl CandidateAlert {
    pub fn new(category: AlertCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// A persisted alert. Immutable once stored, apart from the `read` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub category: AlertCategory,
    pub message: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Per-category minimum re-fire intervals with last-fired bookkeeping.
#[derive(Debug, Clone)]
pub struct CooldownTable {
    intervals: HashMap<AlertCategory, Duration>,
    last_fired: HashMap<AlertCategory, DateTime<Utc>>,
}

impl CooldownTable {
    pub fn new(config: &CooldownConfig) -> Self {
        let intervals = HashMap::from([
            (AlertCategory::Motion, Duration::seconds(config.motion_secs as i64)),
            (AlertCategory::Reminder, Duration::seconds(config.reminder_secs as i64)),
            (AlertCategory::Emergency, Duration::seconds(config.emergency_secs as i64)),
            (AlertCategory::Warning, Duration::seconds(config.warning_secs as i64)),
            (AlertCategory::Security, Duration::seconds(config.security_secs as i64)),
        ]);
        Self {
            intervals,
            last_fired: HashMap::new(),
        }
    }

    /// Whether the category's cooldown has elapsed. Does not consume it.
    pub fn ready_at(&self, category: AlertCategory, now: DateTime<Utc>) -> bool {
        let interval = self
            .intervals
            .get(&category)
            .copied()
            .unwrap_or_else(Duration::zero);
        match self.last_fired.get(&category) {
            Some(last) => now - *last >= interval,
            None => true,
        }
    }

    /// Consume the cooldown for an accepted firing.
    pub fn mark_fired(&mut self, category: AlertCategory, now: DateTime<Utc>) {
        self.last_fired.insert(category, now);
    }

    /// Check-and-consume in one step, for callers that fire unconditionally
    /// once the gate opens.
    pub fn can_trigger_at(&mut self, category: AlertCategory, now: DateTime<Utc>) -> bool {
        if self.ready_at(category, now) {
            self.mark_fired(category, now);
            true
        } else {
            false
        }
    }
}

/// Outcome of submitting a candidate alert.
///
/// Suppression is an expected outcome, not an error, so both suppressed
/// shapes carry enough for the caller to tell what happened.
#[derive(Debug, Clone)]
pub enum Submission {
    /// A new alert was stored
    Accepted(Alert),
    /// An identical message is already in recent history; that alert is returned
    Duplicate(Alert),
    /// The category's cooldown has not elapsed; dropped silently
    CoolingDown,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }

    /// The stored alert this submission resolved to, if any.
    pub fn alert(&self) -> Option<&Alert> {
        match self {
            Submission::Accepted(a) | Submission::Duplicate(a) => Some(a),
            Submission::CoolingDown => None,
        }
    }
}

/// Owns the bounded alert history and the authoritative cooldown table.
pub struct AlertArbiter {
    history: VecDeque<Alert>,
    cooldowns: CooldownTable,
    history_limit: usize,
    duplicate_window: Duration,
}

impl AlertArbiter {
    pub fn new(cooldowns: &CooldownConfig, history_limit: usize, duplicate_suppress_secs: u64) -> Self {
        Self {
            history: VecDeque::new(),
            cooldowns: CooldownTable::new(cooldowns),
            history_limit,
            duplicate_window: Duration::seconds(duplicate_suppress_secs as i64),
        }
    }

    /// Submit a candidate using the current wall clock.
    pub fn submit(&mut self, candidate: CandidateAlert) -> Submission {
        self.submit_at(candidate, Utc::now())
    }

    /// Submit a candidate at an explicit instant.
    ///
    /// The tracker is expected to have pre-checked the cooldown, but the
    /// check here is authoritative: the tracker's view can be stale.
    pub fn submit_at(&mut self, candidate: CandidateAlert, now: DateTime<Utc>) -> Submission {
        // Newest matching message decides duplicate status; an older
        // same-text alert past the window must not mask a recent one.
        if let Some(existing) = self
            .history
            .iter()
            .rev()
            .find(|a| a.message == candidate.message)
        {
            if now - existing.created_at < self.duplicate_window {
                return Submission::Duplicate(existing.clone());
            }
        }

        if !self.cooldowns.ready_at(candidate.category, now) {
            return Submission::CoolingDown;
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            category: candidate.category,
            message: candidate.message,
            created_at: now,
            read: false,
        };

        self.history.push_back(alert.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        self.cooldowns.mark_fired(candidate.category, now);

        Submission::Accepted(alert)
    }

    /// All stored alerts, newest first.
    pub fn list(&self) -> Vec<Alert> {
        self.history.iter().rev().cloned().collect()
    }

    /// Flip an alert's read flag. Idempotent; false when the id is unknown.
    pub fn mark_read(&mut self, id: Uuid) -> bool {
        match self.history.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.read = true;
                true
            }
            None => false,
        }
    }

    /// Discard the entire history.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Keep only alerts matching the predicate.
    ///
    /// Capability for policy-driven retraction (e.g. dropping stranger
    /// alerts after an enrollment); the tracker never calls this itself.
    pub fn retain<F>(&mut self, predicate: F)
    where
        F: Fn(&Alert) -> bool,
    {
        self.history.retain(|a| predicate(a));
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
