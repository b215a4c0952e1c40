//! Detection state tracking with hysteresis.
//!
//! The tracker turns the noisy per-frame classifier stream into a stable
//! [`DetectionSnapshot`] and zero or more [`CandidateAlert`]s. Transient
//! misclassifications are absorbed three ways: a stranger must persist
//! for a run of frames before alerting, a known identity survives brief
//! detection dropouts (the "ghost" grace period), and stranger detection
//! only re-arms after a sustained absence or a known sighting.

use crate::config::Config;
use crate::core::arbiter::{AlertCategory, CandidateAlert, CooldownTable};
use crate::sensing::{FrameEvent, Identity, ReminderLookup};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What kind of thing the camera currently sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    None,
    Motion,
    Face,
    Fall,
}

/// The single current best-known description of what the camera sees.
///
/// Invariant: `is_known` implies `kind == Face`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSnapshot {
    pub kind: DetectionKind,
    pub name: Option<String>,
    #[serde(rename = "isKnown")]
    pub is_known: bool,
    pub confidence: Option<f32>,
}

impl DetectionSnapshot {
    /// The reset state: nothing in frame.
    pub fn neutral() -> Self {
        Self {
            kind: DetectionKind::None,
            name: None,
            is_known: false,
            confidence: None,
        }
    }

    /// The display label for the person in frame, when one is recognized.
    fn subject(&self) -> Option<&str> {
        if self.is_known {
            self.name.as_deref()
        } else {
            None
        }
    }
}

impl Default for DetectionSnapshot {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Hysteresis state, mutated only by the tracker on the sensing thread.
#[derive(Debug, Default)]
struct TrackingState {
    consecutive_unknown_frames: u32,
    consecutive_no_face_frames: u32,
    known_user_present: bool,
    stranger_alert_armed: bool,
    last_known_identity: Option<(String, DateTime<Utc>)>,
    ghost_active: bool,
}

/// Consumes `FrameEvent`s; owns the hysteresis counters and the
/// pre-check cooldown table.
pub struct DetectionTracker {
    unknown_threshold: u32,
    no_face_reset_threshold: u32,
    ghost_grace: Duration,
    cooldowns: CooldownTable,
    reminders: Box<dyn ReminderLookup>,
    state: TrackingState,
}

impl DetectionTracker {
    pub fn new(config: &Config, reminders: Box<dyn ReminderLookup>) -> Self {
        Self {
            unknown_threshold: config.unknown_threshold,
            no_face_reset_threshold: config.no_face_reset_threshold,
            ghost_grace: Duration::seconds(config.ghost_grace_secs as i64),
            cooldowns: CooldownTable::new(&config.cooldowns),
            reminders,
            state: TrackingState::default(),
        }
    }

    /// Whether a known user is currently considered present.
    pub fn known_user_present(&self) -> bool {
        self.state.known_user_present
    }

    /// Whether the current known-user state is carried by the ghost grace
    /// period rather than a live sighting.
    pub fn ghost_active(&self) -> bool {
        self.state.ghost_active
    }

    /// Ingest one frame event using the current wall clock.
    pub fn ingest(&mut self, event: &FrameEvent) -> (DetectionSnapshot, Vec<CandidateAlert>) {
        self.ingest_at(event, Utc::now())
    }

    /// Ingest one frame event at an explicit instant. Never fails: any
    /// collaborator error inside is logged and degraded, not propagated.
    pub fn ingest_at(
        &mut self,
        event: &FrameEvent,
        now: DateTime<Utc>,
    ) -> (DetectionSnapshot, Vec<CandidateAlert>) {
        let mut candidates = Vec::new();

        let snapshot = match &event.identity {
            Identity::Known(name) => {
                self.observe_known(name.clone(), event.confidence, false, now, &mut candidates)
            }
            Identity::Stranger => self.observe_stranger(event.confidence, &mut candidates),
            Identity::NoFace => {
                let ghost = self
                    .state
                    .last_known_identity
                    .as_ref()
                    .filter(|(_, seen_at)| now - *seen_at <= self.ghost_grace)
                    .map(|(name, _)| name.clone());
                match ghost {
                    Some(name) => {
                        self.observe_known(name, event.confidence, true, now, &mut candidates)
                    }
                    None => self.observe_absence(event),
                }
            }
        };

        // Motion and fall signals are independent of the identity branch.
        if event.motion && self.cooldowns.can_trigger_at(AlertCategory::Motion, now) {
            let subject = snapshot.subject().unwrap_or("unknown");
            candidates.push(CandidateAlert::new(
                AlertCategory::Motion,
                format!("Movement detected by {subject}"),
            ));
        }

        if event.fall_posture && self.cooldowns.can_trigger_at(AlertCategory::Emergency, now) {
            let subject = snapshot.subject().unwrap_or("Someone");
            candidates.push(CandidateAlert::new(
                AlertCategory::Emergency,
                format!("{subject} may have fallen"),
            ));
        }

        if event.no_movement && self.cooldowns.can_trigger_at(AlertCategory::Warning, now) {
            let subject = snapshot.subject().unwrap_or("fallen person");
            candidates.push(CandidateAlert::new(
                AlertCategory::Warning,
                format!("No movement detected for {subject}"),
            ));
        }

        debug_assert!(
            !snapshot.is_known || snapshot.kind == DetectionKind::Face,
            "is_known requires kind == Face"
        );

        (snapshot, candidates)
    }

    /// A known identity is in frame, either sighted live or carried by the
    /// ghost grace period. Resets both hysteresis counters and re-arms
    /// stranger detection.
    fn observe_known(
        &mut self,
        name: String,
        confidence: Option<f32>,
        ghost: bool,
        now: DateTime<Utc>,
        candidates: &mut Vec<CandidateAlert>,
    ) -> DetectionSnapshot {
        let state = &mut self.state;
        state.consecutive_unknown_frames = 0;
        state.consecutive_no_face_frames = 0;
        if !state.known_user_present {
            tracing::info!(name = %name, ghost, "known user detected");
        }
        state.known_user_present = true;
        state.stranger_alert_armed = false;
        if ghost {
            // Keep the original sighting timestamp so the grace period
            // measures from the last live sighting, not the last ghost frame.
            state.ghost_active = true;
        } else {
            state.last_known_identity = Some((name.clone(), now));
            state.ghost_active = false;
        }

        match self.reminders.reminders_for(&name) {
            Ok(items) if !items.is_empty() => {
                if self.cooldowns.can_trigger_at(AlertCategory::Reminder, now) {
                    candidates.push(CandidateAlert::new(
                        AlertCategory::Reminder,
                        format!("{}, don't forget your {}", capitalize(&name), items.join(", ")),
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => {
                // Lookup failure means no reminder this tick, never a dead loop.
                tracing::warn!(name = %name, error = %e, "reminder lookup failed");
            }
        }

        DetectionSnapshot {
            kind: DetectionKind::Face,
            name: Some(name),
            is_known: true,
            confidence,
        }
    }

    /// An unenrolled face is in frame. The counter is never reset by
    /// crossing the threshold; a stranger who steps briefly out of frame
    /// and back must not re-arm the alert.
    fn observe_stranger(
        &mut self,
        confidence: Option<f32>,
        candidates: &mut Vec<CandidateAlert>,
    ) -> DetectionSnapshot {
        let state = &mut self.state;
        state.consecutive_unknown_frames += 1;
        state.consecutive_no_face_frames = 0;
        state.known_user_present = false;
        state.last_known_identity = None;
        state.ghost_active = false;

        if state.consecutive_unknown_frames >= self.unknown_threshold {
            if state.stranger_alert_armed {
                if state.consecutive_unknown_frames == self.unknown_threshold {
                    tracing::debug!("stranger alert suppressed; armed from previous sighting");
                }
            } else {
                tracing::info!(
                    frames = state.consecutive_unknown_frames,
                    "stranger persistence threshold reached"
                );
                candidates.push(CandidateAlert::new(
                    AlertCategory::Security,
                    "Stranger detected near entrance",
                ));
                state.stranger_alert_armed = true;
            }
        }

        DetectionSnapshot {
            kind: DetectionKind::Face,
            name: Some("Unknown".to_string()),
            is_known: false,
            confidence,
        }
    }

    /// No face in frame and no ghost to carry. A sustained absence is the
    /// only path that re-arms stranger detection besides a known sighting.
    fn observe_absence(&mut self, event: &FrameEvent) -> DetectionSnapshot {
        let state = &mut self.state;
        state.consecutive_no_face_frames += 1;
        state.known_user_present = false;
        state.last_known_identity = None;
        state.ghost_active = false;

        if state.consecutive_no_face_frames >= self.no_face_reset_threshold {
            if state.stranger_alert_armed {
                tracing::info!("face lost long enough; re-arming stranger detection");
            }
            state.consecutive_unknown_frames = 0;
            state.stranger_alert_armed = false;
            state.consecutive_no_face_frames = 0;
        }

        let kind = if event.fall_posture {
            DetectionKind::Fall
        } else if event.motion {
            DetectionKind::Motion
        } else {
            DetectionKind::None
        };

        DetectionSnapshot {
            kind,
            name: None,
            is_known: false,
            confidence: None,
        }
    }
}

/// Uppercase the first character, for reminder greetings.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::SensorError;

    struct FixedReminders(Vec<String>);

    impl ReminderLookup for FixedReminders {
        fn reminders_for(&self, _name: &str) -> Result<Vec<String>, SensorError> {
            Ok(self.0.clone())
        }
    }

    struct FailingReminders;

    impl ReminderLookup for FailingReminders {
        fn reminders_for(&self, _name: &str) -> Result<Vec<String>, SensorError> {
            Err(SensorError::Lookup("user store unavailable".to_string()))
        }
    }

    fn tracker() -> DetectionTracker {
        DetectionTracker::new(&Config::default(), Box::new(FixedReminders(Vec::new())))
    }

    fn tracker_with_reminders(items: &[&str]) -> DetectionTracker {
        DetectionTracker::new(
            &Config::default(),
            Box::new(FixedReminders(items.iter().map(|s| s.to_string()).collect())),
        )
    }

    fn known(name: &str) -> FrameEvent {
        FrameEvent::identity_only(Identity::Known(name.to_string()), Some(0.9))
    }

    fn stranger() -> FrameEvent {
        FrameEvent::identity_only(Identity::Stranger, Some(0.4))
    }

    fn no_face() -> FrameEvent {
        FrameEvent::identity_only(Identity::NoFace, None)
    }

    fn security_alerts(candidates: &[CandidateAlert]) -> usize {
        candidates
            .iter()
            .filter(|c| c.category == AlertCategory::Security)
            .count()
    }

    #[test]
    fn test_known_snapshot() {
        let mut t = tracker();
        let (snapshot, _) = t.ingest_at(&known("alice"), Utc::now());
        assert_eq!(snapshot.kind, DetectionKind::Face);
        assert_eq!(snapshot.name.as_deref(), Some("alice"));
        assert!(snapshot.is_known);
        assert_eq!(snapshot.confidence, Some(0.9));
        assert!(t.known_user_present());
    }

    #[test]
    fn test_is_known_only_with_face_kind() {
        let mut t = tracker();
        let now = Utc::now();
        let events = [known("alice"), stranger(), no_face(), stranger(), known("bob")];
        for (i, event) in events.iter().enumerate() {
            let (snapshot, _) = t.ingest_at(event, now + Duration::seconds(i as i64 * 20));
            if snapshot.is_known {
                assert_eq!(snapshot.kind, DetectionKind::Face);
            }
        }
    }

    #[test]
    fn test_stranger_threshold_fires_on_fifteenth() {
        let mut t = tracker();
        let now = Utc::now();

        for i in 0..14 {
            let (snapshot, candidates) = t.ingest_at(&stranger(), now + Duration::seconds(i));
            assert_eq!(security_alerts(&candidates), 0, "frame {i} must not alert");
            assert_eq!(snapshot.name.as_deref(), Some("Unknown"));
            assert!(!snapshot.is_known);
        }

        let (_, candidates) = t.ingest_at(&stranger(), now + Duration::seconds(14));
        assert_eq!(security_alerts(&candidates), 1);
        assert_eq!(candidates[0].message, "Stranger detected near entrance");
    }

    #[test]
    fn test_stranger_alert_does_not_refire() {
        let mut t = tracker();
        let now = Utc::now();

        let mut total = 0;
        for i in 0..115 {
            let (_, candidates) = t.ingest_at(&stranger(), now + Duration::seconds(i));
            total += security_alerts(&candidates);
        }
        assert_eq!(total, 1);
    }

    #[test]
    fn test_brief_gap_does_not_rearm() {
        let mut t = tracker();
        let now = Utc::now();

        for i in 0..20 {
            t.ingest_at(&stranger(), now + Duration::seconds(i));
        }
        // Stranger steps out of frame briefly: fewer than 60 no-face frames
        for i in 20..50 {
            t.ingest_at(&no_face(), now + Duration::seconds(i));
        }
        // Back in frame: still armed, no second alert
        let mut total = 0;
        for i in 50..80 {
            let (_, candidates) = t.ingest_at(&stranger(), now + Duration::seconds(i));
            total += security_alerts(&candidates);
        }
        assert_eq!(total, 0);
    }

    #[test]
    fn test_sustained_absence_rearms() {
        let mut t = tracker();
        let now = Utc::now();

        for i in 0..20 {
            t.ingest_at(&stranger(), now + Duration::seconds(i));
        }
        for i in 20..80 {
            t.ingest_at(&no_face(), now + Duration::seconds(i));
        }
        // 60 no-face frames elapsed; the stranger returning must re-alert
        // after a fresh run of 15 frames
        let mut fired_at = None;
        for i in 0..20 {
            let (_, candidates) = t.ingest_at(&stranger(), now + Duration::seconds(80 + i));
            if security_alerts(&candidates) > 0 {
                fired_at = Some(i + 1);
                break;
            }
        }
        assert_eq!(fired_at, Some(15));
    }

    #[test]
    fn test_known_sighting_rearms() {
        let mut t = tracker();
        let now = Utc::now();

        for i in 0..20 {
            t.ingest_at(&stranger(), now + Duration::seconds(i));
        }
        t.ingest_at(&known("alice"), now + Duration::seconds(20));

        // Known sighting reset the counter and the armed flag
        let mut fired_at = None;
        for i in 0..20 {
            let (_, candidates) = t.ingest_at(&stranger(), now + Duration::seconds(21 + i));
            if security_alerts(&candidates) > 0 {
                fired_at = Some(i + 1);
                break;
            }
        }
        assert_eq!(fired_at, Some(15));
    }

    #[test]
    fn test_ghost_persists_through_grace_period() {
        let mut t = tracker();
        let now = Utc::now();

        t.ingest_at(&known("alice"), now);

        // Dropouts inside the 12s grace period keep the known-user state
        for secs in [2, 6, 12] {
            let (snapshot, _) = t.ingest_at(&no_face(), now + Duration::seconds(secs));
            assert_eq!(snapshot.kind, DetectionKind::Face, "at {secs}s");
            assert_eq!(snapshot.name.as_deref(), Some("alice"));
            assert!(snapshot.is_known);
            assert!(t.ghost_active());
        }

        // One second past the grace period the snapshot degrades
        let (snapshot, _) = t.ingest_at(&no_face(), now + Duration::seconds(13));
        assert_eq!(snapshot, DetectionSnapshot::neutral());
        assert!(!t.known_user_present());
        assert!(!t.ghost_active());
    }

    #[test]
    fn test_ghost_does_not_refresh_timestamp() {
        let mut t = tracker();
        let now = Utc::now();

        t.ingest_at(&known("alice"), now);
        // Ghost frames at 6s and 11s must not extend the grace period:
        // it measures from the live sighting at t0
        t.ingest_at(&no_face(), now + Duration::seconds(6));
        t.ingest_at(&no_face(), now + Duration::seconds(11));
        let (snapshot, _) = t.ingest_at(&no_face(), now + Duration::seconds(13));
        assert_eq!(snapshot, DetectionSnapshot::neutral());
    }

    #[test]
    fn test_live_sighting_refreshes_ghost_window() {
        let mut t = tracker();
        let now = Utc::now();

        t.ingest_at(&known("alice"), now);
        t.ingest_at(&known("alice"), now + Duration::seconds(10));
        // 13s after the first sighting but only 3s after the second
        let (snapshot, _) = t.ingest_at(&no_face(), now + Duration::seconds(13));
        assert!(snapshot.is_known);
        assert_eq!(snapshot.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_stranger_clears_ghost() {
        let mut t = tracker();
        let now = Utc::now();

        t.ingest_at(&known("alice"), now);
        t.ingest_at(&stranger(), now + Duration::seconds(1));
        // The stranger sighting dropped the last known identity, so a
        // dropout right after does not resurrect alice
        let (snapshot, _) = t.ingest_at(&no_face(), now + Duration::seconds(2));
        assert!(!snapshot.is_known);
        assert_eq!(snapshot.kind, DetectionKind::None);
    }

    #[test]
    fn test_reminder_emitted_with_cooldown() {
        let mut t = tracker_with_reminders(&["keys", "wallet"]);
        let now = Utc::now();

        let (_, candidates) = t.ingest_at(&known("alice"), now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].category, AlertCategory::Reminder);
        assert_eq!(candidates[0].message, "Alice, don't forget your keys, wallet");

        // Within the 30s reminder cooldown: nothing
        let (_, candidates) = t.ingest_at(&known("alice"), now + Duration::seconds(10));
        assert!(candidates.is_empty());

        // Past the cooldown it fires again
        let (_, candidates) = t.ingest_at(&known("alice"), now + Duration::seconds(30));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_no_reminder_for_empty_list() {
        let mut t = tracker();
        let (_, candidates) = t.ingest_at(&known("alice"), Utc::now());
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_reminder_lookup_failure_degrades() {
        let mut t = DetectionTracker::new(&Config::default(), Box::new(FailingReminders));
        let (snapshot, candidates) = t.ingest_at(&known("alice"), Utc::now());
        assert!(snapshot.is_known);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_motion_candidate_with_subject() {
        let mut t = tracker();
        let now = Utc::now();

        let mut event = known("alice");
        event.motion = true;
        let (_, candidates) = t.ingest_at(&event, now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].category, AlertCategory::Motion);
        assert_eq!(candidates[0].message, "Movement detected by alice");

        // Within the 5s motion cooldown: suppressed at the tracker already
        let (_, candidates) = t.ingest_at(&event, now + Duration::seconds(2));
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_motion_without_identity() {
        let mut t = tracker();
        let mut event = no_face();
        event.motion = true;
        let (snapshot, candidates) = t.ingest_at(&event, Utc::now());
        assert_eq!(snapshot.kind, DetectionKind::Motion);
        assert_eq!(candidates[0].message, "Movement detected by unknown");
    }

    #[test]
    fn test_fall_candidates() {
        let mut t = tracker();
        let now = Utc::now();

        let mut event = known("alice");
        event.fall_posture = true;
        let (_, candidates) = t.ingest_at(&event, now);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].category, AlertCategory::Emergency);
        assert_eq!(candidates[0].message, "alice may have fallen");

        // Stillness past the timeout adds the warning on a later tick
        event.no_movement = true;
        let (_, candidates) = t.ingest_at(&event, now + Duration::seconds(3));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].category, AlertCategory::Warning);
        assert_eq!(candidates[0].message, "No movement detected for alice");
    }

    #[test]
    fn test_fall_snapshot_kind_without_face() {
        let mut t = tracker();
        let mut event = no_face();
        event.fall_posture = true;
        let (snapshot, candidates) = t.ingest_at(&event, Utc::now());
        assert_eq!(snapshot.kind, DetectionKind::Fall);
        assert!(!snapshot.is_known);
        assert_eq!(candidates[0].message, "Someone may have fallen");
    }

    #[test]
    fn test_snapshot_wire_format() {
        let mut t = tracker();
        let (snapshot, _) = t.ingest_at(&known("alice"), Utc::now());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["kind"], "face");
        assert_eq!(json["name"], "alice");
        assert_eq!(json["isKnown"], true);

        let neutral = serde_json::to_value(DetectionSnapshot::neutral()).unwrap();
        assert_eq!(neutral["kind"], "none");
        assert_eq!(neutral["isKnown"], false);
    }
}
