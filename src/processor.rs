//! The sensing loop: sole writer of tracker state and the shared store.
//!
//! One long-lived background thread runs fetch → classify → ingest →
//! arbitrate → publish. The expensive identity classification runs on a
//! fixed re-check interval with the last result cached; the cheap motion
//! and fall signals run every frame. The loop is never allowed to die on
//! a single bad frame: collaborator errors are logged, the snapshot is
//! cleared to neutral, and the loop continues after a short backoff.

use crate::config::Config;
use crate::core::{DetectionSnapshot, DetectionTracker};
use crate::sensing::{Classification, FrameEvent, Identity, Sensors};
use crate::store::SharedStateStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Counters for the sensing loop, readable from the API while the loop runs.
#[derive(Debug)]
pub struct ProcessorStats {
    frames_processed: AtomicU64,
    frames_skipped: AtomicU64,
    identity_checks: AtomicU64,
    candidates_emitted: AtomicU64,
    alerts_accepted: AtomicU64,
    sensor_errors: AtomicU64,
    started_at: DateTime<Utc>,
}

impl ProcessorStats {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frames_skipped: AtomicU64::new(0),
            identity_checks: AtomicU64::new(0),
            candidates_emitted: AtomicU64::new(0),
            alerts_accepted: AtomicU64::new(0),
            sensor_errors: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Copy the current counters out.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            identity_checks: self.identity_checks.load(Ordering::Relaxed),
            candidates_emitted: self.candidates_emitted.load(Ordering::Relaxed),
            alerts_accepted: self.alerts_accepted.load(Ordering::Relaxed),
            sensor_errors: self.sensor_errors.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }
}

impl Default for ProcessorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the loop counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub identity_checks: u64,
    pub candidates_emitted: u64,
    pub alerts_accepted: u64,
    pub sensor_errors: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// The sensing loop. Owns the tracker, the collaborator set, and the
/// write side of the shared store.
pub struct Processor {
    sensors: Sensors,
    tracker: DetectionTracker,
    store: SharedStateStore,
    stats: Arc<ProcessorStats>,
    running: Arc<AtomicBool>,
    face_recheck: Duration,
    stillness_timeout: Duration,
    poll_interval: Duration,
    cached_identity: Classification,
    last_identity_check: Option<Instant>,
}

impl Processor {
    pub fn new(
        config: &Config,
        mut sensors: Sensors,
        store: SharedStateStore,
        stats: Arc<ProcessorStats>,
        running: Arc<AtomicBool>,
    ) -> Self {
        // The tracker owns the reminder lookup; swap in a placeholder so
        // the rest of the sensor set stays together.
        let reminders = std::mem::replace(
            &mut sensors.reminders,
            Box::new(crate::sensing::noop::NoopReminders),
        );
        let tracker = DetectionTracker::new(config, reminders);

        Self {
            sensors,
            tracker,
            store,
            stats,
            running,
            face_recheck: Duration::from_secs(config.face_recheck_secs),
            stillness_timeout: Duration::from_secs(config.stillness_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            cached_identity: Classification::no_face(),
            last_identity_check: None,
        }
    }

    /// Run until the running flag clears. Discards any alert history left
    /// over from a previous run before the first frame.
    pub fn run(mut self) {
        self.store.clear_alerts();
        tracing::info!("sensing loop started");

        while self.running.load(Ordering::SeqCst) {
            self.step();
        }

        tracing::info!(stats = ?self.stats.snapshot(), "sensing loop stopped");
    }

    /// One loop iteration: at most one frame, one tracker ingest.
    fn step(&mut self) {
        let frame = match self.sensors.frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                // Transient: no frame available yet
                self.stats.frames_skipped.fetch_add(1, Ordering::Relaxed);
                thread::sleep(Duration::from_millis(200));
                return;
            }
            Err(e) => {
                self.recover(&e.to_string());
                return;
            }
        };

        // Identity classification is expensive; re-check on a fixed
        // interval and reuse the cached result in between.
        let due = self
            .last_identity_check
            .map_or(true, |t| t.elapsed() >= self.face_recheck);
        if due {
            match self.sensors.identity.classify(&frame) {
                Ok(classification) => {
                    self.cached_identity = classification;
                    self.last_identity_check = Some(Instant::now());
                    self.stats.identity_checks.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.recover(&e.to_string());
                    return;
                }
            }
        }

        let motion = match self.sensors.motion.detect_motion(&frame) {
            Ok(motion) => motion,
            Err(e) => {
                self.recover(&e.to_string());
                return;
            }
        };

        let fall_posture = match self.sensors.fall.detect_fall(&frame) {
            Ok(fall) => fall,
            Err(e) => {
                self.recover(&e.to_string());
                return;
            }
        };

        let no_movement = self
            .sensors
            .fall
            .time_since_movement()
            .map_or(false, |still| still > self.stillness_timeout);

        let event = FrameEvent {
            identity: self.cached_identity.identity.clone(),
            confidence: self.cached_identity.confidence,
            motion,
            fall_posture,
            no_movement,
        };
        let stranger_in_frame = matches!(event.identity, Identity::Stranger);

        let (snapshot, candidates) = self.tracker.ingest(&event);
        self.store.publish(snapshot);
        self.stats.frames_processed.fetch_add(1, Ordering::Relaxed);

        for candidate in candidates {
            self.stats.candidates_emitted.fetch_add(1, Ordering::Relaxed);
            let submission = self.store.submit(candidate);
            if let crate::core::Submission::Accepted(alert) = submission {
                self.stats.alerts_accepted.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    category = ?alert.category,
                    message = %alert.message,
                    "alert accepted"
                );
            }
        }

        // Sample faster while a stranger is in frame so the persistence
        // threshold is reached quickly.
        let sleep_for = if stranger_in_frame {
            self.poll_interval / 5
        } else {
            self.poll_interval
        };
        thread::sleep(sleep_for);
    }

    /// Transient-error path: log, clear the snapshot, back off, continue.
    fn recover(&mut self, error: &str) {
        tracing::warn!(error, "sensor error; skipping frame");
        self.stats.sensor_errors.fetch_add(1, Ordering::Relaxed);
        self.store.publish(DetectionSnapshot::neutral());
        thread::sleep(Duration::from_secs(1));
    }

    /// Spawn the loop on its dedicated thread.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("vigil-sensing".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn sensing thread")
    }
}
