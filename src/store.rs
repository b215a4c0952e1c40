//! Shared state store: the one authority readers query.
//!
//! The sensing loop is the sole writer; API handlers are concurrent
//! readers. Every accessor copies values out under a short critical
//! section, so a reader never holds a live reference into state the
//! loop is about to mutate.

use crate::config::Config;
use crate::core::{Alert, AlertArbiter, CandidateAlert, DetectionSnapshot, Submission};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

/// Holds the live detection snapshot and the alert history behind a
/// concurrency-safe facade.
pub struct StateStore {
    snapshot: RwLock<DetectionSnapshot>,
    alerts: Mutex<AlertArbiter>,
}

/// Thread-safe shared handle to the state store.
pub type SharedStateStore = Arc<StateStore>;

impl StateStore {
    pub fn new(config: &Config) -> Self {
        Self {
            snapshot: RwLock::new(DetectionSnapshot::neutral()),
            alerts: Mutex::new(AlertArbiter::new(
                &config.cooldowns,
                config.history_limit,
                config.duplicate_suppress_secs,
            )),
        }
    }

    /// Create a shared handle directly.
    pub fn shared(config: &Config) -> SharedStateStore {
        Arc::new(Self::new(config))
    }

    /// Publish a new snapshot (sensing loop only).
    pub fn publish(&self, snapshot: DetectionSnapshot) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// The current detection snapshot, copied out.
    pub fn snapshot(&self) -> DetectionSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Submit a candidate alert through the arbiter (sensing loop only).
    pub fn submit(&self, candidate: CandidateAlert) -> Submission {
        self.arbiter().submit(candidate)
    }

    /// Submit at an explicit instant; test entry point.
    pub fn submit_at(&self, candidate: CandidateAlert, now: DateTime<Utc>) -> Submission {
        self.arbiter().submit_at(candidate, now)
    }

    /// All stored alerts, newest first, copied out.
    pub fn alerts(&self) -> Vec<Alert> {
        self.arbiter().list()
    }

    /// Number of stored alerts.
    pub fn alert_count(&self) -> usize {
        self.arbiter().len()
    }

    /// Flip an alert's read flag; false when the id is unknown.
    pub fn mark_read(&self, id: Uuid) -> bool {
        self.arbiter().mark_read(id)
    }

    /// Discard the entire alert history.
    pub fn clear_alerts(&self) {
        self.arbiter().clear();
    }

    /// Keep only alerts matching the predicate.
    pub fn retain_alerts<F>(&self, predicate: F)
    where
        F: Fn(&Alert) -> bool,
    {
        self.arbiter().retain(predicate);
    }

    fn arbiter(&self) -> std::sync::MutexGuard<'_, AlertArbiter> {
        // Recover rather than propagate poisoning: a panicked reader must
        // not take the sensing loop down with it.
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertCategory, DetectionKind};

    fn store() -> SharedStateStore {
        StateStore::shared(&Config::default())
    }

    #[test]
    fn test_snapshot_copy_out() {
        let store = store();
        assert_eq!(store.snapshot(), DetectionSnapshot::neutral());

        let published = DetectionSnapshot {
            kind: DetectionKind::Face,
            name: Some("alice".to_string()),
            is_known: true,
            confidence: Some(0.93),
        };
        store.publish(published.clone());

        // The reader got a copy; publishing again does not change it
        let read = store.snapshot();
        store.publish(DetectionSnapshot::neutral());
        assert_eq!(read, published);
    }

    #[test]
    fn test_alert_lifecycle_through_store() {
        let store = store();
        let sub = store.submit(CandidateAlert::new(
            AlertCategory::Security,
            "Stranger detected near entrance",
        ));
        assert!(sub.is_accepted());
        let id = sub.alert().unwrap().id;

        assert_eq!(store.alert_count(), 1);
        assert!(store.mark_read(id));
        assert!(store.alerts()[0].read);

        store.clear_alerts();
        assert_eq!(store.alert_count(), 0);
    }

    #[test]
    fn test_concurrent_readers_do_not_block_writer() {
        let store = store();
        let mut handles = Vec::new();

        for _ in 0..4 {
            let reader = store.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..500 {
                    let _ = reader.snapshot();
                    let _ = reader.alerts();
                }
            }));
        }

        let writer = store.clone();
        let write_handle = std::thread::spawn(move || {
            for i in 0..500u32 {
                writer.publish(DetectionSnapshot {
                    kind: DetectionKind::Face,
                    name: Some(format!("person-{i}")),
                    is_known: true,
                    confidence: Some(0.5),
                });
            }
        });

        for handle in handles {
            handle.join().unwrap();
        }
        write_handle.join().unwrap();

        // Last write won and is fully consistent
        let snapshot = store.snapshot();
        assert_eq!(snapshot.name.as_deref(), Some("person-499"));
        assert!(snapshot.is_known);
        assert_eq!(snapshot.kind, DetectionKind::Face);
    }

    #[test]
    fn test_retain_alerts() {
        let store = store();
        let t0 = Utc::now();
        store.submit_at(
            CandidateAlert::new(AlertCategory::Security, "Stranger detected near entrance"),
            t0,
        );
        store.submit_at(
            CandidateAlert::new(AlertCategory::Motion, "Movement detected by alice"),
            t0 + chrono::Duration::seconds(1),
        );

        store.retain_alerts(|a| !a.message.contains("Stranger"));
        let alerts = store.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, AlertCategory::Motion);
    }
}
