//! No-op sensing implementations.
//!
//! These exist so the agent (and binary) can run on a machine with no
//! camera wired up: the loop starts, idles, and serves an empty dashboard.
//! A real deployment swaps in camera-backed implementations of the same
//! traits.

use crate::sensing::types::{Classification, Frame, SensorError};
use crate::sensing::{FallClassifier, FrameSource, IdentityClassifier, MotionClassifier, ReminderLookup};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Duration;

/// A frame source backed by a channel that is never fed.
///
/// Holding the sender keeps the channel open, so `next_frame` reports
/// "no frame yet" rather than a disconnect. A capture thread feeding a
/// real camera would hold a clone of the sender instead.
pub struct NoopFrameSource {
    _sender: Sender<Frame>,
    receiver: Receiver<Frame>,
}

impl NoopFrameSource {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(8);
        Self {
            _sender: sender,
            receiver,
        }
    }
}

impl Default for NoopFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for NoopFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SensorError> {
        match self.receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => Ok(Some(frame)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(SensorError::Frame(
                "frame feed disconnected".to_string(),
            )),
        }
    }
}

/// A classifier that never sees anything.
pub struct NoopClassifier;

impl IdentityClassifier for NoopClassifier {
    fn classify(&mut self, _frame: &Frame) -> Result<Classification, SensorError> {
        Ok(Classification::no_face())
    }
}

impl MotionClassifier for NoopClassifier {
    fn detect_motion(&mut self, _frame: &Frame) -> Result<bool, SensorError> {
        Ok(false)
    }
}

impl FallClassifier for NoopClassifier {
    fn detect_fall(&mut self, _frame: &Frame) -> Result<bool, SensorError> {
        Ok(false)
    }

    fn time_since_movement(&self) -> Option<Duration> {
        None
    }
}

/// A reminder lookup with no users behind it.
pub struct NoopReminders;

impl ReminderLookup for NoopReminders {
    fn reminders_for(&self, _name: &str) -> Result<Vec<String>, SensorError> {
        Ok(Vec::new())
    }
}
