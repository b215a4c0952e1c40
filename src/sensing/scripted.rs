//! Scripted sensing implementations for tests and demos.
//!
//! A script is a fixed sequence of per-frame classifier answers. The
//! frame source advances the script one step per frame; the classifier
//! impls answer from the step the frame source is currently on, which is
//! how the real collaborators behave (one frame, one set of answers).

use crate::sensing::types::{Classification, Frame, SensorError};
use crate::sensing::{
    FallClassifier, FrameSource, IdentityClassifier, MotionClassifier, ReminderLookup, Sensors,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// The classifier answers for one scripted frame.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub classification: Classification,
    pub motion: bool,
    pub fall_posture: bool,
    pub still_for: Option<Duration>,
}

impl ScriptStep {
    pub fn known(name: impl Into<String>, confidence: f32) -> Self {
        Self::from_classification(Classification::known(name, confidence))
    }

    pub fn stranger(confidence: f32) -> Self {
        Self::from_classification(Classification::stranger(confidence))
    }

    pub fn no_face() -> Self {
        Self::from_classification(Classification::no_face())
    }

    fn from_classification(classification: Classification) -> Self {
        Self {
            classification,
            motion: false,
            fall_posture: false,
            still_for: None,
        }
    }

    pub fn with_motion(mut self) -> Self {
        self.motion = true;
        self
    }

    pub fn with_fall(mut self) -> Self {
        self.fall_posture = true;
        self
    }

    pub fn with_stillness(mut self, still_for: Duration) -> Self {
        self.fall_posture = true;
        self.still_for = Some(still_for);
        self
    }
}

struct ScriptState {
    steps: VecDeque<ScriptStep>,
    current: Option<ScriptStep>,
}

/// Cloneable handle over a shared script; each clone serves one trait seam.
#[derive(Clone)]
pub struct ScriptedSensors {
    inner: Arc<Mutex<ScriptState>>,
}

impl ScriptedSensors {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScriptState {
                steps: steps.into(),
                current: None,
            })),
        }
    }

    /// Number of script steps not yet served as frames.
    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }

    /// Wire this script into a full collaborator set.
    pub fn into_sensors(self, reminders: Box<dyn ReminderLookup>) -> Sensors {
        Sensors {
            frames: Box::new(self.clone()),
            identity: Box::new(self.clone()),
            motion: Box::new(self.clone()),
            fall: Box::new(self),
            reminders,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameSource for ScriptedSensors {
    fn next_frame(&mut self) -> Result<Option<Frame>, SensorError> {
        let mut state = self.lock();
        match state.steps.pop_front() {
            Some(step) => {
                state.current = Some(step);
                Ok(Some(Frame::empty()))
            }
            None => {
                state.current = None;
                Ok(None)
            }
        }
    }
}

impl IdentityClassifier for ScriptedSensors {
    fn classify(&mut self, _frame: &Frame) -> Result<Classification, SensorError> {
        Ok(self
            .lock()
            .current
            .as_ref()
            .map(|s| s.classification.clone())
            .unwrap_or_else(Classification::no_face))
    }
}

impl MotionClassifier for ScriptedSensors {
    fn detect_motion(&mut self, _frame: &Frame) -> Result<bool, SensorError> {
        Ok(self.lock().current.as_ref().map(|s| s.motion).unwrap_or(false))
    }
}

impl FallClassifier for ScriptedSensors {
    fn detect_fall(&mut self, _frame: &Frame) -> Result<bool, SensorError> {
        Ok(self
            .lock()
            .current
            .as_ref()
            .map(|s| s.fall_posture)
            .unwrap_or(false))
    }

    fn time_since_movement(&self) -> Option<Duration> {
        self.lock().current.as_ref().and_then(|s| s.still_for)
    }
}
