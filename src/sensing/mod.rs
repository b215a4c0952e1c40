//! Sensing collaborators for the Vigil agent.
//!
//! The core never does image processing itself. Frame acquisition and the
//! face/motion/fall classifiers are opaque collaborators behind the traits
//! in this module; the sensing loop calls them once per tick and folds
//! their answers into a [`FrameEvent`].

pub mod noop;
pub mod scripted;
pub mod types;

use std::time::Duration;

// Re-export commonly used types
pub use types::{Classification, Frame, FrameEvent, Identity, SensorError};

/// Source of video frames.
///
/// May transiently return no frame; the loop retries after a short delay.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, SensorError>;
}

/// Face identity classifier.
///
/// Opaque; may cache or reload its reference template set on its own
/// schedule. The loop additionally rate-limits calls to it.
pub trait IdentityClassifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<Classification, SensorError>;
}

/// Frame-differencing motion classifier.
pub trait MotionClassifier: Send {
    fn detect_motion(&mut self, frame: &Frame) -> Result<bool, SensorError>;
}

/// Fall/faint posture classifier.
pub trait FallClassifier: Send {
    fn detect_fall(&mut self, frame: &Frame) -> Result<bool, SensorError>;

    /// Time since the fallen person last moved.
    ///
    /// Returns `Some` only while a fall is currently flagged.
    fn time_since_movement(&self) -> Option<Duration>;
}

/// Lookup of per-person reminder lists from the user store.
pub trait ReminderLookup: Send {
    /// Reminders for the named person; empty when the person is unknown.
    fn reminders_for(&self, name: &str) -> Result<Vec<String>, SensorError>;
}

/// The full set of collaborators the sensing loop is wired to.
pub struct Sensors {
    pub frames: Box<dyn FrameSource>,
    pub identity: Box<dyn IdentityClassifier>,
    pub motion: Box<dyn MotionClassifier>,
    pub fall: Box<dyn FallClassifier>,
    pub reminders: Box<dyn ReminderLookup>,
}

impl Sensors {
    /// A sensor set that compiles and idles anywhere: no frames, no events.
    pub fn noop() -> Self {
        Self {
            frames: Box::new(noop::NoopFrameSource::new()),
            identity: Box::new(noop::NoopClassifier),
            motion: Box::new(noop::NoopClassifier),
            fall: Box::new(noop::NoopClassifier),
            reminders: Box::new(noop::NoopReminders),
        }
    }

    /// The noop set with a real reminder directory behind it.
    pub fn noop_with_reminders(reminders: Box<dyn ReminderLookup>) -> Self {
        Self {
            reminders,
            ..Self::noop()
        }
    }
}
