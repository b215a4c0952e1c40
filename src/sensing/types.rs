//! Boundary types shared between the sensing collaborators and the core.
//!
//! A `FrameEvent` is the normalized, per-tick summary of what the
//! classifiers saw; it is ephemeral and owned by the sensing loop.

use serde::{Deserialize, Serialize};

/// An opaque video frame handed to the classifiers.
///
/// The core never inspects pixel data; frames exist only to be passed
/// through to the classification collaborators.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// A zero-sized placeholder frame, used by scripted sensors.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
        }
    }
}

/// Identity label produced by the face classifier for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// An enrolled person was recognized
    Known(String),
    /// A face was found but matched no enrolled person
    Stranger,
    /// No face in frame
    NoFace,
}

/// Identity classification result with its confidence.
#[derive(Debug, Clone)]
pub struct Classification {
    pub identity: Identity,
    /// Match confidence in [0, 1]; absent when no face was found
    pub confidence: Option<f32>,
}

impl Classification {
    pub fn known(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            identity: Identity::Known(name.into()),
            confidence: Some(confidence),
        }
    }

    pub fn stranger(confidence: f32) -> Self {
        Self {
            identity: Identity::Stranger,
            confidence: Some(confidence),
        }
    }

    pub fn no_face() -> Self {
        Self {
            identity: Identity::NoFace,
            confidence: None,
        }
    }
}

/// Per-tick classifier outputs consumed by the detection tracker.
#[derive(Debug, Clone)]
pub struct FrameEvent {
    /// Identity label for this tick
    pub identity: Identity,
    /// Confidence of the identity match, if any
    pub confidence: Option<f32>,
    /// Whether motion was detected in this frame
    pub motion: bool,
    /// Whether a fall/faint posture is currently flagged
    pub fall_posture: bool,
    /// Whether a flagged fall has seen no movement past the stillness timeout
    pub no_movement: bool,
}

impl FrameEvent {
    /// Event carrying only an identity label, with all boolean signals clear.
    pub fn identity_only(identity: Identity, confidence: Option<f32>) -> Self {
        Self {
            identity,
            confidence,
            motion: false,
            fall_posture: false,
            no_movement: false,
        }
    }
}

/// Errors raised by sensing collaborators.
///
/// The loop treats every variant as transient: log, back off, continue.
#[derive(Debug)]
pub enum SensorError {
    /// Frame acquisition failed
    Frame(String),
    /// A classifier call failed
    Classifier(String),
    /// A user/reminder lookup failed
    Lookup(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Frame(e) => write!(f, "frame source error: {e}"),
            SensorError::Classifier(e) => write!(f, "classifier error: {e}"),
            SensorError::Lookup(e) => write!(f, "lookup error: {e}"),
        }
    }
}

impl std::error::Error for SensorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_constructors() {
        let known = Classification::known("alice", 0.92);
        assert_eq!(known.identity, Identity::Known("alice".to_string()));
        assert_eq!(known.confidence, Some(0.92));

        let no_face = Classification::no_face();
        assert_eq!(no_face.identity, Identity::NoFace);
        assert!(no_face.confidence.is_none());
    }

    #[test]
    fn test_identity_only_event() {
        let event = FrameEvent::identity_only(Identity::Stranger, Some(0.4));
        assert!(!event.motion);
        assert!(!event.fall_posture);
        assert!(!event.no_movement);
    }
}
