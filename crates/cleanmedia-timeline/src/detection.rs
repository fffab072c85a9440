//! Raw detector output.
//!
//! Detectors speak in loose, detector-specific terms (`profanity_mute`,
//! `skip_scene`, `frame`). Nothing here is validated; the builder owns the
//! conversion into [`Segment`](crate::Segment)s.

use crate::segment::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An unvalidated finding produced by a subtitle or frame detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Detector-specific category tag.
    pub category: String,
    /// Detector-specific action suggestion; may be empty.
    #[serde(default)]
    pub raw_action: String,
    /// Detector confidence.
    pub confidence: f64,
    /// Which detector produced this.
    pub source_tag: String,
    /// Extra detector data carried through to the segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Detection {
    /// Create a detection without payload.
    pub fn new(
        start: f64,
        end: f64,
        category: impl Into<String>,
        raw_action: impl Into<String>,
        confidence: f64,
        source_tag: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            category: category.into(),
            raw_action: raw_action.into(),
            confidence,
            source_tag: source_tag.into(),
            payload: None,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}..{} action={:?} confidence={} source={}",
            self.category, self.start, self.end, self.raw_action, self.confidence, self.source_tag
        )
    }
}
