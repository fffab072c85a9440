//! Playback control.
//!
//! The controller turns the active segments at the current playback time
//! into player commands. Queries run against an immutable
//! [`TimelineIndex`]; a rebuilt timeline is swapped in through
//! [`SharedIndex`] without touching the index a tick may be reading.

mod clock;
mod controller;
mod session;

pub use clock::{PlaybackClock, SimulatedClock};
pub use controller::PlaybackController;
pub use session::{session_duration, PlaybackSession, SessionSummary, SimulatedPlayer};

use cleanmedia_timeline::{Payload, Timeline, TimelineIndex};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Side effect requested from the player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Mute { channel: u32 },
    Unmute { channel: u32 },
    Seek { to: f64 },
    Substitute { payload: Payload, until: f64 },
    /// Playback must stop; filtering can no longer be guaranteed.
    Halt { reason: String },
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerCommand::Mute { channel } => write!(f, "MUTE channel {}", channel),
            PlayerCommand::Unmute { channel } => write!(f, "UNMUTE channel {}", channel),
            PlayerCommand::Seek { to } => write!(f, "SEEK to {:.3}s", to),
            PlayerCommand::Substitute { payload, until } => write!(
                f,
                "SUBSTITUTE \"{}\" until {:.3}s",
                payload.replacement.as_deref().unwrap_or_default(),
                until
            ),
            PlayerCommand::Halt { reason } => write!(f, "HALT ({})", reason),
        }
    }
}

/// A command stamped with the playback time it was issued at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedCommand {
    pub at: f64,
    pub command: PlayerCommand,
}

/// Errors that end a playback session.
#[derive(Debug, Error, PartialEq)]
pub enum PlaybackError {
    #[error("Invalid playback clock reading: {0}")]
    InvalidClock(f64),

    #[error("Player command channel closed")]
    ChannelClosed,
}

/// Atomically swappable handle to the current timeline index.
#[derive(Debug, Clone)]
pub struct SharedIndex {
    inner: Arc<RwLock<Arc<TimelineIndex>>>,
}

impl SharedIndex {
    pub fn new(index: TimelineIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    pub fn from_timeline(timeline: Timeline) -> Self {
        Self::new(TimelineIndex::new(Arc::new(timeline)))
    }

    /// Snapshot of the current index. Holding it does not block swaps.
    pub fn load(&self) -> Arc<TimelineIndex> {
        Arc::clone(&self.inner.read())
    }

    /// Publish a new index, returning the previous one.
    pub fn swap(&self, index: TimelineIndex) -> Arc<TimelineIndex> {
        let old = std::mem::replace(&mut *self.inner.write(), Arc::new(index));
        tracing::debug!(segments = old.len(), "Swapped timeline index");
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleanmedia_timeline::{Detection, Policy, TimelineBuilder};

    fn timeline(detections: Vec<Detection>) -> Timeline {
        TimelineBuilder::new(Policy::default())
            .build(detections)
            .unwrap()
            .timeline
    }

    #[test]
    fn test_swap_keeps_old_snapshot_valid() {
        let shared = SharedIndex::from_timeline(timeline(vec![Detection::new(
            1.0, 2.0, "profanity", "mute", 1.0, "subtitle",
        )]));
        let before = shared.load();

        let old = shared.swap(TimelineIndex::new(Arc::new(Timeline::empty(None))));

        assert_eq!(before.len(), 1);
        assert_eq!(old.len(), 1);
        assert!(shared.load().is_empty());
    }

    #[test]
    fn test_command_display() {
        assert_eq!(PlayerCommand::Seek { to: 15.0 }.to_string(), "SEEK to 15.000s");
        assert_eq!(
            PlayerCommand::Substitute {
                payload: Payload::replacement("[censored]"),
                until: 11.0
            }
            .to_string(),
            "SUBSTITUTE \"[censored]\" until 11.000s"
        );
    }
}
