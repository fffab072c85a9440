use super::{PlaybackError, PlayerCommand, SharedIndex};
use cleanmedia_timeline::{Action, Category, Segment};

/// Identity of a segment across ticks.
type SegmentKey = (u64, u64, Category);

fn key(segment: &Segment) -> SegmentKey {
    (segment.start.to_bits(), segment.end.to_bits(), segment.category)
}

/// Decides which player commands a tick needs.
///
/// Holds only the mute and substitution state between ticks; the timeline
/// itself is read through a [`SharedIndex`] on every tick.
#[derive(Debug)]
pub struct PlaybackController {
    index: SharedIndex,
    channel: u32,
    muted: bool,
    substituted: Vec<SegmentKey>,
}

impl PlaybackController {
    pub fn new(index: SharedIndex, channel: u32) -> Self {
        Self {
            index,
            channel,
            muted: false,
            substituted: Vec::new(),
        }
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    /// Commands for playback time `now`.
    ///
    /// A skip takes precedence over everything else: the tick only emits the
    /// seek, and the next tick evaluates the position it lands on.
    pub fn tick(&mut self, now: f64) -> Result<Vec<PlayerCommand>, PlaybackError> {
        if !now.is_finite() || now < 0.0 {
            return Err(PlaybackError::InvalidClock(now));
        }

        let index = self.index.load();
        let active = index.active_at(now);
        let mut commands = Vec::new();

        // active_at lists the most severe category first
        if let Some(skip) = active.iter().find(|s| s.action == Action::Skip) {
            tracing::debug!(category = %skip.category, from = now, to = skip.end, "Skipping");
            commands.push(PlayerCommand::Seek { to: skip.end });
            return Ok(commands);
        }

        let should_mute = active.iter().any(|s| s.action == Action::Mute);
        if should_mute != self.muted {
            self.muted = should_mute;
            commands.push(if should_mute {
                PlayerCommand::Mute {
                    channel: self.channel,
                }
            } else {
                PlayerCommand::Unmute {
                    channel: self.channel,
                }
            });
        }

        let replacing: Vec<&Segment> = active
            .iter()
            .copied()
            .filter(|s| s.action == Action::Replace)
            .collect();
        for segment in &replacing {
            if !self.substituted.contains(&key(segment)) {
                self.substituted.push(key(segment));
                commands.push(PlayerCommand::Substitute {
                    payload: segment.payload.clone().unwrap_or_default(),
                    until: segment.end,
                });
            }
        }
        // Forget segments we have left, so re-entering one substitutes again
        self.substituted
            .retain(|k| replacing.iter().any(|s| key(s) == *k));

        Ok(commands)
    }

    /// Commands that restore normal playback when a session ends.
    pub fn finish(&mut self) -> Vec<PlayerCommand> {
        self.substituted.clear();
        if std::mem::take(&mut self.muted) {
            vec![PlayerCommand::Unmute {
                channel: self.channel,
            }]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use cleanmedia_timeline::{Detection, Payload, Policy, TimelineBuilder, TimelineIndex};
    use std::sync::Arc;

    fn shared(detections: Vec<Detection>) -> SharedIndex {
        SharedIndex::from_timeline(
            TimelineBuilder::new(Policy::default())
                .build(detections)
                .unwrap()
                .timeline,
        )
    }

    #[test]
    fn test_mute_then_unmute() {
        let mut controller = PlaybackController::new(
            shared(vec![Detection::new(10.0, 12.0, "profanity", "mute", 1.0, "subtitle")]),
            0,
        );
        assert!(controller.tick(9.9).unwrap().is_empty());
        assert_eq!(
            controller.tick(10.0).unwrap(),
            vec![PlayerCommand::Mute { channel: 0 }]
        );
        assert!(controller.tick(11.0).unwrap().is_empty());
        assert_eq!(
            controller.tick(12.0).unwrap(),
            vec![PlayerCommand::Unmute { channel: 0 }]
        );
    }

    #[test]
    fn test_skip_seeks_to_end() {
        let mut controller = PlaybackController::new(
            shared(vec![
                Detection::new(10.0, 12.0, "profanity", "mute", 1.0, "subtitle"),
                Detection::new(11.0, 15.0, "violence", "skip", 0.9, "video"),
            ]),
            0,
        );
        assert_eq!(
            controller.tick(10.5).unwrap(),
            vec![PlayerCommand::Mute { channel: 0 }]
        );
        assert_eq!(
            controller.tick(11.0).unwrap(),
            vec![PlayerCommand::Seek { to: 15.0 }]
        );
        assert_eq!(
            controller.tick(15.0).unwrap(),
            vec![PlayerCommand::Unmute { channel: 0 }]
        );
    }

    #[test]
    fn test_substitute_once_per_segment() {
        let mut controller = PlaybackController::new(
            shared(vec![Detection::new(5.0, 6.0, "profanity", "replace", 1.0, "subtitle")
                .with_payload(Payload::replacement("[censored]"))]),
            0,
        );
        let first = controller.tick(5.0).unwrap();
        assert_eq!(
            first,
            vec![PlayerCommand::Substitute {
                payload: Payload::replacement("[censored]"),
                until: 6.0
            }]
        );
        assert!(controller.tick(5.5).unwrap().is_empty());
        assert!(controller.tick(6.0).unwrap().is_empty());
        // Seeking back re-enters the segment
        assert_eq!(controller.tick(5.2).unwrap().len(), 1);
    }

    #[test]
    fn test_none_action_emits_nothing() {
        let mut controller = PlaybackController::new(
            shared(vec![Detection::new(1.0, 2.0, "violence", "flag", 1.0, "video")]),
            0,
        );
        assert!(controller.tick(1.5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_clock() {
        let mut controller = PlaybackController::new(shared(vec![]), 0);
        assert_matches!(controller.tick(f64::NAN), Err(PlaybackError::InvalidClock(t)) if t.is_nan());
        assert_matches!(controller.tick(-1.0), Err(PlaybackError::InvalidClock(_)));
        assert_matches!(controller.tick(f64::INFINITY), Err(PlaybackError::InvalidClock(_)));
    }

    #[test]
    fn test_swapped_index_applies_on_next_tick() {
        let index = shared(vec![]);
        let mut controller = PlaybackController::new(index.clone(), 2);
        assert!(controller.tick(3.0).unwrap().is_empty());

        let rebuilt = TimelineBuilder::new(Policy::default())
            .build(vec![Detection::new(2.0, 4.0, "nudity", "mute", 0.8, "video")])
            .unwrap()
            .timeline;
        index.swap(TimelineIndex::new(Arc::new(rebuilt)));

        assert_eq!(
            controller.tick(3.0).unwrap(),
            vec![PlayerCommand::Mute { channel: 2 }]
        );
        assert_eq!(controller.finish(), vec![PlayerCommand::Unmute { channel: 2 }]);
        assert!(controller.finish().is_empty());
    }
}
