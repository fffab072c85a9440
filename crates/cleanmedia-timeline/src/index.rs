//! Query index over a built timeline.
//!
//! Segments of one category never overlap, so within a category both starts
//! and ends are sorted. The index keeps one such lane per category and
//! answers every query with binary searches; nothing scans the timeline.

use crate::segment::{Category, Segment, Timeline};
use std::sync::Arc;

/// Start/end arrays for the segments of one category.
#[derive(Debug, Clone)]
struct Lane {
    starts: Vec<f64>,
    ends: Vec<f64>,
    /// Position of each lane entry in the timeline.
    positions: Vec<usize>,
}

impl Lane {
    fn active_at(&self, t: f64) -> Option<usize> {
        let after = self.starts.partition_point(|s| *s <= t);
        let candidate = after.checked_sub(1)?;
        (self.ends[candidate] > t).then(|| self.positions[candidate])
    }

    fn intersecting(&self, t0: f64, t1: f64) -> &[usize] {
        let lo = self.ends.partition_point(|e| *e <= t0);
        let hi = self.starts.partition_point(|s| *s < t1);
        if lo < hi {
            &self.positions[lo..hi]
        } else {
            &[]
        }
    }
}

/// Read-only lookup structure over one [`Timeline`].
///
/// Holds the timeline by `Arc`, so the index can never outlive it. When the
/// timeline changes, build a new index.
#[derive(Debug, Clone)]
pub struct TimelineIndex {
    timeline: Arc<Timeline>,
    lanes: Vec<Lane>,
    starts: Vec<f64>,
}

impl TimelineIndex {
    /// Index a timeline.
    pub fn new(timeline: Arc<Timeline>) -> Self {
        let mut lanes = Vec::new();
        for category in Category::ALL {
            let mut lane = Lane {
                starts: Vec::new(),
                ends: Vec::new(),
                positions: Vec::new(),
            };
            for (pos, seg) in timeline.iter().enumerate() {
                if seg.category == category {
                    lane.starts.push(seg.start);
                    lane.ends.push(seg.end);
                    lane.positions.push(pos);
                }
            }
            if !lane.positions.is_empty() {
                lanes.push(lane);
            }
        }

        let starts = timeline.iter().map(|s| s.start).collect();

        Self {
            timeline,
            lanes,
            starts,
        }
    }

    /// The indexed timeline.
    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    /// Number of indexed segments.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// True when the timeline has no segments.
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Segments with `start <= t < end`, most severe category first.
    pub fn active_at(&self, t: f64) -> Vec<&Segment> {
        if t.is_nan() {
            return Vec::new();
        }

        let segments = self.timeline.segments();
        let mut active: Vec<&Segment> = self
            .lanes
            .iter()
            .filter_map(|lane| lane.active_at(t))
            .map(|pos| &segments[pos])
            .collect();

        active.sort_by(|a, b| {
            b.category
                .severity()
                .cmp(&a.category.severity())
                .then(a.start.total_cmp(&b.start))
        });
        active
    }

    /// Segments intersecting `[t0, t1)`, ascending by start.
    ///
    /// Returns nothing unless `t0 < t1`.
    pub fn intersect(&self, t0: f64, t1: f64) -> Vec<&Segment> {
        // Also rejects NaN bounds
        if !(t0 < t1) {
            return Vec::new();
        }

        let mut positions: Vec<usize> = self
            .lanes
            .iter()
            .flat_map(|lane| lane.intersecting(t0, t1).iter().copied())
            .collect();
        positions.sort_unstable();

        let segments = self.timeline.segments();
        positions.into_iter().map(|pos| &segments[pos]).collect()
    }

    /// Start of the first segment beginning strictly after `t`.
    pub fn next_start_after(&self, t: f64) -> Option<f64> {
        let i = self.starts.partition_point(|s| *s <= t);
        self.starts.get(i).copied()
    }
}
