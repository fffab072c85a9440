//! Timeline builder.
//!
//! Turns the raw detections of every source for one media file into a
//! [`Timeline`]:
//!
//! 1. Normalize each detection through the [`Policy`] and validate it
//! 2. Sort by start, end, then source priority
//! 3. Merge overlapping (or touching) segments of the same category
//! 4. Truncate less restrictive segments where a different category with a
//!    more restrictive action overlaps them
//!
//! The build needs every detection up front; there is no incremental mode.

use crate::detection::Detection;
use crate::policy::Policy;
use crate::segment::{merge_payloads, segment_order, Category, Segment, Timeline};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// A detection that could not be turned into a valid segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Position of the detection in the builder input.
    pub index: usize,
    /// The offending detection, unchanged.
    pub detection: Detection,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({}): {}", self.index, self.detection, self.reason)
    }
}

/// Outcome of a non-strict build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The built timeline.
    pub timeline: Timeline,
    /// Detections that were skipped, in input order.
    pub rejected: Vec<Rejection>,
}

/// Builds timelines under a fixed policy.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    policy: Policy,
}

impl TimelineBuilder {
    /// Create a builder for the given policy.
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// The policy this builder applies.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Normalize a single detection into a segment.
    pub fn normalize(&self, detection: &Detection) -> std::result::Result<Segment, String> {
        let category: Category = detection.category.parse()?;
        let source = detection.source_tag.parse()?;

        if !detection.start.is_finite() || !detection.end.is_finite() {
            return Err(format!(
                "timestamps must be finite (start={}, end={})",
                detection.start, detection.end
            ));
        }

        let end = match self.policy.media_duration {
            Some(duration) => detection.end.min(duration),
            None => detection.end,
        };

        let action = self.policy.resolve_action(category, &detection.raw_action)?;
        self.policy.check_allowed(category, action)?;

        let segment = Segment {
            start: detection.start,
            end,
            category,
            action,
            confidence: detection.confidence,
            source,
            payload: detection.payload.clone().filter(|p| !p.is_empty()),
        };
        segment.check(self.policy.media_duration)?;

        Ok(segment)
    }

    /// Build a timeline from all detections for one media file.
    ///
    /// Invalid detections are reported in [`BuildReport::rejected`]. In strict
    /// mode any invalid detection fails the build with [`Error::Rejected`]
    /// carrying every rejection.
    pub fn build(&self, detections: impl IntoIterator<Item = Detection>) -> Result<BuildReport> {
        self.policy.validate()?;

        let mut segments = Vec::new();
        let mut rejected = Vec::new();
        let mut total = 0usize;

        for (index, detection) in detections.into_iter().enumerate() {
            total += 1;
            match self.normalize(&detection) {
                Ok(segment) => segments.push(segment),
                Err(reason) => {
                    tracing::warn!(index, detection = %detection, %reason, "Rejected detection");
                    rejected.push(Rejection {
                        index,
                        detection,
                        reason,
                    });
                }
            }
        }

        if self.policy.strict && !rejected.is_empty() {
            return Err(Error::Rejected {
                rejections: rejected,
            });
        }

        self.sort_for_merge(&mut segments);
        let merged = self.merge_same_category(segments);
        let mut resolved = self.resolve_conflicts(merged);
        resolved.sort_by(segment_order);

        tracing::debug!(
            detections = total,
            rejected = rejected.len(),
            segments = resolved.len(),
            "Built timeline"
        );

        Ok(BuildReport {
            timeline: Timeline::from_resolved(self.policy.media_duration, resolved),
            rejected,
        })
    }

    fn sort_for_merge(&self, segments: &mut [Segment]) {
        let policy = &self.policy;
        segments.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then(a.end.total_cmp(&b.end))
                .then(policy.source_rank(a.source).cmp(&policy.source_rank(b.source)))
                .then(a.category.cmp(&b.category))
                .then(policy.rank(b.action).cmp(&policy.rank(a.action)))
                .then(b.confidence.total_cmp(&a.confidence))
                .then_with(|| payload_key(a).cmp(&payload_key(b)))
        });
    }

    /// Sweep over start-sorted segments, merging within each category.
    fn merge_same_category(&self, sorted: Vec<Segment>) -> Vec<Segment> {
        let gap = self.policy.merge_gap_secs;
        let mut open: BTreeMap<Category, Segment> = BTreeMap::new();
        let mut out = Vec::with_capacity(sorted.len());

        for seg in sorted {
            let joins = open
                .get(&seg.category)
                .is_some_and(|current| seg.start <= current.end + gap);

            if !joins {
                if let Some(done) = open.insert(seg.category, seg) {
                    out.push(done);
                }
                continue;
            }

            if let Some(current) = open.get_mut(&seg.category) {
                current.end = current.end.max(seg.end);
                current.action = self.policy.most_restrictive(current.action, seg.action);
                current.confidence = current.confidence.max(seg.confidence);
                current.source = current.source.combine(seg.source);
                current.payload = merge_payloads(current.payload.take(), &seg.payload);
            }
        }

        out.extend(open.into_values());
        out
    }

    /// Remove from each segment the time covered by more restrictive segments
    /// of other categories. Non-empty remainders become separate segments.
    fn resolve_conflicts(&self, merged: Vec<Segment>) -> Vec<Segment> {
        let max_rank = self.policy.restrictiveness.len();

        // blockers[r] = disjoint, start-sorted union of segments ranked above r
        let blockers: Vec<Vec<(f64, f64)>> = (0..=max_rank)
            .map(|r| {
                let mut spans: Vec<(f64, f64)> = merged
                    .iter()
                    .filter(|s| self.policy.rank(s.action) > r)
                    .map(|s| (s.start, s.end))
                    .collect();
                union_spans(&mut spans)
            })
            .collect();

        let mut out = Vec::with_capacity(merged.len());
        for seg in merged {
            let spans = &blockers[self.policy.rank(seg.action)];
            let pieces = subtract_spans(seg.start, seg.end, spans);

            if pieces.len() != 1 || pieces[0] != (seg.start, seg.end) {
                tracing::trace!(
                    category = %seg.category,
                    action = %seg.action,
                    start = seg.start,
                    end = seg.end,
                    remainders = pieces.len(),
                    "Truncated segment overridden by a more restrictive action"
                );
            }

            for (start, end) in pieces {
                out.push(Segment {
                    start,
                    end,
                    ..seg.clone()
                });
            }
        }
        out
    }
}

/// Union overlapping or touching spans. Returns start-sorted, disjoint spans.
/// Tie-breaker for otherwise identical segments.
fn payload_key(segment: &Segment) -> Option<(&Option<String>, &Option<String>, &[String])> {
    segment
        .payload
        .as_ref()
        .map(|p| (&p.original_text, &p.replacement, p.matched_words.as_slice()))
}

fn union_spans(spans: &mut [(f64, f64)]) -> Vec<(f64, f64)> {
    spans.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut out: Vec<(f64, f64)> = Vec::with_capacity(spans.len());
    for &(start, end) in spans.iter() {
        match out.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => out.push((start, end)),
        }
    }
    out
}

/// `[start, end)` minus the given disjoint, start-sorted spans.
fn subtract_spans(start: f64, end: f64, spans: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let first = spans.partition_point(|s| s.1 <= start);
    let mut cursor = start;
    let mut pieces = Vec::new();

    for &(b_start, b_end) in &spans[first..] {
        if b_start >= end {
            break;
        }
        if b_start > cursor {
            pieces.push((cursor, b_start));
        }
        if b_end > cursor {
            cursor = b_end;
        }
        if cursor >= end {
            break;
        }
    }

    if cursor < end {
        pieces.push((cursor, end));
    }
    pieces
}
