//! Segment model: the canonical unit of a filter timeline.
//!
//! All enums serialize in lowercase, which is also the spelling used in the
//! metadata document and in configuration files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of objectionable content a segment was flagged for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Spoken or written profanity.
    Profanity,
    /// Nudity in the picture.
    Nudity,
    /// Violence in the picture.
    Violence,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 3] = [Category::Profanity, Category::Nudity, Category::Violence];

    /// Severity used to order simultaneously active segments.
    ///
    /// Higher is more severe: violence > nudity > profanity.
    pub fn severity(self) -> u8 {
        match self {
            Self::Profanity => 1,
            Self::Nudity => 2,
            Self::Violence => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profanity => write!(f, "profanity"),
            Self::Nudity => write!(f, "nudity"),
            Self::Violence => write!(f, "violence"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the bare name as well as detector-style tags such as
    /// `profanity_mute` or `violence_detection`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let head = lower.split(['_', '-', ' ']).next().unwrap_or_default();
        match head {
            "profanity" | "language" => Ok(Self::Profanity),
            "nudity" | "nsfw" => Ok(Self::Nudity),
            "violence" | "gore" => Ok(Self::Violence),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

/// Remediation applied while a segment is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Jump past the segment.
    Skip,
    /// Silence the audio for the segment.
    Mute,
    /// Substitute text or audio with a replacement.
    Replace,
    /// Flag only; nothing is applied.
    None,
}

impl Action {
    /// All actions, most restrictive first.
    pub const ALL: [Action; 4] = [Action::Skip, Action::Mute, Action::Replace, Action::None];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Mute => write!(f, "mute"),
            Self::Replace => write!(f, "replace"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "mute" => Ok(Self::Mute),
            "replace" => Ok(Self::Replace),
            "none" => Ok(Self::None),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

/// Where a segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Subtitle (text) scanning.
    Subtitle,
    /// Frame (picture) analysis.
    Video,
    /// Merged from more than one source.
    Multiple,
}

impl Source {
    /// Merge two provenances.
    pub fn combine(self, other: Source) -> Source {
        if self == other {
            self
        } else {
            Source::Multiple
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subtitle => write!(f, "subtitle"),
            Self::Video => write!(f, "video"),
            Self::Multiple => write!(f, "multiple"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "subtitle" | "subtitles" | "srt" | "text" => Ok(Self::Subtitle),
            "video" | "frame" | "frames" => Ok(Self::Video),
            "multiple" => Ok(Self::Multiple),
            _ => Err(format!("Invalid source: {}", s)),
        }
    }
}

/// Optional data carried alongside a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Subtitle text as it appeared in the source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    /// Text or token substituted for `replace` actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,

    /// Lexicon entries that triggered the segment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_words: Vec<String>,
}

impl Payload {
    /// Payload holding only a replacement token.
    pub fn replacement(text: impl Into<String>) -> Self {
        Self {
            replacement: Some(text.into()),
            ..Default::default()
        }
    }

    /// True when no field carries data.
    pub fn is_empty(&self) -> bool {
        self.original_text.is_none() && self.replacement.is_none() && self.matched_words.is_empty()
    }

    /// Merge `other` into `self`: first text wins, matched words are unioned
    /// and kept sorted.
    pub fn absorb(&mut self, other: &Payload) {
        if self.original_text.is_none() {
            self.original_text = other.original_text.clone();
        }
        if self.replacement.is_none() {
            self.replacement = other.replacement.clone();
        }
        self.matched_words.extend(other.matched_words.iter().cloned());
        self.matched_words.sort();
        self.matched_words.dedup();
    }
}

/// Merge two optional payloads.
pub(crate) fn merge_payloads(left: Option<Payload>, right: &Option<Payload>) -> Option<Payload> {
    match (left, right) {
        (Some(mut l), Some(r)) => {
            l.absorb(r);
            Some(l)
        }
        (Some(l), None) => Some(l),
        (None, r) => r.clone(),
    }
}

/// A time interval with the action to apply and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds (inclusive).
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
    /// What was detected.
    pub category: Category,
    /// What to do about it.
    pub action: Action,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    /// Provenance.
    pub source: Source,
    /// Replacement text and other detector data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Segment {
    /// Segment length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `t` falls in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Whether the segment intersects the half-open range `[t0, t1)`.
    pub fn overlaps(&self, t0: f64, t1: f64) -> bool {
        self.start < t1 && self.end > t0
    }

    /// Replacement text, if the payload carries one.
    pub fn replacement(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.replacement.as_deref())
    }

    /// Check the structural invariants that hold regardless of policy.
    pub fn check(&self, duration: Option<f64>) -> std::result::Result<(), String> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(format!(
                "timestamps must be finite (start={}, end={})",
                self.start, self.end
            ));
        }
        if self.start < 0.0 {
            return Err(format!("start must be non-negative (start={})", self.start));
        }
        if self.start >= self.end {
            return Err(format!(
                "start must be before end (start={}, end={})",
                self.start, self.end
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence must be within [0, 1] (confidence={})",
                self.confidence
            ));
        }
        if let Some(limit) = duration {
            if self.end > limit {
                return Err(format!(
                    "end exceeds media duration (end={}, duration={})",
                    self.end, limit
                ));
            }
        }
        Ok(())
    }
}

/// The finalized schedule of segments for one media file.
///
/// Sorted ascending by `start` (then `end`, then category). Segments of the
/// same category never overlap; segments of different categories overlap
/// only when they carry the same action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    duration_secs: Option<f64>,
    segments: Vec<Segment>,
}

impl Timeline {
    /// A timeline with no segments.
    pub fn empty(duration_secs: Option<f64>) -> Self {
        Self {
            duration_secs,
            segments: Vec::new(),
        }
    }

    /// Construct from segments the builder has already ordered and resolved.
    pub(crate) fn from_resolved(duration_secs: Option<f64>, segments: Vec<Segment>) -> Self {
        debug_assert!(Self::check(duration_secs, &segments).is_ok());
        Self {
            duration_secs,
            segments,
        }
    }

    /// Construct from arbitrary segments, verifying every invariant.
    ///
    /// Used when loading a timeline back from storage.
    pub fn from_segments(
        duration_secs: Option<f64>,
        segments: Vec<Segment>,
    ) -> crate::Result<Self> {
        if let Some(d) = duration_secs {
            if !d.is_finite() || d < 0.0 {
                return Err(crate::Error::validation(format!(
                    "duration must be finite and non-negative (duration={})",
                    d
                )));
            }
        }
        Self::check(duration_secs, &segments).map_err(crate::Error::Validation)?;
        Ok(Self {
            duration_secs,
            segments,
        })
    }

    fn check(duration: Option<f64>, segments: &[Segment]) -> std::result::Result<(), String> {
        for (i, seg) in segments.iter().enumerate() {
            seg.check(duration)
                .map_err(|e| format!("segment {}: {}", i, e))?;
        }

        for (i, pair) in segments.windows(2).enumerate() {
            if segment_order(&pair[0], &pair[1]) == std::cmp::Ordering::Greater {
                return Err(format!("segment {} is out of order", i + 1));
            }
        }

        // Same-category overlap, or cross-category overlap with different actions.
        let mut open: Vec<&Segment> = Vec::new();
        for (i, seg) in segments.iter().enumerate() {
            open.retain(|o| o.end > seg.start);
            for o in &open {
                if o.category == seg.category {
                    return Err(format!(
                        "segment {} overlaps an earlier {} segment",
                        i, seg.category
                    ));
                }
                if o.action != seg.action {
                    return Err(format!(
                        "segment {} ({}) overlaps a conflicting {} segment",
                        i, seg.action, o.action
                    ));
                }
            }
            open.push(seg);
        }

        Ok(())
    }

    /// Media duration the timeline was clamped to, if known.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// All segments in timeline order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterate over segments in timeline order.
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when there are no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest segment end, or `0.0` for an empty timeline.
    pub fn last_end(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }

    /// Number of segments flagged for `category`.
    pub fn count(&self, category: Category) -> usize {
        self.segments
            .iter()
            .filter(|s| s.category == category)
            .count()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Canonical timeline order: start, then end, then category.
pub(crate) fn segment_order(a: &Segment, b: &Segment) -> std::cmp::Ordering {
    a.start
        .total_cmp(&b.start)
        .then(a.end.total_cmp(&b.end))
        .then(a.category.cmp(&b.category))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, category: Category, action: Action) -> Segment {
        Segment {
            start,
            end,
            category,
            action,
            confidence: 1.0,
            source: Source::Subtitle,
            payload: None,
        }
    }

    #[test]
    fn test_category_from_detector_tags() {
        assert_eq!("profanity".parse::<Category>(), Ok(Category::Profanity));
        assert_eq!("profanity_mute".parse::<Category>(), Ok(Category::Profanity));
        assert_eq!("nudity_detection".parse::<Category>(), Ok(Category::Nudity));
        assert_eq!("Violence".parse::<Category>(), Ok(Category::Violence));
        assert!("explosions".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_severity_order() {
        assert!(Category::Violence.severity() > Category::Nudity.severity());
        assert!(Category::Nudity.severity() > Category::Profanity.severity());
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&Action::Skip).unwrap(), r#""skip""#);
        assert_eq!(
            serde_json::to_string(&Source::Multiple).unwrap(),
            r#""multiple""#
        );
        let c: Category = serde_json::from_str(r#""nudity""#).unwrap();
        assert_eq!(c, Category::Nudity);
    }

    #[test]
    fn test_source_combine() {
        assert_eq!(Source::Subtitle.combine(Source::Subtitle), Source::Subtitle);
        assert_eq!(Source::Subtitle.combine(Source::Video), Source::Multiple);
        assert_eq!(Source::Multiple.combine(Source::Video), Source::Multiple);
    }

    #[test]
    fn test_payload_absorb() {
        let mut a = Payload {
            original_text: Some("damn it".into()),
            replacement: None,
            matched_words: vec!["damn".into()],
        };
        let b = Payload {
            original_text: Some("other".into()),
            replacement: Some("[censored]".into()),
            matched_words: vec!["damn".into(), "hell".into()],
        };
        a.absorb(&b);
        assert_eq!(a.original_text.as_deref(), Some("damn it"));
        assert_eq!(a.replacement.as_deref(), Some("[censored]"));
        assert_eq!(a.matched_words, vec!["damn", "hell"]);
    }

    #[test]
    fn test_segment_check() {
        assert!(seg(1.0, 2.0, Category::Profanity, Action::Mute).check(None).is_ok());
        assert!(seg(2.0, 2.0, Category::Profanity, Action::Mute).check(None).is_err());
        assert!(seg(-1.0, 2.0, Category::Profanity, Action::Mute).check(None).is_err());
        assert!(seg(1.0, f64::NAN, Category::Profanity, Action::Mute).check(None).is_err());
        assert!(seg(1.0, 5.0, Category::Profanity, Action::Mute).check(Some(4.0)).is_err());

        let mut s = seg(1.0, 2.0, Category::Nudity, Action::Skip);
        s.confidence = 1.5;
        assert!(s.check(None).is_err());
    }

    #[test]
    fn test_segment_overlaps_is_half_open() {
        let s = seg(5.0, 6.0, Category::Profanity, Action::Mute);
        assert!(s.overlaps(5.5, 7.0));
        assert!(!s.overlaps(6.0, 7.0));
        assert!(!s.overlaps(4.0, 5.0));
        assert!(s.contains(5.0));
        assert!(!s.contains(6.0));
    }

    #[test]
    fn test_from_segments_rejects_unsorted() {
        let segments = vec![
            seg(5.0, 6.0, Category::Profanity, Action::Mute),
            seg(1.0, 2.0, Category::Profanity, Action::Mute),
        ];
        assert!(Timeline::from_segments(None, segments).is_err());
    }

    #[test]
    fn test_from_segments_rejects_same_category_overlap() {
        let segments = vec![
            seg(1.0, 3.0, Category::Profanity, Action::Mute),
            seg(2.0, 4.0, Category::Profanity, Action::Mute),
        ];
        assert!(Timeline::from_segments(None, segments).is_err());
    }

    #[test]
    fn test_from_segments_cross_category_overlap() {
        let same_action = vec![
            seg(1.0, 3.0, Category::Profanity, Action::Mute),
            seg(2.0, 4.0, Category::Violence, Action::Mute),
        ];
        assert!(Timeline::from_segments(None, same_action).is_ok());

        let conflicting = vec![
            seg(1.0, 3.0, Category::Profanity, Action::Mute),
            seg(2.0, 4.0, Category::Violence, Action::Skip),
        ];
        assert!(Timeline::from_segments(None, conflicting).is_err());
    }

    #[test]
    fn test_timeline_accessors() {
        let timeline = Timeline::from_segments(
            Some(100.0),
            vec![
                seg(1.0, 2.0, Category::Profanity, Action::Mute),
                seg(10.0, 20.0, Category::Violence, Action::Skip),
            ],
        )
        .unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.last_end(), 20.0);
        assert_eq!(timeline.count(Category::Violence), 1);
        assert_eq!(timeline.duration_secs(), Some(100.0));
        assert!(Timeline::empty(None).is_empty());
    }
}
