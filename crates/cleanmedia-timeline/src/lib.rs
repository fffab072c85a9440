//! CleanMedia-Timeline: the action timeline engine.
//!
//! This crate turns raw findings from independent detectors into a single,
//! conflict-free schedule of remediation actions for one media file, and
//! makes that schedule cheap to query during playback.
//!
//! # Modules
//!
//! - `segment` - Canonical time interval + category + action + provenance
//! - `detection` - Loosely-typed detector output, prior to normalization
//! - `policy` - Injected category/action inference rules and restrictiveness order
//! - `builder` - Normalization, validation, merging and conflict resolution
//! - `index` - Point-in-time and range queries over a built timeline
//! - `export` - Versioned metadata documents and human-readable previews
//!
//! # Architecture
//!
//! ```text
//! detectors ──► Detection ──► TimelineBuilder ──► Timeline ──► TimelineIndex
//!                                                     │              │
//!                                                     ▼              ▼
//!                                               MetadataDocument  playback
//! ```
//!
//! A [`Timeline`] is immutable. Changing the filter configuration means
//! building a new timeline and a new index, never editing the old ones.
//!
//! # Examples
//!
//! ```
//! use cleanmedia_timeline::{Detection, Policy, TimelineBuilder, TimelineIndex};
//! use std::sync::Arc;
//!
//! let detections = vec![
//!     Detection::new(10.0, 12.0, "profanity", "mute", 1.0, "subtitle"),
//!     Detection::new(11.0, 15.0, "violence", "skip", 0.9, "video"),
//! ];
//!
//! let report = TimelineBuilder::new(Policy::default()).build(detections).unwrap();
//! assert_eq!(report.timeline.len(), 2);
//!
//! let index = TimelineIndex::new(Arc::new(report.timeline));
//! assert_eq!(index.active_at(12.0).len(), 1);
//! ```

pub mod builder;
pub mod detection;
pub mod error;
pub mod export;
pub mod index;
pub mod policy;
pub mod segment;

pub use builder::{BuildReport, Rejection, TimelineBuilder};
pub use detection::Detection;
pub use error::{Error, Result};
pub use export::{FiltersApplied, MediaDescriptor, MetadataDocument, MetadataPaths, SCHEMA_VERSION};
pub use index::TimelineIndex;
pub use policy::{CategoryRule, Policy};
pub use segment::{Action, Category, Payload, Segment, Source, Timeline};
