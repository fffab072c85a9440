//! Source detectors.
//!
//! Each detector turns one kind of input into raw [`Detection`]s for the
//! timeline builder:
//!
//! - `subtitle` - lexicon matching over SRT cues
//! - `video` - thresholded frame classifier scores
//!
//! [`Detection`]: cleanmedia_timeline::Detection

pub mod srt;
pub mod subtitle;
pub mod video;

pub use srt::Cue;
pub use subtitle::{Lexicon, SubtitleDetector};
pub use video::{FrameClassifier, FrameDetector, FrameScores, SidecarClassifier};
