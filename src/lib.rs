//! CleanMedia - content filtering for media files
//!
//! This library crate exposes the application layer for integration testing:
//! detectors, per-file processing and the simulated playback session. The
//! timeline engine itself lives in the `cleanmedia-timeline` crate.

pub mod config;
pub mod detect;
pub mod media;
pub mod playback;
pub mod processor;
