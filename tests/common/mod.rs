//! Shared fixtures for integration tests.
//!
//! [`MediaFixture`] lays out a temporary movie directory with a video file,
//! optional subtitles and optional frame scores.

#![allow(dead_code)]

use cleanmedia::config::Config;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SAMPLE_SRT: &str = "1
00:00:10,000 --> 00:00:12,000
What the hell is that?

2
00:00:20,000 --> 00:00:22,500
Nothing to see here.

3
00:00:30,000 --> 00:00:31,000
Damn it, damn it all.
";

/// A temporary directory holding one or more fake media files.
pub struct MediaFixture {
    pub dir: TempDir,
}

impl MediaFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create an (empty) video file; the detectors never decode it.
    pub fn video(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"").unwrap();
        path
    }

    /// Write `<stem>.srt` next to a video.
    pub fn subtitles(&self, video: &Path, content: &str) -> PathBuf {
        let path = video.with_extension("srt");
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write `<stem>.scores.json` next to a video.
    pub fn scores(&self, video: &Path, json: &str) -> PathBuf {
        let stem = video.file_stem().unwrap().to_string_lossy().into_owned();
        let path = video.with_file_name(format!("{}.scores.json", stem));
        std::fs::write(&path, json).unwrap();
        path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("metadata")
    }
}

/// Default config with every filter enabled and output under `output_dir`.
pub fn all_filters_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.metadata_dir = output_dir.to_path_buf();
    config.filters.profanity.enabled = true;
    config.filters.nudity.enabled = true;
    config.filters.violence.enabled = true;
    config
}
