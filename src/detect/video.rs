//! Frame-based nudity and violence detection.
//!
//! The classification model itself lives outside this crate. A
//! [`FrameClassifier`] hands back per-sample scores and [`FrameDetector`]
//! turns the samples that cross a threshold into detections.

use crate::config::{FiltersConfig, VideoConfig};
use anyhow::{Context, Result};
use cleanmedia_timeline::Detection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Classifier scores for one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FrameScores {
    /// Sample time in seconds.
    pub time: f64,
    #[serde(default)]
    pub nudity: f64,
    #[serde(default)]
    pub violence: f64,
}

/// Source of frame scores for a video.
pub trait FrameClassifier: Send + Sync {
    /// Score frames sampled every `interval_secs` seconds.
    fn classify(&self, video: &Path, interval_secs: f64) -> Result<Vec<FrameScores>>;
}

/// Reads scores precomputed by an external model from
/// `<video stem>.scores.json` next to the video.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarClassifier;

impl SidecarClassifier {
    pub fn sidecar_path(video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        video.with_file_name(format!("{}.scores.json", stem))
    }
}

impl FrameClassifier for SidecarClassifier {
    fn classify(&self, video: &Path, _interval_secs: f64) -> Result<Vec<FrameScores>> {
        let path = Self::sidecar_path(video);
        if !path.exists() {
            tracing::debug!("No frame scores found at {:?}", path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read frame scores: {:?}", path))?;
        let samples: Vec<FrameScores> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse frame scores: {:?}", path))?;

        Ok(samples)
    }
}

#[derive(Debug, Clone)]
struct Threshold {
    min_score: f64,
    raw_action: String,
}

/// Emits one detection per sample whose score meets an enabled threshold.
#[derive(Debug, Clone)]
pub struct FrameDetector {
    nudity: Option<Threshold>,
    violence: Option<Threshold>,
    interval_secs: f64,
}

impl FrameDetector {
    /// `None` when neither frame filter is enabled.
    pub fn from_config(filters: &FiltersConfig, video: &VideoConfig) -> Option<Self> {
        let nudity = filters.nudity.enabled.then(|| Threshold {
            min_score: filters.nudity.detection_threshold,
            raw_action: filters.nudity.action.clone(),
        });
        let violence = filters.violence.enabled.then(|| Threshold {
            min_score: filters.violence.detection_threshold,
            raw_action: filters.violence.action.clone(),
        });

        if nudity.is_none() && violence.is_none() {
            return None;
        }

        Some(Self {
            nudity,
            violence,
            interval_secs: video.sample_interval_secs,
        })
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    pub fn detect(&self, samples: &[FrameScores]) -> Vec<Detection> {
        let mut detections = Vec::new();

        for sample in samples {
            let checks = [
                ("nudity_detection", &self.nudity, sample.nudity),
                ("violence_detection", &self.violence, sample.violence),
            ];
            for (category, threshold, score) in checks {
                let Some(threshold) = threshold else { continue };
                if score >= threshold.min_score {
                    detections.push(Detection::new(
                        sample.time,
                        sample.time + self.interval_secs,
                        category,
                        &threshold.raw_action,
                        score,
                        "video",
                    ));
                }
            }
        }

        tracing::debug!(
            samples = samples.len(),
            detections = detections.len(),
            "Scanned frame samples"
        );
        detections
    }

    /// Classify a video and detect in one go.
    pub fn scan(&self, classifier: &dyn FrameClassifier, video: &Path) -> Result<Vec<Detection>> {
        let samples = classifier.classify(video, self.interval_secs)?;
        Ok(self.detect(&samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NudityFilter, ViolenceFilter};
    use tempfile::tempdir;

    fn filters(nudity: bool, violence: bool) -> FiltersConfig {
        FiltersConfig {
            nudity: NudityFilter {
                enabled: nudity,
                ..Default::default()
            },
            violence: ViolenceFilter {
                enabled: violence,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn sample(time: f64, nudity: f64, violence: f64) -> FrameScores {
        FrameScores {
            time,
            nudity,
            violence,
        }
    }

    #[test]
    fn test_disabled_filters() {
        assert!(FrameDetector::from_config(&filters(false, false), &VideoConfig::default()).is_none());
    }

    #[test]
    fn test_thresholds() {
        let detector =
            FrameDetector::from_config(&filters(false, true), &VideoConfig::default()).unwrap();
        let detections = detector.detect(&[
            sample(10.0, 0.99, 0.65),
            sample(11.0, 0.0, 0.64),
            sample(12.0, 0.0, 0.9),
        ]);

        let found: Vec<(f64, f64, &str)> = detections
            .iter()
            .map(|d| (d.start, d.end, d.category.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (10.0, 11.0, "violence_detection"),
                (12.0, 13.0, "violence_detection")
            ]
        );
        assert_eq!(detections[0].raw_action, "skip_scene");
        assert_eq!(detections[0].confidence, 0.65);
        assert_eq!(detections[0].source_tag, "video");
    }

    #[test]
    fn test_sidecar_classifier() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("movie.mp4");
        std::fs::write(&video, b"").unwrap();

        assert!(SidecarClassifier.classify(&video, 1.0).unwrap().is_empty());

        std::fs::write(
            dir.path().join("movie.scores.json"),
            r#"[{"time": 3.0, "nudity": 0.8}, {"time": 4.0, "violence": 0.1}]"#,
        )
        .unwrap();
        let samples = SidecarClassifier.classify(&video, 1.0).unwrap();
        assert_eq!(samples, vec![sample(3.0, 0.8, 0.0), sample(4.0, 0.0, 0.1)]);
    }

    #[test]
    fn test_sidecar_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("movie.mkv");
        std::fs::write(dir.path().join("movie.scores.json"), "not json").unwrap();

        let err = SidecarClassifier.classify(&video, 1.0).unwrap_err();
        assert!(err.to_string().contains("movie.scores.json"));
    }
}
