//! Per-file processing: detect, build, export.

use crate::config::Config;
use crate::detect::{srt, Cue, FrameClassifier, FrameDetector, SidecarClassifier, SubtitleDetector};
use crate::media;
use anyhow::{Context, Result};
use cleanmedia_timeline::export::{self, metadata_paths, MetadataPaths};
use cleanmedia_timeline::{
    Detection, Error as TimelineError, MediaDescriptor, MetadataDocument, Timeline, TimelineBuilder,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to process and how.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub video: PathBuf,
    /// Explicit subtitle file; otherwise a sibling `<stem>.srt` is used if present
    pub subtitles: Option<PathBuf>,
    /// Overrides the configured metadata directory
    pub output_dir: Option<PathBuf>,
    /// Media duration in seconds, used to clamp segments
    pub duration: Option<f64>,
    /// Fail on any invalid detection
    pub strict: bool,
}

impl ScanRequest {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        Self {
            video: video.into(),
            ..Default::default()
        }
    }
}

/// Result of processing one file.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub timeline: Timeline,
    pub document: MetadataDocument,
    pub paths: MetadataPaths,
    pub filtered_subtitles: Option<PathBuf>,
    /// Detections the builder skipped
    pub rejected: usize,
}

/// Per-file results of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(PathBuf, ScanOutcome)>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the detectors and the timeline builder for media files.
pub struct Processor {
    config: Arc<Config>,
    classifier: Arc<dyn FrameClassifier>,
}

impl Processor {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_classifier(config, Arc::new(SidecarClassifier))
    }

    pub fn with_classifier(config: Arc<Config>, classifier: Arc<dyn FrameClassifier>) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process a single video file.
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanOutcome> {
        let video = &request.video;
        if !video.is_file() {
            anyhow::bail!("Video file does not exist: {:?}", video);
        }

        let subtitles = request
            .subtitles
            .clone()
            .or_else(|| media::sibling_subtitles(video));
        if let Some(path) = &subtitles {
            if !path.is_file() {
                anyhow::bail!("Subtitle file does not exist: {:?}", path);
            }
            if !media::is_subtitle_file(path) {
                anyhow::bail!("Unsupported subtitle format (expected .srt): {:?}", path);
            }
        }

        tracing::info!("Processing {:?}", video);

        let subtitle_detector = SubtitleDetector::from_config(&self.config.filters.profanity)?;
        let frame_detector = FrameDetector::from_config(&self.config.filters, &self.config.video);

        // Subtitle and frame analysis are independent
        let (text, frames) = rayon::join(
            || -> Result<Option<(Vec<Cue>, Vec<Detection>)>> {
                match (&subtitle_detector, &subtitles) {
                    (Some(detector), Some(path)) => {
                        let cues = srt::parse_file(path)?;
                        let detections = detector.detect(&cues);
                        Ok(Some((cues, detections)))
                    }
                    _ => Ok(None),
                }
            },
            || -> Result<Vec<Detection>> {
                match &frame_detector {
                    Some(detector) => detector
                        .scan(self.classifier.as_ref(), video)
                        .with_context(|| format!("Frame analysis failed for {:?}", video)),
                    None => Ok(Vec::new()),
                }
            },
        );
        let text = text?;
        let frames = frames?;

        let mut detections = frames;
        let mut cues = None;
        if let Some((parsed, found)) = text {
            detections.extend(found);
            cues = Some(parsed);
        }

        let policy = self
            .config
            .policy()
            .strict(self.config.timeline.strict || request.strict)
            .media_duration(request.duration);

        let report = TimelineBuilder::new(policy)
            .build(detections)
            .map_err(|e| match e {
                TimelineError::Rejected { rejections } => {
                    let details: Vec<String> = rejections.iter().map(|r| r.to_string()).collect();
                    anyhow::anyhow!(
                        "Strict mode: {} invalid detection(s)\n  {}",
                        rejections.len(),
                        details.join("\n  ")
                    )
                }
                other => anyhow::Error::new(other),
            })
            .with_context(|| format!("Failed to build timeline for {:?}", video))?;

        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.output.metadata_dir.clone());
        let paths = metadata_paths(&output_dir, video);

        let descriptor = MediaDescriptor::from_paths(
            video,
            subtitles.as_deref(),
            self.config.filters.applied(),
        );
        let document = export::export(&report.timeline, &descriptor);

        export::write_document(&paths.metadata, &document)
            .with_context(|| format!("Failed to write metadata: {:?}", paths.metadata))?;
        export::write_preview(&paths.preview, &document)
            .with_context(|| format!("Failed to write preview: {:?}", paths.preview))?;

        let filtered_subtitles = match (&subtitle_detector, cues) {
            (Some(detector), Some(cues)) if self.config.output.write_filtered_subtitles => {
                Some(write_filtered_subtitles(detector, &cues, &output_dir, video)?)
            }
            _ => None,
        };

        tracing::info!(
            segments = report.timeline.len(),
            rejected = report.rejected.len(),
            "Wrote {:?}",
            paths.metadata
        );

        Ok(ScanOutcome {
            timeline: report.timeline,
            document,
            paths,
            filtered_subtitles,
            rejected: report.rejected.len(),
        })
    }

    /// Process every video under `dir`, continuing past failures.
    pub fn batch(&self, dir: &Path, output_dir: Option<&Path>, strict: bool) -> Result<BatchReport> {
        if !dir.is_dir() {
            anyhow::bail!("Directory does not exist: {:?}", dir);
        }

        let videos = media::find_videos(dir);
        tracing::info!("Found {} video file(s) in {:?}", videos.len(), dir);

        let target_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output.metadata_dir.clone());

        // Outputs are named by stem, so two videos may map to the same file
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        let mut report = BatchReport::default();
        for video in videos {
            let metadata = metadata_paths(&target_dir, &video).metadata;
            if let Some(owner) = claimed.get(&metadata) {
                let e = anyhow::anyhow!(
                    "Output {:?} is already used by {:?}; process {:?} separately with --output-dir",
                    metadata,
                    owner,
                    video
                );
                tracing::error!("Failed to process {:?}: {:#}", video, e);
                report.failed.push((video, e));
                continue;
            }
            claimed.insert(metadata, video.clone());

            let request = ScanRequest {
                video: video.clone(),
                output_dir: Some(target_dir.clone()),
                strict,
                ..Default::default()
            };
            match self.scan(&request) {
                Ok(outcome) => report.succeeded.push((video, outcome)),
                Err(e) => {
                    tracing::error!("Failed to process {:?}: {:#}", video, e);
                    report.failed.push((video, e));
                }
            }
        }

        Ok(report)
    }
}

fn write_filtered_subtitles(
    detector: &SubtitleDetector,
    cues: &[Cue],
    output_dir: &Path,
    video: &Path,
) -> Result<PathBuf> {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    let path = output_dir.join(format!("{}_filtered.srt", stem));

    let filtered = detector.filter_cues(cues);
    export::write_atomic(&path, srt::compose(&filtered).as_bytes())
        .with_context(|| format!("Failed to write filtered subtitles: {:?}", path))?;

    Ok(path)
}
