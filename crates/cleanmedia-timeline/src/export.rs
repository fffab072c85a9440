//! Metadata export and import.
//!
//! A timeline is persisted as a versioned JSON document next to a plain-text
//! preview. Import is exact: `import(export(t)) == t`. The preview is for
//! people and is never read back.

use crate::segment::{Segment, Timeline};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Metadata schema version written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Which filters were enabled when the timeline was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersApplied {
    pub profanity: bool,
    pub nudity: bool,
    pub violence: bool,
}

/// Identity of the media file a timeline belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaDescriptor {
    /// Base name of the media file.
    pub media_file: String,
    /// Base name of the subtitle file that was scanned, if any.
    pub subtitle_file: Option<String>,
    /// Filters enabled for this run.
    pub filters_applied: FiltersApplied,
}

impl MediaDescriptor {
    /// Describe a media file (and optional subtitle file) by base name.
    pub fn from_paths(media: &Path, subtitle: Option<&Path>, filters: FiltersApplied) -> Self {
        Self {
            media_file: base_name(media),
            subtitle_file: subtitle.map(base_name),
            filters_applied: filters,
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The on-disk metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Schema version.
    pub version: u32,
    /// Base name of the media file.
    pub media_file: String,
    /// Base name of the scanned subtitle file.
    #[serde(default)]
    pub subtitle_file: Option<String>,
    /// When the timeline was built.
    pub processed_at: DateTime<Utc>,
    /// Media duration the timeline was clamped to.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Filters enabled for the run.
    #[serde(default)]
    pub filters_applied: FiltersApplied,
    /// Timeline segments, in timeline order.
    pub segments: Vec<Segment>,
}

impl MetadataDocument {
    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON.
    ///
    /// The schema version is checked before anything else is interpreted,
    /// so documents from newer writers fail with
    /// [`Error::UnsupportedVersion`] rather than a decode error.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let version = value
            .get("version")
            .ok_or_else(|| Error::validation("metadata document has no version"))?;
        let found = version
            .as_u64()
            .ok_or_else(|| Error::validation(format!("invalid metadata version: {}", version)))?;
        check_version(found)?;

        Ok(serde_json::from_value(value)?)
    }
}

fn check_version(found: u64) -> Result<()> {
    if found != u64::from(SCHEMA_VERSION) {
        return Err(Error::UnsupportedVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Export a timeline into a metadata document.
pub fn export(timeline: &Timeline, media: &MediaDescriptor) -> MetadataDocument {
    MetadataDocument {
        version: SCHEMA_VERSION,
        media_file: media.media_file.clone(),
        subtitle_file: media.subtitle_file.clone(),
        processed_at: Utc::now(),
        duration_seconds: timeline.duration_secs(),
        filters_applied: media.filters_applied,
        segments: timeline.segments().to_vec(),
    }
}

/// Rebuild a timeline from a metadata document.
///
/// Segments are re-validated; a document that breaks timeline invariants is
/// rejected with [`Error::Validation`].
pub fn import(document: MetadataDocument) -> Result<Timeline> {
    check_version(u64::from(document.version))?;
    Timeline::from_segments(document.duration_seconds, document.segments)
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, ms)
}

/// One preview line for a segment.
pub fn preview_line(segment: &Segment) -> String {
    let mut line = format!(
        "[{} - {}] {} for {} (source: {}, confidence: {:.2})",
        format_timestamp(segment.start),
        format_timestamp(segment.end),
        segment.action,
        segment.category,
        segment.source,
        segment.confidence
    );
    if let Some(replacement) = segment.replacement() {
        let _ = write!(line, " -> \"{}\"", replacement);
    }
    line
}

/// Human-readable report for a metadata document.
pub fn preview(document: &MetadataDocument) -> String {
    let mut out = String::new();
    let filters = &document.filters_applied;

    let _ = writeln!(out, "CleanMedia Processing Report for: {}", document.media_file);
    if let Some(subtitle) = &document.subtitle_file {
        let _ = writeln!(out, "Subtitles: {}", subtitle);
    }
    let _ = writeln!(
        out,
        "Processed At: {}",
        document.processed_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(duration) = document.duration_seconds {
        let _ = writeln!(out, "Duration: {}", format_timestamp(duration));
    }
    let _ = writeln!(
        out,
        "Filters Enabled: Profanity={}, Nudity={}, Violence={}",
        filters.profanity, filters.nudity, filters.violence
    );
    let _ = writeln!(out, "{}", "-".repeat(50));

    if document.segments.is_empty() {
        let _ = writeln!(out, "No actions.");
    }
    for segment in &document.segments {
        let _ = writeln!(out, "{}", preview_line(segment));
    }
    out
}

/// Output locations for one media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPaths {
    /// `<stem>.json`
    pub metadata: PathBuf,
    /// `<stem>_preview.txt`
    pub preview: PathBuf,
}

/// Deterministic output paths derived from the media file's base name.
pub fn metadata_paths(output_dir: &Path, media: &Path) -> MetadataPaths {
    let stem = media
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "media".to_string());
    MetadataPaths {
        metadata: output_dir.join(format!("{}.json", stem)),
        preview: output_dir.join(format!("{}_preview.txt", stem)),
    }
}

/// Write `contents` to `path` through a temporary file in the same directory.
///
/// Readers never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Write a metadata document as JSON.
pub fn write_document(path: &Path, document: &MetadataDocument) -> Result<()> {
    let json = document.to_json()?;
    write_atomic(path, json.as_bytes())?;
    tracing::debug!(path = %path.display(), segments = document.segments.len(), "Wrote metadata");
    Ok(())
}

/// Write the preview for a metadata document.
pub fn write_preview(path: &Path, document: &MetadataDocument) -> Result<()> {
    write_atomic(path, preview(document).as_bytes())
}

/// Read a metadata document. The file is opened read-only.
pub fn read_document(path: &Path) -> Result<MetadataDocument> {
    let json = std::fs::read_to_string(path)?;
    MetadataDocument::from_json(&json)
}

/// Read a metadata document and import its timeline.
pub fn load_timeline(path: &Path) -> Result<Timeline> {
    import(read_document(path)?)
}
