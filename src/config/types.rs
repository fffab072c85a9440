use cleanmedia_timeline::{Action, FiltersApplied, Policy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub filters: FiltersConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Config {
    /// Build the timeline policy for this configuration.
    ///
    /// Media duration is per file, so callers set it on the returned policy.
    pub fn policy(&self) -> Policy {
        let mut policy = Policy::default()
            .strict(self.timeline.strict)
            .merge_gap(self.timeline.merge_gap_secs);

        for (raw, action) in &self.timeline.aliases {
            policy.aliases.insert(raw.to_lowercase(), *action);
        }

        policy
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory for metadata and preview files
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,

    /// Also write a censored copy of the scanned subtitles
    #[serde(default = "default_true")]
    pub write_filtered_subtitles: bool,
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("movie/metadata")
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            write_filtered_subtitles: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub profanity: ProfanityFilter,

    #[serde(default)]
    pub nudity: NudityFilter,

    #[serde(default)]
    pub violence: ViolenceFilter,
}

impl FiltersConfig {
    /// Which filters are switched on.
    pub fn applied(&self) -> FiltersApplied {
        FiltersApplied {
            profanity: self.profanity.enabled,
            nudity: self.nudity.enabled,
            violence: self.violence.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfanityFilter {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Words matched case-insensitively on word boundaries
    #[serde(default = "default_word_list")]
    pub word_list: Vec<String>,

    /// Token substituted for matched words
    #[serde(default = "default_replace_with")]
    pub replace_with: String,

    /// Action suggested for each match
    #[serde(default = "default_profanity_action")]
    pub action: String,
}

fn default_word_list() -> Vec<String> {
    ["damn", "hell", "shit", "fuck", "bitch", "ass"]
        .iter()
        .map(|w| w.to_string())
        .collect()
}

fn default_replace_with() -> String {
    "[censored]".to_string()
}

fn default_profanity_action() -> String {
    "mute_audio".to_string()
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self {
            enabled: true,
            word_list: default_word_list(),
            replace_with: default_replace_with(),
            action: default_profanity_action(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NudityFilter {
    #[serde(default)]
    pub enabled: bool,

    /// Minimum frame score that counts as a detection
    #[serde(default = "default_nudity_threshold")]
    pub detection_threshold: f64,

    #[serde(default = "default_nudity_action")]
    pub action: String,
}

fn default_nudity_threshold() -> f64 {
    0.75
}

fn default_nudity_action() -> String {
    "blur_region".to_string()
}

impl Default for NudityFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            detection_threshold: default_nudity_threshold(),
            action: default_nudity_action(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ViolenceFilter {
    #[serde(default)]
    pub enabled: bool,

    /// Minimum frame score that counts as a detection
    #[serde(default = "default_violence_threshold")]
    pub detection_threshold: f64,

    #[serde(default = "default_violence_action")]
    pub action: String,
}

fn default_violence_threshold() -> f64 {
    0.65
}

fn default_violence_action() -> String {
    "skip_scene".to_string()
}

impl Default for ViolenceFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            detection_threshold: default_violence_threshold(),
            action: default_violence_action(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TimelineConfig {
    /// Abort the build when any detection is invalid
    #[serde(default)]
    pub strict: bool,

    /// Merge same-category segments separated by at most this many seconds
    #[serde(default)]
    pub merge_gap_secs: f64,

    /// Extra raw action spellings, e.g. `pixelate = "skip"`
    #[serde(default)]
    pub aliases: BTreeMap<String, Action>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Seconds covered by one frame sample
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: f64,
}

fn default_sample_interval() -> f64 {
    1.0
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Simulated clock resolution in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Playback speed multiplier
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Audio channel muted for profanity
    #[serde(default)]
    pub audio_channel: u32,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_speed() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            speed: default_speed(),
            audio_channel: 0,
        }
    }
}
