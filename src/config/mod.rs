pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    prepare(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./cleanmedia.toml",
        "~/.config/cleanmedia/config.toml",
        "/etc/cleanmedia/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    prepare(&mut config);
    Ok(config)
}

fn prepare(config: &mut Config) {
    let expanded = shellexpand::tilde(&config.output.metadata_dir.to_string_lossy()).into_owned();
    config.output.metadata_dir = expanded.into();

    let filter = &mut config.filters.profanity;
    filter.word_list = filter
        .word_list
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    filter.word_list.sort();
    filter.word_list.dedup();
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let filters = &config.filters;

    if filters.profanity.enabled && filters.profanity.replace_with.is_empty() {
        anyhow::bail!("Profanity filter is enabled but has an empty replace_with token");
    }

    for (name, threshold) in [
        ("nudity", filters.nudity.detection_threshold),
        ("violence", filters.violence.detection_threshold),
    ] {
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!(
                "Detection threshold for {} must be between 0 and 1 (got {})",
                name,
                threshold
            );
        }
    }

    if !(config.video.sample_interval_secs > 0.0) || !config.video.sample_interval_secs.is_finite()
    {
        anyhow::bail!(
            "Video sample interval must be positive (got {})",
            config.video.sample_interval_secs
        );
    }

    if !(config.timeline.merge_gap_secs >= 0.0) || !config.timeline.merge_gap_secs.is_finite() {
        anyhow::bail!(
            "Timeline merge gap cannot be negative (got {})",
            config.timeline.merge_gap_secs
        );
    }

    if config.playback.tick_ms == 0 {
        anyhow::bail!("Playback tick cannot be 0");
    }

    if !(config.playback.speed > 0.0) || !config.playback.speed.is_finite() {
        anyhow::bail!(
            "Playback speed must be positive (got {})",
            config.playback.speed
        );
    }

    if filters.profanity.enabled && filters.profanity.word_list.is_empty() {
        tracing::warn!("Profanity filter is enabled but the word list is empty");
    }

    Ok(())
}
