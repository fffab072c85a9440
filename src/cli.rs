use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cleanmedia")]
#[command(author, version, about = "Filter profanity, nudity and violence from media playback")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a video and write its filter metadata
    Scan {
        /// Video file to scan
        #[arg(required = true)]
        video: PathBuf,

        /// Subtitle file (defaults to a sibling .srt file)
        #[arg(short, long)]
        subtitles: Option<PathBuf>,

        /// Directory for metadata and preview files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Media duration in seconds, used to clamp segments
        #[arg(long)]
        duration: Option<f64>,

        /// Fail if any detection is invalid
        #[arg(long)]
        strict: bool,

        /// Simulate filtered playback after scanning
        #[arg(long)]
        simulate: bool,
    },

    /// Scan every video in a directory
    Batch {
        /// Directory to walk
        #[arg(required = true)]
        dir: PathBuf,

        /// Directory for metadata and preview files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Fail a file if any of its detections is invalid
        #[arg(long)]
        strict: bool,
    },

    /// Print the preview for a metadata file
    Preview {
        /// Metadata file written by scan
        #[arg(required = true)]
        metadata: PathBuf,
    },

    /// Simulate filtered playback of a metadata file
    Play {
        /// Metadata file written by scan
        #[arg(required = true)]
        metadata: PathBuf,

        /// Playback speed multiplier (overrides config)
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Where to write the config
        #[arg(default_value = "cleanmedia.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}
