mod cli;

use cleanmedia::{
    config::{self, Config},
    playback::{
        session_duration, PlaybackController, PlaybackSession, SharedIndex, SimulatedClock,
        SimulatedPlayer,
    },
    processor::{Processor, ScanRequest},
};
use cleanmedia_timeline::export::{self, format_timestamp};
use cleanmedia_timeline::{Category, Timeline};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cleanmedia=debug,cleanmedia_timeline=debug".to_string()
        } else {
            "cleanmedia=info,cleanmedia_timeline=warn".to_string()
        }
    });

    // Reports go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan {
            video,
            subtitles,
            output_dir,
            duration,
            strict,
            simulate,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let request = ScanRequest {
                video,
                subtitles,
                output_dir,
                duration,
                strict,
            };
            scan_file(config, &request, simulate)
        }
        Commands::Batch {
            dir,
            output_dir,
            strict,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            batch(config, &dir, output_dir.as_deref(), strict)
        }
        Commands::Preview { metadata } => preview(&metadata),
        Commands::Play { metadata, speed } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let timeline = export::load_timeline(&metadata)
                .with_context(|| format!("Failed to load metadata: {:?}", metadata))?;
            let speed = speed.unwrap_or(config.playback.speed);
            if !(speed > 0.0) || !speed.is_finite() {
                anyhow::bail!("Playback speed must be positive (got {})", speed);
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(simulate(timeline, &config, speed))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::InitConfig { path, force } => init_config(&path, force),
        Commands::Version => {
            println!("cleanmedia {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn scan_file(config: Config, request: &ScanRequest, simulate_after: bool) -> Result<()> {
    let processor = Processor::new(Arc::new(config));
    let outcome = processor.scan(request)?;

    println!("File: {}", request.video.display());
    println!("Segments: {}", outcome.timeline.len());
    for category in Category::ALL {
        let count = outcome.timeline.count(category);
        if count > 0 {
            let secs: f64 = outcome
                .timeline
                .iter()
                .filter(|s| s.category == category)
                .map(|s| s.duration())
                .sum();
            println!("  {}: {} ({:.1}s)", category, count, secs);
        }
    }
    if outcome.rejected > 0 {
        println!("Rejected detections: {}", outcome.rejected);
    }
    println!("Metadata: {}", outcome.paths.metadata.display());
    println!("Preview: {}", outcome.paths.preview.display());
    if let Some(path) = &outcome.filtered_subtitles {
        println!("Filtered subtitles: {}", path.display());
    }

    if simulate_after {
        let speed = processor.config().playback.speed;
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(simulate(outcome.timeline, processor.config(), speed))?;
    }

    Ok(())
}

fn batch(config: Config, dir: &Path, output_dir: Option<&Path>, strict: bool) -> Result<()> {
    let processor = Processor::new(Arc::new(config));
    let report = processor.batch(dir, output_dir, strict)?;

    for (video, outcome) in &report.succeeded {
        println!(
            "✓ {} ({} segment(s))",
            video.display(),
            outcome.timeline.len()
        );
    }
    for (video, error) in &report.failed {
        println!("✗ {}: {:#}", video.display(), error);
    }

    println!(
        "\nProcessed {} file(s): {} succeeded, {} failed",
        report.total(),
        report.succeeded.len(),
        report.failed.len()
    );

    if !report.is_success() {
        anyhow::bail!("{} of {} file(s) failed", report.failed.len(), report.total());
    }

    Ok(())
}

fn preview(metadata: &Path) -> Result<()> {
    let document = export::read_document(metadata)
        .with_context(|| format!("Failed to read metadata: {:?}", metadata))?;
    export::import(document.clone())
        .with_context(|| format!("Invalid metadata: {:?}", metadata))?;

    print!("{}", export::preview(&document));
    Ok(())
}

async fn simulate(timeline: Timeline, config: &Config, speed: f64) -> Result<()> {
    let end_at = session_duration(&timeline);
    let controller = PlaybackController::new(
        SharedIndex::from_timeline(timeline),
        config.playback.audio_channel,
    );
    let session = PlaybackSession::new(
        controller,
        SimulatedClock::new(),
        Duration::from_millis(config.playback.tick_ms),
        speed,
        end_at,
    );

    println!(
        "\nSimulating playback of {} at {}x...",
        format_timestamp(end_at),
        speed
    );

    let (command_tx, command_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    let player = tokio::spawn(SimulatedPlayer::new().run(command_rx));
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let result = session.run(command_tx, shutdown_rx).await;
    interrupt.abort();
    let received = player.await?;

    for timed in &received {
        println!("[{}] {}", format_timestamp(timed.at), timed.command);
    }

    let summary = result?;
    println!(
        "Playback {} at {} ({} command(s))",
        if summary.interrupted {
            "interrupted"
        } else {
            "finished"
        },
        format_timestamp(summary.position),
        summary.commands
    );
    if let Some(next) = summary.next_action {
        println!("Next action at {}", format_timestamp(next));
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let filters = &config.filters;
    println!("  Metadata dir: {}", config.output.metadata_dir.display());
    println!(
        "  Profanity: {} ({} word(s), action {})",
        filters.profanity.enabled,
        filters.profanity.word_list.len(),
        filters.profanity.action
    );
    println!(
        "  Nudity: {} (threshold {}, action {})",
        filters.nudity.enabled, filters.nudity.detection_threshold, filters.nudity.action
    );
    println!(
        "  Violence: {} (threshold {}, action {})",
        filters.violence.enabled, filters.violence.detection_threshold, filters.violence.action
    );
    println!("  Strict: {}", config.timeline.strict);

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {:?} (use --force to overwrite)",
            path
        );
    }

    config::persist::save_config(path, &Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
