//! hwplay - play a video file or stream in a window

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use hwplay::display::{Display, PlayerWindow};
use hwplay::telemetry::{init_logging, LogConfig};
use hwplay::{video, PlaybackOrchestrator, PlayerSettings, ScalingAlgorithm, SettingsError};

#[derive(Parser, Debug)]
#[command(name = "hwplay", version)]
#[command(about = "Hardware-accelerated video player with software fallback")]
struct Args {
    /// Video file path or URL
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Decode in software even when an accelerator is available
    #[arg(long)]
    software: bool,

    /// Pixel conversion filter
    #[arg(long, value_enum)]
    scaling: Option<ScalingAlgorithm>,

    /// Log level or filter directive (e.g. "debug")
    #[arg(long)]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_config: bool,
}

/// Settings plus a default-file error to report once logging is up
fn load_settings(path: Option<&Path>) -> anyhow::Result<(PlayerSettings, Option<SettingsError>)> {
    match path {
        Some(path) => PlayerSettings::load_from_file(path)
            .map(|settings| (settings, None))
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(match PlayerSettings::load() {
            Ok(settings) => (settings, None),
            Err(e) => (PlayerSettings::default(), Some(e)),
        }),
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let (mut settings, settings_error) = load_settings(args.config.as_deref())?;
    if args.software {
        settings.prefer_hardware = false;
    }
    if let Some(scaling) = args.scaling {
        settings.scaling = scaling;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }

    let log_config = LogConfig {
        file_path: args.log_file,
        json_format: args.log_json,
        default_level: settings.log_level.clone(),
    };
    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("hwplay v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = settings_error {
        tracing::warn!("Ignoring settings file, using defaults: {}", e);
    }

    if args.save_config {
        match &args.config {
            Some(path) => settings.save_to_file(path)?,
            None => settings.save()?,
        }
        tracing::info!("Saved settings");
    }

    video::init().context("failed to initialize FFmpeg")?;

    let mut session = video::open_session(&args.source, &settings.session_options())?;
    tracing::info!("Decoding {} with {}", args.source, session.kind());

    let title = match Path::new(&args.source).file_name() {
        Some(name) => format!("{} - {}", settings.window_title, name.to_string_lossy()),
        None => settings.window_title.clone(),
    };
    let mut window = PlayerWindow::new(&title, settings.window_scale)?;
    let mut display = Display::new(window.window())?;

    let summary = PlaybackOrchestrator::new().run(session.as_mut(), &mut window, &mut display)?;
    tracing::info!("Finished ({:?}): {}", summary.reason, summary.stats);

    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
