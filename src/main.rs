use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sketch_video::{
    config::Config,
    filters::FilterId,
    pipeline::{AudioOutcome, JobState, Orchestrator, ProgressUpdate},
    SketchError,
};

#[derive(Parser)]
#[command(
    name = "sketch-video",
    version,
    about = "Apply sketch and cartoon filters to whole videos",
    long_about = "Sketch-Video samples a video into frames, filters every frame, re-encodes them to the source's exact duration and puts the original audio back."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the whole pipeline on one video
    Process {
        input: PathBuf,
        output: PathBuf,

        /// Filter to apply (see `sketch-video filters`)
        #[arg(short, long, default_value = "sketch")]
        filter: String,
    },

    /// Sample a video into numbered frames
    Extract {
        input: PathBuf,
        output_dir: PathBuf,

        /// Sampling rate in frames per second
        #[arg(long, default_value_t = 3.0)]
        fps: f64,
    },

    /// Filter a directory of extracted frames and encode them to a silent video
    Apply {
        frames_dir: PathBuf,
        output: PathBuf,

        #[arg(short, long)]
        filter: String,

        /// Length of the resulting video in seconds
        #[arg(long)]
        duration: f64,

        /// Rate the frames were sampled at
        #[arg(long)]
        fps: f64,
    },

    /// Put the audio of one file onto the picture of another
    Merge {
        video: PathBuf,
        audio_source: PathBuf,
        output: PathBuf,
    },

    /// List the available filters
    Filters,

    /// Write the default configuration to a file
    InitConfig { path: PathBuf },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path).map_err(|e| anyhow!(e.user_message()))
        }
        None => {
            debug!("Using default configuration");
            Ok(Config::default())
        }
    }
}

/// Frame files in `dir`, in sequence order
fn collect_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("frame_"))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

fn log_progress(update: &ProgressUpdate) {
    if update.state == JobState::Filtering {
        debug!("{:>5.1}% {}", update.fraction * 100.0, update.message);
    } else {
        info!("{:>5.1}% {}", update.fraction * 100.0, update.message);
    }
}

fn friendly(e: SketchError) -> anyhow::Error {
    anyhow!(e.user_message())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Process {
            input,
            output,
            filter,
        } => {
            info!("Starting Sketch-Video v{}", env!("CARGO_PKG_VERSION"));
            let orchestrator = Arc::new(Orchestrator::new(config).with_progress(Arc::new(log_progress)));

            let handle = orchestrator.spawn(input, output, filter);
            let cancel = handle.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling job...");
                    cancel.cancel();
                }
            });

            let report = handle.wait().await.map_err(friendly)?;
            if report.reused_existing_output {
                info!("Output already existed: {:?}", report.output);
                return Ok(());
            }

            let audio = match report.audio {
                AudioOutcome::Merged { fit } => format!("audio {}", fit),
                AudioOutcome::MissingCopiedVideo => "no audio in source".to_string(),
                AudioOutcome::Skipped => "audio skipped".to_string(),
            };
            info!(
                "Done in {:.1}s: {} frames at {} fps, {:.3}s, {}. Output saved to: {:?}",
                report.elapsed().num_milliseconds() as f64 / 1000.0,
                report.frame_count,
                report.target_frame_rate,
                report.duration_seconds,
                audio,
                report.output
            );
        }

        Command::Extract {
            input,
            output_dir,
            fps,
        } => {
            let summary = Orchestrator::new(config)
                .extract_frames(&input, &output_dir, fps)
                .map_err(friendly)?;
            info!(
                "Extracted {} frames ({}) at {} fps covering {:.3}s into {:?}",
                summary.frame_count, summary.resolution, summary.actual_fps, summary.duration_seconds, output_dir
            );
        }

        Command::Apply {
            frames_dir,
            output,
            filter,
            duration,
            fps,
        } => {
            let frames = collect_frames(&frames_dir)?;
            let video = Orchestrator::new(config)
                .apply_filter_to_frames(&frames, &output, &filter, frames.len(), duration, fps)
                .map_err(friendly)?;
            info!(
                "Wrote {:?}: {} frames, {:.3}s{}",
                video.path,
                video.frame_count,
                video.duration_seconds,
                if video.stretched { " (retimed)" } else { "" }
            );
        }

        Command::Merge {
            video,
            audio_source,
            output,
        } => {
            let result = Orchestrator::new(config)
                .merge_audio_with_video(&video, &audio_source, &output)
                .map_err(friendly)?;
            if !result.success {
                return Err(anyhow!("merge produced an empty file: {:?}", result.output_path));
            }
            info!("Wrote {:?} ({})", result.output_path, result.audio_fit);
        }

        Command::Filters => {
            for id in FilterId::ALL {
                println!("{:<18} {}", id.as_str(), id.description());
            }
        }

        Command::InitConfig { path } => {
            config.save_to_file(&path).map_err(friendly)?;
            info!("Wrote configuration to {:?}", path);
        }
    }

    Ok(())
}
