//! # Sketch-Video
//!
//! Turn a video into a moving sketch, cartoon or ink drawing.
//!
//! A job samples the source into still frames, runs one filter over every
//! frame in parallel, re-encodes the frames so the result lasts exactly as
//! long as the source, then puts the original audio back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() {
//! let ok = sketch_video::api::process_video_with_filter("beach.mp4", "beach_sketch.mp4", "sketch").await;
//! assert!(ok);
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`filters`] - the closed catalog of still-image filters
//! - [`media`] - decode/encode/mux service (ffmpeg-backed)
//! - [`video`] - frame extraction, filtering and assembly
//! - [`audio`] - audio re-attachment
//! - [`pipeline`] - job orchestration, cancellation and cleanup
//! - [`config`] - configuration management
//!
//! ## Single images
//!
//! ```rust,no_run
//! use sketch_video::apply_named_filter;
//!
//! # fn main() -> anyhow::Result<()> {
//! let photo = image::open("portrait.jpg")?.to_rgb8();
//! apply_named_filter(&photo, "ink-pen")?.save("portrait_ink.png")?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod filters;
pub mod media;
pub mod pipeline;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{ErrorKind, Result, SketchError},
    filters::{apply_named_filter, FilterId},
    media::{FfmpegBackend, MediaBackend},
    pipeline::{CancelToken, JobReport, JobState, Orchestrator},
};
