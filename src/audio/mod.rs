//! # Audio Module
//!
//! Re-attaches a source's audio to a filtered, silent video.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sketch_video::audio::AudioMerger;
//! use sketch_video::config::AudioConfig;
//! use sketch_video::media::FfmpegBackend;
//!
//! # fn main() -> anyhow::Result<()> {
//! let merger = AudioMerger::new(Arc::new(FfmpegBackend::default()), AudioConfig::default());
//! let result = merger.merge("sketched.mp4", "holiday.mp4", "final.mp4")?;
//! println!("Audio fit: {}", result.audio_fit);
//! # Ok(())
//! # }
//! ```

pub mod merger;

pub use merger::{AudioFit, AudioMerger, AudioTrack, MergeResult, AUDIO_FIT_TOLERANCE};
