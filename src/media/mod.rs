//! # Media Backend
//!
//! Decode, encode and mux are treated as a service. The pipeline only talks
//! to the [`MediaBackend`] trait; [`FfmpegBackend`] implements it by driving
//! the `ffmpeg` and `ffprobe` executables.

mod ffmpeg;
mod probe;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::AudioFit;
use crate::config::{AudioConfig, EncodingConfig, FrameFormat};
use crate::error::Result;
use crate::video::{FrameNaming, PresentationSchedule, Resolution, SamplingPlan};

pub use ffmpeg::FfmpegBackend;
pub use probe::parse_probe_output;

/// Stream layout of a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// Container duration in seconds
    pub duration_seconds: f64,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub codec: String,
    pub frame_rate: f64,
    pub resolution: Resolution,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub duration_seconds: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

impl MediaInfo {
    /// Video stream duration, falling back to the container's
    pub fn video_duration(&self) -> Option<f64> {
        self.video
            .as_ref()
            .map(|v| v.duration_seconds.unwrap_or(self.duration_seconds))
    }

    /// Audio stream duration, falling back to the container's
    pub fn audio_duration(&self) -> Option<f64> {
        self.audio
            .as_ref()
            .map(|a| a.duration_seconds.unwrap_or(self.duration_seconds))
    }
}

/// Write `plan.frame_count` frames of `source` using `naming`
#[derive(Debug, Clone)]
pub struct DecodeRequest<'a> {
    pub source: &'a Path,
    pub plan: &'a SamplingPlan,
    pub naming: &'a FrameNaming,
    /// Output size when frames should be downscaled
    pub scale_to: Option<Resolution>,
    pub format: FrameFormat,
    pub jpeg_quality: u8,
}

/// Encode still frames into a silent video with the given timing
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    pub frames: &'a [PathBuf],
    pub schedule: &'a PresentationSchedule,
    pub output: &'a Path,
    pub encoding: &'a EncodingConfig,
    /// Pad odd frame sides up to the next even number
    pub pad_to_even: bool,
    /// Directory for the encoder's temporary files
    pub scratch_dir: &'a Path,
}

/// Copy the video stream of `video` and add the first audio stream of
/// `audio_source`, trimmed or padded to `duration_seconds`
#[derive(Debug, Clone)]
pub struct MuxRequest<'a> {
    pub video: &'a Path,
    pub audio_source: &'a Path,
    pub output: &'a Path,
    pub duration_seconds: f64,
    pub fit: AudioFit,
    pub audio: &'a AudioConfig,
}

/// Decode/encode/mux service used by the pipeline stages
pub trait MediaBackend: Send + Sync {
    /// Describe the streams of a media file
    fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Decode sampled frames to disk, returning how many files were written
    fn decode_frames(&self, request: &DecodeRequest<'_>) -> Result<usize>;

    /// Encode frames into `request.output`
    fn encode_frames(&self, request: &EncodeRequest<'_>) -> Result<()>;

    /// Mux audio into a video without re-encoding the video stream
    fn mux_audio(&self, request: &MuxRequest<'_>) -> Result<()>;
}
