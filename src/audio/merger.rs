use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AudioConfig;
use crate::error::{Result, SketchError};
use crate::media::{MediaBackend, MediaInfo, MuxRequest};

/// Audio and video durations closer than this are treated as equal (10 ms)
pub const AUDIO_FIT_TOLERANCE: f64 = 0.010;

/// The audio stream taken from a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub codec: String,
}

impl AudioTrack {
    /// The first audio stream of a probed file, if any
    pub fn from_info(info: &MediaInfo) -> Option<Self> {
        let stream = info.audio.as_ref()?;
        Some(Self {
            path: info.path.clone(),
            duration_seconds: info.audio_duration().unwrap_or(info.duration_seconds),
            codec: stream.codec.clone(),
        })
    }
}

/// How the audio must be adjusted to match the video's length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AudioFit {
    Exact,
    /// Audio is longer; the tail is cut
    Trim { excess_seconds: f64 },
    /// Audio is shorter; silence is appended
    Pad { missing_seconds: f64 },
}

impl AudioFit {
    pub fn between(audio_duration: f64, video_duration: f64, tolerance: f64) -> Self {
        let difference = audio_duration - video_duration;
        if difference > tolerance {
            Self::Trim {
                excess_seconds: difference,
            }
        } else if difference < -tolerance {
            Self::Pad {
                missing_seconds: -difference,
            }
        } else {
            Self::Exact
        }
    }
}

impl fmt::Display for AudioFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Trim { excess_seconds } => write!(f, "trimmed {:.3}s", excess_seconds),
            Self::Pad { missing_seconds } => write!(f, "padded {:.3}s of silence", missing_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub output_path: PathBuf,
    pub success: bool,
    pub audio_fit: AudioFit,
    pub audio: AudioTrack,
    pub video_duration_seconds: f64,
}

/// Muxes a source's audio into a silent video, matched to the video's length
pub struct AudioMerger {
    backend: Arc<dyn MediaBackend>,
    config: AudioConfig,
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SketchError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
        ))
    }
}

impl AudioMerger {
    pub fn new(backend: Arc<dyn MediaBackend>, config: AudioConfig) -> Self {
        Self { backend, config }
    }

    /// Probe `audio_source_path` for an audio stream
    pub fn audio_track<P: AsRef<Path>>(&self, audio_source_path: P) -> Result<Option<AudioTrack>> {
        let path = audio_source_path.as_ref();
        require_file(path)?;
        Ok(AudioTrack::from_info(&self.backend.probe(path)?))
    }

    pub fn merge<P, Q, R>(&self, video_path: P, audio_source_path: Q, output_path: R) -> Result<MergeResult>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let video_path = video_path.as_ref();
        let audio_source_path = audio_source_path.as_ref();
        let output_path = output_path.as_ref();

        require_file(video_path)?;
        require_file(audio_source_path)?;

        let video_info = self.backend.probe(video_path)?;
        let video_duration = video_info
            .video_duration()
            .ok_or_else(|| SketchError::codec(format!("{} has no video stream", video_path.display())))?;

        let audio = AudioTrack::from_info(&self.backend.probe(audio_source_path)?).ok_or_else(|| {
            SketchError::NoAudioTrack {
                path: audio_source_path.display().to_string(),
            }
        })?;

        let audio_fit = AudioFit::between(audio.duration_seconds, video_duration, AUDIO_FIT_TOLERANCE);
        debug!(
            "Audio {:.3}s vs video {:.3}s: {}",
            audio.duration_seconds, video_duration, audio_fit
        );

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SketchError::io(parent, e))?;
        }

        self.backend.mux_audio(&MuxRequest {
            video: video_path,
            audio_source: audio_source_path,
            output: output_path,
            duration_seconds: video_duration,
            fit: audio_fit,
            audio: &self.config,
        })?;

        let success = std::fs::metadata(output_path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);

        info!(
            "Merged {} audio into {} ({})",
            audio.codec,
            output_path.display(),
            audio_fit
        );

        Ok(MergeResult {
            output_path: output_path.to_path_buf(),
            success,
            audio_fit,
            audio,
            video_duration_seconds: video_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longer_audio_is_trimmed() {
        assert_eq!(
            AudioFit::between(13.0, 10.0, AUDIO_FIT_TOLERANCE),
            AudioFit::Trim { excess_seconds: 3.0 }
        );
    }

    #[test]
    fn test_shorter_audio_is_padded() {
        assert_eq!(
            AudioFit::between(8.0, 10.0, AUDIO_FIT_TOLERANCE),
            AudioFit::Pad { missing_seconds: 2.0 }
        );
    }

    #[test]
    fn test_near_equal_is_exact() {
        assert_eq!(AudioFit::between(10.005, 10.0, AUDIO_FIT_TOLERANCE), AudioFit::Exact);
        assert_eq!(AudioFit::between(9.995, 10.0, AUDIO_FIT_TOLERANCE), AudioFit::Exact);
    }

    #[test]
    fn test_fit_display() {
        assert_eq!(AudioFit::Trim { excess_seconds: 3.0 }.to_string(), "trimmed 3.000s");
    }
}
