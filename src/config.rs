use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for sketch-video
///
/// Every section has defaults, so a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame extraction settings
    pub extraction: ExtractionConfig,

    /// Per-frame filtering settings
    pub filtering: FilteringConfig,

    /// Video encoding settings
    pub encoding: EncodingConfig,

    /// Audio merge settings
    pub audio: AudioConfig,

    /// External tool locations
    pub tools: ToolsConfig,

    /// Where jobs stage intermediate files
    pub staging: StagingConfig,

    /// Orchestrator behaviour
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        self.filtering.validate()?;
        self.encoding.validate()?;
        self.audio.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Image format used for staged frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Png,
    Jpeg,
}

impl FrameFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Frame extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fixed sampling rate for full-pipeline jobs. When unset, the rate is
    /// derived from the source and capped at `derived_fps_cap`.
    pub target_fps: Option<f64>,

    /// Upper bound for a derived sampling rate
    pub derived_fps_cap: f64,

    /// Hard upper bound for any requested sampling rate
    pub max_fps: f64,

    /// Downscale frames so neither side exceeds this many pixels
    pub max_dimension: Option<u32>,

    /// Staged frame image format
    pub frame_format: FrameFormat,

    /// JPEG quality (1-100) when `frame_format = "jpeg"`
    pub jpeg_quality: u8,

    /// How many missing tail frames may be filled with the last decoded frame
    pub max_tail_padding: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_fps: None,
            derived_fps_cap: 30.0,
            max_fps: 120.0,
            max_dimension: None,
            frame_format: FrameFormat::Png,
            jpeg_quality: 85,
            max_tail_padding: 2,
        }
    }
}

impl ExtractionConfig {
    /// Sampling rate for a job whose source runs at `source_fps`
    pub fn derive_target_fps(&self, source_fps: f64) -> f64 {
        match self.target_fps {
            Some(fps) => fps,
            None if source_fps.is_finite() && source_fps > 0.0 => {
                source_fps.min(self.derived_fps_cap)
            }
            None => self.derived_fps_cap,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(fps) = self.target_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(invalid("extraction.target_fps", fps).into());
            }
        }

        if !self.derived_fps_cap.is_finite() || self.derived_fps_cap <= 0.0 {
            return Err(invalid("extraction.derived_fps_cap", self.derived_fps_cap).into());
        }

        if !self.max_fps.is_finite() || self.max_fps <= 0.0 {
            return Err(invalid("extraction.max_fps", self.max_fps).into());
        }

        if let Some(dimension) = self.max_dimension {
            if dimension < 2 {
                return Err(invalid("extraction.max_dimension", dimension).into());
            }
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("extraction.jpeg_quality", self.jpeg_quality).into());
        }

        Ok(())
    }
}

/// Per-frame filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    /// Number of frames filtered concurrently
    pub workers: usize,

    /// Report progress every N completed frames
    pub progress_interval: usize,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            progress_interval: 3,
        }
    }
}

impl FilteringConfig {
    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(invalid("filtering.workers", self.workers).into());
        }

        if self.progress_interval == 0 {
            return Err(invalid("filtering.progress_interval", self.progress_interval).into());
        }

        Ok(())
    }
}

/// Video encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// FFmpeg video encoder name
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Output pixel format
    pub pixel_format: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            quality: 85,
            pixel_format: "yuv420p".to_string(),
        }
    }
}

impl EncodingConfig {
    /// Map 0-100 quality onto x264's CRF scale (0 best, 51 worst)
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality.min(100) as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }

    /// Whether the encoder needs even frame dimensions
    pub fn requires_even_dimensions(&self) -> bool {
        self.pixel_format == "yuv420p" || self.codec.contains("264") || self.codec.contains("265")
    }

    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(invalid("encoding.codec", &self.codec).into());
        }

        if self.quality > 100 {
            return Err(invalid("encoding.quality", self.quality).into());
        }

        Ok(())
    }
}

/// What a full-pipeline job does when the source has no audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingAudioPolicy {
    /// Use the silent assembled video as the output
    CopyVideo,
    /// Fail the job with `NoAudioTrack`
    Fail,
}

/// Audio merge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFmpeg audio encoder name
    pub codec: String,

    /// Audio bitrate in kbit/s
    pub bitrate_kbps: u32,

    pub on_missing: MissingAudioPolicy,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: "aac".to_string(),
            bitrate_kbps: 192,
            on_missing: MissingAudioPolicy::CopyVideo,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(invalid("audio.codec", &self.codec).into());
        }

        if self.bitrate_kbps == 0 {
            return Err(invalid("audio.bitrate_kbps", self.bitrate_kbps).into());
        }

        Ok(())
    }
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Staging area configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Parent directory for per-job staging directories
    pub root: Option<PathBuf>,
}

impl StagingConfig {
    pub fn resolved_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("sketch-video"))
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Treat an already existing output file as the finished result
    pub reuse_existing_output: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sketch.toml");

        let mut original = Config::default();
        original.extraction.target_fps = Some(12.0);
        original.audio.on_missing = MissingAudioPolicy::Fail;

        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded.extraction.target_fps, Some(12.0));
        assert_eq!(loaded.audio.on_missing, MissingAudioPolicy::Fail);
        assert_eq!(loaded.encoding.codec, original.encoding.codec);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(
            &file_path,
            "[extraction]\nframe_format = \"jpeg\"\n\n[audio]\non_missing = \"fail\"\n",
        )
        .unwrap();

        let loaded = Config::from_file(&file_path).unwrap();
        assert_eq!(loaded.extraction.frame_format, FrameFormat::Jpeg);
        assert_eq!(loaded.extraction.max_fps, 120.0);
        assert_eq!(loaded.audio.on_missing, MissingAudioPolicy::Fail);
        assert_eq!(loaded.audio.codec, "aac");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_invalid_target_fps() {
        let mut config = Config::default();
        config.extraction.target_fps = Some(0.0);
        assert!(config.validate().is_err());

        config.extraction.target_fps = Some(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default();
        config.filtering.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_target_fps() {
        let extraction = ExtractionConfig::default();
        assert_eq!(extraction.derive_target_fps(24.0), 24.0);
        assert_eq!(extraction.derive_target_fps(60.0), 30.0);
        assert_eq!(extraction.derive_target_fps(0.0), 30.0);

        let fixed = ExtractionConfig {
            target_fps: Some(3.0),
            ..ExtractionConfig::default()
        };
        assert_eq!(fixed.derive_target_fps(60.0), 3.0);
    }

    #[test]
    fn test_quality_to_crf() {
        let mut encoding = EncodingConfig::default();
        encoding.quality = 100;
        assert_eq!(encoding.crf(), 0);
        encoding.quality = 0;
        assert_eq!(encoding.crf(), 51);
    }
}
