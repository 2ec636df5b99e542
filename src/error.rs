use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::pipeline::JobStage;

/// Main error type for the sketch-video library
#[derive(Error, Debug)]
pub enum SketchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {path}: {source}")]
    PathIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Codec error: {reason}")]
    Codec { reason: String },

    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Frame {index} changed resolution: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: crate::video::Resolution,
        actual: crate::video::Resolution,
    },

    #[error("Frame count mismatch: expected {expected}, got {actual}")]
    FrameCountMismatch { expected: usize, actual: usize },

    #[error("Unknown filter: {id}")]
    UnknownFilter { id: String },

    #[error("No audio track in {path}")]
    NoAudioTrack { path: String },

    #[error("Job cancelled")]
    Cancelled,

    #[error("Invalid argument: {details}")]
    InvalidArgument { details: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job {job_id} failed while {stage}: {source}")]
    Job {
        job_id: String,
        stage: JobStage,
        #[source]
        source: Box<SketchError>,
    },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// The failure taxonomy callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Codec,
    DimensionMismatch,
    FrameCountMismatch,
    UnknownFilter,
    NoAudioTrack,
    Cancelled,
    InvalidArgument,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "io",
            Self::Codec => "codec",
            Self::DimensionMismatch => "dimension-mismatch",
            Self::FrameCountMismatch => "frame-count-mismatch",
            Self::UnknownFilter => "unknown-filter",
            Self::NoAudioTrack => "no-audio-track",
            Self::Cancelled => "cancelled",
            Self::InvalidArgument => "invalid-argument",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// Convenience type alias for Results using SketchError
pub type Result<T> = std::result::Result<T, SketchError>;

impl SketchError {
    /// Attach a path to an IO error
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::PathIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn codec<S: Into<String>>(reason: S) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(details: S) -> Self {
        Self::InvalidArgument {
            details: details.into(),
        }
    }

    /// Classify this error, looking through job wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::PathIo { .. } => ErrorKind::Io,
            Self::Codec { .. } | Self::Tool { .. } => ErrorKind::Codec,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::FrameCountMismatch { .. } => ErrorKind::FrameCountMismatch,
            Self::UnknownFilter { .. } => ErrorKind::UnknownFilter,
            Self::NoAudioTrack { .. } => ErrorKind::NoAudioTrack,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Config(_) => ErrorKind::Config,
            Self::Job { source, .. } => source.kind(),
        }
    }

    /// The pipeline stage this error was raised in, if it came out of a job
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            Self::Job { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownFilter { id } => {
                format!(
                    "Filter '{}' not found. Run `sketch-video filters` to list the available filters.",
                    id
                )
            }
            Self::NoAudioTrack { path } => {
                format!("'{}' has no audio track to merge.", path)
            }
            Self::Tool { tool, .. } => {
                format!(
                    "'{}' failed. Please check that FFmpeg is installed and the input is a supported video.",
                    tool
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Job { stage, source, .. } => {
                format!("Failed while {}: {}", stage, source.user_message())
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_reports_inner_kind_and_stage() {
        let err = SketchError::Job {
            job_id: "abc".to_string(),
            stage: JobStage::Filtering,
            source: Box::new(SketchError::UnknownFilter {
                id: "nonexistent".to_string(),
            }),
        };

        assert_eq!(err.kind(), ErrorKind::UnknownFilter);
        assert_eq!(err.stage(), Some(JobStage::Filtering));
        assert!(err.user_message().contains("nonexistent"));
    }

    #[test]
    fn test_tool_failure_is_codec_error() {
        let err = SketchError::Tool {
            tool: "ffmpeg".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "Invalid data found when processing input".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn test_io_errors_share_a_kind() {
        let plain: SketchError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        let with_path = SketchError::io("/tmp/x", std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(plain.kind(), ErrorKind::Io);
        assert_eq!(with_path.kind(), ErrorKind::Io);
        assert!(with_path.to_string().contains("/tmp/x"));
    }
}
