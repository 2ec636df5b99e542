use std::fmt;

use serde::{Deserialize, Serialize};

/// The working stages of a job, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStage {
    Extracting,
    Filtering,
    Assembling,
    Merging,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracting => "extracting",
            Self::Filtering => "filtering",
            Self::Assembling => "assembling",
            Self::Merging => "merging",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one pipeline job
///
/// ```text
/// Idle -> Extracting -> Filtering -> Assembling -> Merging -> Done
///            \______________\_____________\____________\-> Failed { stage }
/// any non-terminal state -> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum JobState {
    Idle,
    Extracting,
    Filtering,
    Assembling,
    Merging,
    Done,
    Failed { stage: JobStage },
    Cancelled,
}

impl JobState {
    /// The stage a working state belongs to
    pub fn stage(&self) -> Option<JobStage> {
        match self {
            Self::Extracting => Some(JobStage::Extracting),
            Self::Filtering => Some(JobStage::Filtering),
            Self::Assembling => Some(JobStage::Assembling),
            Self::Merging => Some(JobStage::Merging),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. } | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (*self, next) {
            (Self::Idle, Self::Extracting)
            | (Self::Extracting, Self::Filtering)
            | (Self::Filtering, Self::Assembling)
            | (Self::Assembling, Self::Merging)
            | (Self::Merging, Self::Done) => true,
            // an existing output short-circuits the whole job
            (Self::Idle, Self::Done) => true,
            (current, Self::Failed { stage }) => current.stage() == Some(stage),
            (current, Self::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Share of overall progress covered by this state, as `(start, end)`
    pub fn progress_span(&self) -> (f64, f64) {
        match self {
            Self::Idle => (0.0, 0.0),
            Self::Extracting => (0.0, 0.3),
            Self::Filtering => (0.3, 0.8),
            Self::Assembling => (0.8, 0.9),
            Self::Merging => (0.9, 1.0),
            Self::Done => (1.0, 1.0),
            Self::Failed { .. } | Self::Cancelled => (0.0, 0.0),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Extracting => f.write_str("extracting"),
            Self::Filtering => f.write_str("filtering"),
            Self::Assembling => f.write_str("assembling"),
            Self::Merging => f.write_str("merging"),
            Self::Done => f.write_str("done"),
            Self::Failed { stage } => write!(f, "failed while {}", stage),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}
