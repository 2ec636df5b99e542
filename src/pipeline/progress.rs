use std::sync::Arc;

use super::state::JobState;

/// A progress notification for one job
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub job_id: String,
    pub state: JobState,
    /// Overall completion, 0.0 to 1.0
    pub fraction: f64,
    pub message: String,
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Turns per-stage progress into overall job progress
#[derive(Clone)]
pub(crate) struct ProgressReporter {
    job_id: String,
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub(crate) fn new(job_id: &str, callback: Option<ProgressCallback>) -> Self {
        Self {
            job_id: job_id.to_string(),
            callback,
        }
    }

    /// Report `within` (0.0 to 1.0) of the way through `state`
    pub(crate) fn report(&self, state: JobState, within: f64, message: impl Into<String>) {
        let Some(callback) = &self.callback else {
            return;
        };
        let (start, end) = state.progress_span();
        callback(&ProgressUpdate {
            job_id: self.job_id.clone(),
            state,
            fraction: start + (end - start) * within.clamp(0.0, 1.0),
            message: message.into(),
        });
    }
}
