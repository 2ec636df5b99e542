//! # Pipeline
//!
//! One job = Extract, Apply, Assemble, Merge, strictly in that order, inside
//! a private staging directory that never outlives the job.
//!
//! ```rust,no_run
//! use sketch_video::{Config, Orchestrator};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let orchestrator = Orchestrator::new(Config::default());
//! let report = orchestrator.process("holiday.mp4", "holiday_sketch.mp4", "sketch").await?;
//! println!("{} frames at {} fps", report.frame_count, report.target_frame_rate);
//! # Ok(())
//! # }
//! ```

pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod state;

pub use job::{CancelToken, JobContext, StagingArea};
pub use orchestrator::{AudioOutcome, ExtractionSummary, JobHandle, JobReport, Orchestrator};
pub use progress::{ProgressCallback, ProgressUpdate};
pub use state::{JobStage, JobState};
