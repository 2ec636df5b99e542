//! Free-function entry points using the default configuration and the
//! ffmpeg-backed media service.
//!
//! Use [`Orchestrator`] directly for a custom [`Config`] or backend.

use std::path::{Path, PathBuf};

use crate::audio::MergeResult;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{ExtractionSummary, Orchestrator};
use crate::video::AssembledVideo;

pub use crate::filters::apply_named_filter;

fn default_orchestrator() -> Orchestrator {
    Orchestrator::new(Config::default())
}

/// Sample `input` at `target_fps` into numbered frames under `output_directory`
pub fn extract_frames<P, Q>(input: P, output_directory: Q, target_fps: f64) -> Result<ExtractionSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    default_orchestrator().extract_frames(input, output_directory, target_fps)
}

/// Filter `frame_paths` and assemble them into a silent video of `duration_seconds`
pub fn apply_filter_to_frames<P: AsRef<Path>>(
    frame_paths: &[PathBuf],
    output_path: P,
    filter_id: &str,
    frame_count: usize,
    duration_seconds: f64,
    target_fps: f64,
) -> Result<AssembledVideo> {
    default_orchestrator().apply_filter_to_frames(
        frame_paths,
        output_path,
        filter_id,
        frame_count,
        duration_seconds,
        target_fps,
    )
}

/// Copy `video`'s picture and `audio_source`'s sound into `output`
pub fn merge_audio_with_video<P, Q, R>(video: P, audio_source: Q, output: R) -> Result<MergeResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    default_orchestrator().merge_audio_with_video(video, audio_source, output)
}

/// Run the whole pipeline; `false` on any failure (the reason is logged)
pub async fn process_video_with_filter<P, Q>(input: P, output: Q, filter_id: &str) -> bool
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    default_orchestrator()
        .process_video_with_filter(input, output, filter_id)
        .await
}
