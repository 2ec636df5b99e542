use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::job::{CancelToken, JobContext, StagingArea};
use super::progress::{ProgressCallback, ProgressReporter};
use super::state::{JobStage, JobState};
use crate::audio::{AudioFit, AudioMerger, MergeResult};
use crate::config::{Config, MissingAudioPolicy};
use crate::error::{Result, SketchError};
use crate::filters::FilterId;
use crate::media::{FfmpegBackend, MediaBackend};
use crate::video::{
    AssembledVideo, FilterJob, FrameExtractor, FrameFilterApplier, Resolution, VideoAssembler,
};

/// What `extract_frames` hands back to callers
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSummary {
    pub frame_count: usize,
    pub duration_seconds: f64,
    pub actual_fps: f64,
    pub resolution: Resolution,
    pub frame_paths: Vec<PathBuf>,
}

/// How a finished job dealt with the source's audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioOutcome {
    Merged { fit: AudioFit },
    /// The source had no audio; the silent video became the output
    MissingCopiedVideo,
    /// The job never reached the merge stage
    Skipped,
}

/// Summary of a completed job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub filter: FilterId,
    pub frame_count: usize,
    pub target_frame_rate: f64,
    pub duration_seconds: f64,
    pub audio: AudioOutcome,
    pub reused_existing_output: bool,
    pub history: Vec<JobState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Handle to a job started with [`Orchestrator::spawn`]
pub struct JobHandle {
    job_id: String,
    cancel: CancelToken,
    state: watch::Receiver<JobState>,
    join: JoinHandle<Result<JobReport>>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Ask the job to stop; it finishes in-flight frames, then cleans up
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The most recently published state
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// A receiver that wakes on every state change
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    pub async fn wait(self) -> Result<JobReport> {
        self.join
            .await
            .map_err(|e| SketchError::codec(format!("job task failed: {}", e)))?
    }
}

/// Enforces legal state transitions and publishes every change
struct JobTracker {
    state: JobState,
    history: Vec<JobState>,
    sender: watch::Sender<JobState>,
    reporter: ProgressReporter,
}

impl JobTracker {
    fn new(sender: watch::Sender<JobState>, reporter: ProgressReporter) -> Self {
        sender.send_replace(JobState::Idle);
        Self {
            state: JobState::Idle,
            history: vec![JobState::Idle],
            sender,
            reporter,
        }
    }

    fn advance(&mut self, next: JobState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SketchError::invalid_argument(format!(
                "illegal job transition: {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        self.history.push(next);
        self.sender.send_replace(next);
        self.reporter.report(next, 0.0, next.to_string());
        Ok(())
    }

    /// Stage to blame for a failure in the current state
    fn current_stage(&self) -> JobStage {
        self.state.stage().unwrap_or(JobStage::Extracting)
    }
}

/// Stage results needed for the report
struct StageOutput {
    frame_count: usize,
    target_frame_rate: f64,
    duration_seconds: f64,
    audio: AudioOutcome,
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SketchError::codec(format!("worker task failed: {}", e)))?
}

/// Move the finished file into place, copying when a rename crosses filesystems
fn persist(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SketchError::io(parent, e))?;
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| SketchError::io(to, e))?;
    Ok(())
}

fn container_extension(output: &Path) -> String {
    output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4")
        .to_string()
}

/// Runs Extract, Apply, Assemble and Merge as one job
pub struct Orchestrator {
    config: Config,
    backend: Arc<dyn MediaBackend>,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    /// Orchestrator backed by the ffmpeg executables named in `config.tools`
    pub fn new(config: Config) -> Self {
        let backend = Arc::new(FfmpegBackend::from_config(&config.tools));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: Config, backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            config,
            backend,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn extractor(&self) -> FrameExtractor {
        FrameExtractor::new(Arc::clone(&self.backend), self.config.extraction.clone())
    }

    fn assembler(&self) -> VideoAssembler {
        VideoAssembler::new(Arc::clone(&self.backend), self.config.encoding.clone())
    }

    fn merger(&self) -> AudioMerger {
        AudioMerger::new(Arc::clone(&self.backend), self.config.audio.clone())
    }

    /// Sample `input` at `target_fps` into `output_directory`
    pub fn extract_frames<P, Q>(&self, input: P, output_directory: Q, target_fps: f64) -> Result<ExtractionSummary>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let manifest = self.extractor().extract(input, output_directory, target_fps)?;
        Ok(ExtractionSummary {
            frame_count: manifest.frame_count,
            duration_seconds: manifest.duration_seconds,
            actual_fps: manifest.target_frame_rate,
            resolution: manifest.resolution,
            frame_paths: manifest.frames,
        })
    }

    /// Filter `frames` and assemble them into a silent video at `output_path`
    ///
    /// Filtered frames live in a private staging area that is removed before
    /// returning.
    pub fn apply_filter_to_frames<P: AsRef<Path>>(
        &self,
        frames: &[PathBuf],
        output_path: P,
        filter_id: &str,
        frame_count: usize,
        duration_seconds: f64,
        target_fps: f64,
    ) -> Result<AssembledVideo> {
        let filter: FilterId = filter_id.parse()?;
        if frames.len() != frame_count {
            return Err(SketchError::FrameCountMismatch {
                expected: frame_count,
                actual: frames.len(),
            });
        }
        if !(duration_seconds.is_finite() && duration_seconds > 0.0 && target_fps.is_finite() && target_fps > 0.0) {
            return Err(SketchError::invalid_argument(format!(
                "duration ({}) and target fps ({}) must be positive",
                duration_seconds, target_fps
            )));
        }

        let job_id = Uuid::new_v4().to_string();
        let mut staging = StagingArea::create(self.config.staging.resolved_root(), &job_id)?;

        let job = FilterJob {
            frames: frames.to_vec(),
            filter,
            frame_count,
            target_duration_seconds: duration_seconds,
            target_frame_rate: target_fps,
        };
        let filtered = FrameFilterApplier::new(self.config.filtering.clone()).apply(&job, staging.filtered_dir())?;

        // the output path only ever receives a video that passed verification
        let output_path = output_path.as_ref();
        let staged_path = staging.assembled_path(&container_extension(output_path));
        let assembled = self.assembler().with_scratch_dir(staging.path()).assemble(
            &filtered.frames,
            filtered.frame_count,
            duration_seconds,
            target_fps,
            &staged_path,
        )?;
        persist(&staged_path, output_path)?;

        staging.cleanup()?;
        Ok(AssembledVideo {
            path: output_path.to_path_buf(),
            ..assembled
        })
    }

    /// Mux the audio of `audio_source` into `video`
    pub fn merge_audio_with_video<P, Q, R>(&self, video: P, audio_source: Q, output: R) -> Result<MergeResult>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        self.merger().merge(video, audio_source, output)
    }

    /// Run the full pipeline for one input
    pub async fn process<P, Q>(&self, input: P, output: Q, filter_id: &str) -> Result<JobReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.process_with_cancel(input, output, filter_id, CancelToken::new())
            .await
    }

    pub async fn process_with_cancel<P, Q>(
        &self,
        input: P,
        output: Q,
        filter_id: &str,
        cancel: CancelToken,
    ) -> Result<JobReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let (sender, _receiver) = watch::channel(JobState::Idle);
        self.run_job(
            Uuid::new_v4().to_string(),
            input.as_ref().to_path_buf(),
            output.as_ref().to_path_buf(),
            filter_id,
            cancel,
            sender,
        )
        .await
    }

    /// Boolean form of [`process`](Self::process); failures are logged
    pub async fn process_video_with_filter<P, Q>(&self, input: P, output: Q, filter_id: &str) -> bool
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        match self.process(input, output, filter_id).await {
            Ok(_) => true,
            Err(e) => {
                error!("{}", e.user_message());
                false
            }
        }
    }

    /// Start a job on the tokio runtime and return immediately
    pub fn spawn<P, Q, S>(self: &Arc<Self>, input: P, output: Q, filter_id: S) -> JobHandle
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
        S: Into<String>,
    {
        let job_id = Uuid::new_v4().to_string();
        let cancel = CancelToken::new();
        let (sender, receiver) = watch::channel(JobState::Idle);

        let this = Arc::clone(self);
        let id = job_id.clone();
        let token = cancel.clone();
        let (input, output, filter_id) = (input.into(), output.into(), filter_id.into());
        let join = tokio::spawn(async move { this.run_job(id, input, output, &filter_id, token, sender).await });

        JobHandle {
            job_id,
            cancel,
            state: receiver,
            join,
        }
    }

    async fn run_job(
        &self,
        job_id: String,
        input: PathBuf,
        output: PathBuf,
        filter_id: &str,
        cancel: CancelToken,
        sender: watch::Sender<JobState>,
    ) -> Result<JobReport> {
        let filter: FilterId = filter_id.parse()?;
        let started_at = Utc::now();
        let mut tracker = JobTracker::new(sender, ProgressReporter::new(&job_id, self.progress.clone()));

        if self.config.pipeline.reuse_existing_output && output.is_file() {
            info!("{} already exists, nothing to do", output.display());
            tracker.advance(JobState::Done)?;
            return Ok(JobReport {
                job_id,
                input,
                output,
                filter,
                frame_count: 0,
                target_frame_rate: 0.0,
                duration_seconds: 0.0,
                audio: AudioOutcome::Skipped,
                reused_existing_output: true,
                history: tracker.history,
                started_at,
                finished_at: Utc::now(),
            });
        }

        let output_existed = output.exists();
        tracker.advance(JobState::Extracting)?;
        info!(
            "Job {}: {} -> {} with {}",
            job_id,
            input.display(),
            output.display(),
            filter
        );

        let result = match JobContext::create(self.config.staging.resolved_root(), &job_id, cancel) {
            Ok(mut ctx) => {
                let result = self.run_stages(&ctx, &mut tracker, &input, &output, filter).await;
                if let Err(e) = ctx.staging.cleanup() {
                    warn!("Job {}: {}", job_id, e);
                }
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(stages) => {
                tracker.advance(JobState::Done)?;
                let finished_at = Utc::now();
                info!(
                    "Job {} finished in {:.1}s: {}",
                    job_id,
                    (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
                    output.display()
                );
                Ok(JobReport {
                    job_id,
                    input,
                    output,
                    filter,
                    frame_count: stages.frame_count,
                    target_frame_rate: stages.target_frame_rate,
                    duration_seconds: stages.duration_seconds,
                    audio: stages.audio,
                    reused_existing_output: false,
                    history: tracker.history,
                    started_at,
                    finished_at,
                })
            }
            Err(err) => {
                let stage = tracker.current_stage();
                let terminal = if err.is_cancelled() {
                    JobState::Cancelled
                } else {
                    JobState::Failed { stage }
                };
                if let Err(e) = tracker.advance(terminal) {
                    warn!("Job {}: {}", job_id, e);
                }

                if !output_existed && output.exists() {
                    if let Err(e) = std::fs::remove_file(&output) {
                        warn!("Job {}: could not remove partial output: {}", job_id, e);
                    }
                }

                if err.is_cancelled() {
                    warn!("Job {} cancelled while {}", job_id, stage);
                } else {
                    error!("Job {} failed while {}: {}", job_id, stage, err);
                }
                Err(SketchError::Job {
                    job_id,
                    stage,
                    source: Box::new(err),
                })
            }
        }
    }

    async fn run_stages(
        &self,
        ctx: &JobContext,
        tracker: &mut JobTracker,
        input: &Path,
        output: &Path,
        filter: FilterId,
    ) -> Result<StageOutput> {
        let cancel = ctx.cancel.clone();
        let extension = container_extension(output);
        cancel.check()?;

        // Extract
        let extractor = self.extractor();
        let extraction = self.config.extraction.clone();
        let frames_dir = ctx.staging.frames_dir();
        let source = input.to_path_buf();
        let manifest = blocking(move || {
            let asset = extractor.probe(&source)?;
            let target_fps = extraction.derive_target_fps(asset.source_frame_rate);
            extractor.extract_asset(&asset, &frames_dir, target_fps)
        })
        .await?;
        tracker.reporter.report(
            JobState::Extracting,
            1.0,
            format!("extracted {} frames", manifest.frame_count),
        );
        cancel.check()?;

        // Apply
        tracker.advance(JobState::Filtering)?;
        let reporter = tracker.reporter.clone();
        let applier = FrameFilterApplier::new(self.config.filtering.clone())
            .with_cancel(cancel.clone())
            .with_progress(Arc::new(move |done: usize, total: usize| {
                reporter.report(
                    JobState::Filtering,
                    done as f64 / total as f64,
                    format!("filtered {}/{} frames", done, total),
                )
            }));
        let filter_job = FilterJob::from_manifest(&manifest, filter);
        let filtered_dir = ctx.staging.filtered_dir();
        let filtered = blocking(move || applier.apply(&filter_job, &filtered_dir)).await?;
        cancel.check()?;

        // Assemble
        tracker.advance(JobState::Assembling)?;
        let assembler = self.assembler().with_scratch_dir(ctx.staging.path());
        let assembled_path = ctx.staging.assembled_path(&extension);
        let frames = filtered.frames.clone();
        let (frame_count, duration, fps) = (
            filtered.frame_count,
            manifest.duration_seconds,
            manifest.target_frame_rate,
        );
        let assembled =
            blocking(move || assembler.assemble(&frames, frame_count, duration, fps, &assembled_path)).await?;
        cancel.check()?;

        // Merge
        tracker.advance(JobState::Merging)?;
        let merger = self.merger();
        let policy = self.config.audio.on_missing;
        let video = assembled.path.clone();
        let source = input.to_path_buf();
        let merged_path = ctx.staging.merged_path(&extension);
        let (final_path, audio) = blocking(move || {
            let merged = merger.merge(&video, &source, &merged_path);
            match merged {
                Ok(result) if result.success => Ok((result.output_path, AudioOutcome::Merged { fit: result.audio_fit })),
                Ok(result) => Err(SketchError::codec(format!(
                    "merged output {} is empty",
                    result.output_path.display()
                ))),
                Err(SketchError::NoAudioTrack { path }) if policy == MissingAudioPolicy::CopyVideo => {
                    info!("{} has no audio, keeping the silent video", path);
                    Ok((video, AudioOutcome::MissingCopiedVideo))
                }
                Err(e) => Err(e),
            }
        })
        .await?;
        cancel.check()?;

        let destination = output.to_path_buf();
        blocking(move || persist(&final_path, &destination)).await?;
        tracker.reporter.report(JobState::Merging, 1.0, "output written");

        Ok(StageOutput {
            frame_count,
            target_frame_rate: fps,
            duration_seconds: assembled.duration_seconds,
            audio,
        })
    }
}
