//! # Video Processing Module
//!
//! The three frame stages of the pipeline: extraction, filtering and
//! assembly, plus the data they hand to each other.

pub mod applier;
pub mod assembler;
pub mod extractor;
pub mod types;

pub use applier::{FrameFilterApplier, FrameProgress};
pub use assembler::VideoAssembler;
pub use extractor::FrameExtractor;
pub use types::{
    duration_tolerance, AssembledVideo, FilterJob, FilteredFrameManifest, FrameManifest, FrameNaming,
    PresentationSchedule, Resolution, SamplingPlan, VideoAsset,
};
