use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, SketchError};

/// Cooperative cancellation flag shared between a job and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; running work stops at its next check
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation has been requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SketchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A job's private scratch directory, removed on cleanup or drop
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    removed: bool,
}

impl StagingArea {
    /// Create `<parent>/job-<job_id>`
    pub fn create<P: AsRef<Path>>(parent: P, job_id: &str) -> Result<Self> {
        let root = parent.as_ref().join(format!("job-{}", job_id));
        std::fs::create_dir_all(&root).map_err(|e| SketchError::io(&root, e))?;
        debug!("Created staging area {}", root.display());
        Ok(Self { root, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.root.join("frames")
    }

    pub fn filtered_dir(&self) -> PathBuf {
        self.root.join("filtered")
    }

    pub fn assembled_path(&self, extension: &str) -> PathBuf {
        self.root.join(format!("assembled.{}", extension))
    }

    pub fn merged_path(&self, extension: &str) -> PathBuf {
        self.root.join(format!("merged.{}", extension))
    }

    /// Remove the directory and everything in it. Safe to call repeatedly.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SketchError::io(&self.root, e)),
        }
        self.removed = true;
        debug!("Removed staging area {}", self.root.display());
        Ok(())
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to remove staging area: {}", e);
        }
    }
}

/// Everything a running job owns
#[derive(Debug)]
pub struct JobContext {
    pub job_id: String,
    pub staging: StagingArea,
    pub cancel: CancelToken,
}

impl JobContext {
    pub fn create<P: AsRef<Path>>(staging_root: P, job_id: &str, cancel: CancelToken) -> Result<Self> {
        Ok(Self {
            job_id: job_id.to_string(),
            staging: StagingArea::create(staging_root, job_id)?,
            cancel,
        })
    }
}
