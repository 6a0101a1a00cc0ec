//! Per-pass context owned by the orchestrator.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use strata_config::{Config, GridEncoding};

/// Progress callback: `(current, total)`.
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Settings and signals shared by every builder in one pass.
pub struct BuildContext {
    /// Directory companion files are written to.
    pub output_dir: PathBuf,
    /// How grid payloads are encoded.
    pub grid_encoding: GridEncoding,
    /// Interactive preview pass.
    pub preview: bool,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
}

impl BuildContext {
    pub fn new(output_dir: impl Into<PathBuf>, grid_encoding: GridEncoding) -> Self {
        Self {
            output_dir: output_dir.into(),
            grid_encoding,
            preview: false,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.export.output_dir.clone(), config.export.grid_encoding)
            .with_preview(config.export.preview)
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Share a cancellation flag with the orchestrator.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn report_progress(&self, current: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(current, total);
        }
    }

    /// Path of a companion file and the relative URL blocks refer to it by.
    pub fn companion(&self, file_name: &str) -> (PathBuf, String) {
        (self.output_dir.join(file_name), format!("./{file_name}"))
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("output_dir", &self.output_dir)
            .field("grid_encoding", &self.grid_encoding)
            .field("preview", &self.preview)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = BuildContext::new("out", GridEncoding::Array).with_cancel_flag(Arc::clone(&flag));
        assert!(!ctx.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(ctx.is_cancelled(), "orchestrator flag must be visible to the pass");
    }

    #[test]
    fn test_progress_callback() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let ctx = BuildContext::new("out", GridEncoding::Array)
            .with_progress(move |current, _| sink.store(current, Ordering::Relaxed));
        ctx.report_progress(7, 9);
        assert_eq!(seen.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_companion_paths() {
        let ctx = BuildContext::new("/tmp/scene", GridEncoding::Url);
        let (path, url) = ctx.companion("dem_3.bin");
        assert_eq!(path, PathBuf::from("/tmp/scene/dem_3.bin"));
        assert_eq!(url, "./dem_3.bin");
    }
}
