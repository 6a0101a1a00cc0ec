//! Pull-based task protocol and the pass driver.

use crate::block::BlockOutput;
use crate::context::BuildContext;
use crate::error::BuildError;

/// A lazy, finite, non-restartable sequence of build tasks for one layer.
///
/// The caller pulls a task with [`next_task`](Self::next_task) and runs it
/// with [`build`](Self::build). Tasks run to completion once started; the
/// only suspension points are between tasks.
pub trait TaskCursor {
    type Task;
    type Output: BlockOutput;

    /// Layer id, for logging.
    fn layer(&self) -> &str;

    /// Number of tasks in the sequence.
    fn total(&self) -> usize;

    fn has_next(&self) -> bool;

    fn next_task(&mut self) -> Option<Self::Task>;

    fn build(&mut self, task: Self::Task, ctx: &BuildContext) -> Result<Self::Output, BuildError>;
}

/// Outcome of one layer pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Tasks that produced a block.
    pub built: usize,
    /// Tasks that failed; each was logged.
    pub warnings: usize,
    /// The pass stopped at a cancellation check.
    pub cancelled: bool,
}

/// Drive `cursor` to completion, handing every block to `sink`.
///
/// Cancellation is polled before each task. A task or sink failure is logged
/// and counted, and the pass continues with the next task.
pub fn run_pass<C, S>(cursor: &mut C, ctx: &BuildContext, mut sink: S) -> PassReport
where
    C: TaskCursor,
    S: FnMut(C::Output) -> Result<(), BuildError>,
{
    let mut report = PassReport::default();
    let total = cursor.total();
    let mut current = 0;

    while cursor.has_next() {
        if ctx.is_cancelled() {
            tracing::info!(layer = cursor.layer(), current, total, "build pass cancelled");
            report.cancelled = true;
            break;
        }
        let Some(task) = cursor.next_task() else {
            break;
        };
        current += 1;

        match cursor.build(task, ctx).and_then(&mut sink) {
            Ok(()) => report.built += 1,
            Err(e) => {
                tracing::warn!(layer = cursor.layer(), task = current, "build task failed: {e}");
                report.warnings += 1;
            }
        }
        ctx.report_progress(current, total);
    }

    tracing::debug!(
        layer = cursor.layer(),
        built = report.built,
        warnings = report.warnings,
        "pass finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde::Serialize;
    use strata_config::GridEncoding;

    use super::*;

    #[derive(Serialize)]
    struct Numbered(usize);

    impl BlockOutput for Numbered {
        fn file_stem(&self) -> String {
            format!("n_{}", self.0)
        }
    }

    /// Yields `0..n`; task `fail` errors.
    struct Counter {
        next: usize,
        n: usize,
        fail: Option<usize>,
    }

    impl TaskCursor for Counter {
        type Task = usize;
        type Output = Numbered;

        fn layer(&self) -> &str {
            "counter"
        }

        fn total(&self) -> usize {
            self.n
        }

        fn has_next(&self) -> bool {
            self.next < self.n
        }

        fn next_task(&mut self) -> Option<usize> {
            let t = (self.next < self.n).then_some(self.next)?;
            self.next += 1;
            Some(t)
        }

        fn build(&mut self, task: usize, _ctx: &BuildContext) -> Result<Numbered, BuildError> {
            if Some(task) == self.fail {
                return Err(BuildError::Io(std::io::Error::other("unreadable")));
            }
            Ok(Numbered(task))
        }
    }

    #[test]
    fn test_failed_task_does_not_abort_pass() {
        let ctx = BuildContext::new("out", GridEncoding::Array);
        let mut cursor = Counter { next: 0, n: 5, fail: Some(2) };
        let mut seen = Vec::new();
        let report = run_pass(&mut cursor, &ctx, |b| {
            seen.push(b.0);
            Ok(())
        });
        assert_eq!(seen, [0, 1, 3, 4]);
        assert_eq!(report, PassReport { built: 4, warnings: 1, cancelled: false });
    }

    #[test]
    fn test_cancellation_between_tasks() {
        let ctx = BuildContext::new("out", GridEncoding::Array);
        let flag = ctx.cancel_flag();
        let mut cursor = Counter { next: 0, n: 10, fail: None };
        let report = run_pass(&mut cursor, &ctx, |b| {
            if b.0 == 2 {
                flag.store(true, Ordering::Relaxed);
            }
            Ok(())
        });
        assert!(report.cancelled);
        assert_eq!(report.built, 3, "the running task completes, no further task starts");
    }

    #[test]
    fn test_progress_reported_per_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ctx = BuildContext::new("out", GridEncoding::Array).with_progress(move |current, total| {
            assert!(current <= total);
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let mut cursor = Counter { next: 0, n: 4, fail: None };
        run_pass(&mut cursor, &ctx, |_| Ok(()));
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_sink_error_counted() {
        let ctx = BuildContext::new("out", GridEncoding::Array);
        let mut cursor = Counter { next: 0, n: 2, fail: None };
        let report = run_pass(&mut cursor, &ctx, |_| {
            Err(BuildError::Io(std::io::Error::other("disk full")))
        });
        assert_eq!(report.warnings, 2);
    }
}
