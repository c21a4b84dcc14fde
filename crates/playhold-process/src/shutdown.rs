use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::control::{ExitRequest, ProcessController};
use crate::error::ControlError;
use crate::platform::NativeController;
use crate::scanner::ProcessRecord;

/// What happened to one process during shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseOutcome {
    /// A graceful close request went out. The process may still take
    /// its time acting on it (save prompts, shutdown screens).
    Closed,
    /// The graceful path failed and the process was forcibly killed.
    Killed,
    /// The process was already gone by the time we acted.
    Skipped,
    /// Neither the graceful path nor force termination worked.
    Failed { reason: String },
}

/// Per-process entry in a [`CloseReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseResult {
    pub pid: u32,
    pub exe_path: PathBuf,
    pub outcome: CloseOutcome,
}

/// Summary of a shutdown batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseReport {
    pub results: Vec<CloseResult>,
}

impl CloseReport {
    pub fn closed(&self) -> usize {
        self.count(|o| matches!(o, CloseOutcome::Closed))
    }

    pub fn killed(&self) -> usize {
        self.count(|o| matches!(o, CloseOutcome::Killed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CloseOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CloseOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&CloseOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Close every process in the batch, preferring graceful shutdown.
///
/// One stubborn process never blocks the rest: each record gets its own
/// outcome and the batch always runs to completion.
pub fn close_all(records: &[ProcessRecord]) -> CloseReport {
    close_all_with(&NativeController, records)
}

/// Close a single process, preferring graceful shutdown.
pub fn close_one(record: &ProcessRecord) -> CloseOutcome {
    close_one_with(&NativeController, record)
}

/// [`close_all`] against an explicit controller.
pub fn close_all_with(controller: &dyn ProcessController, records: &[ProcessRecord]) -> CloseReport {
    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let outcome = close_one_with(controller, record);
        match &outcome {
            CloseOutcome::Failed { reason } => {
                tracing::warn!(pid = record.pid, %reason, "process shutdown failed");
            }
            other => tracing::debug!(pid = record.pid, outcome = ?other, "process shutdown"),
        }
        results.push(CloseResult {
            pid: record.pid,
            exe_path: record.exe_path.clone(),
            outcome,
        });
    }
    CloseReport { results }
}

/// [`close_one`] against an explicit controller.
///
/// Strategy order: ask the main window to close; with no main window,
/// ask every top-level window owned by the process's threads; with no
/// windows at all, fall back to the platform's windowless exit request.
/// Only a refused request escalates to force termination.
pub fn close_one_with(controller: &dyn ProcessController, record: &ProcessRecord) -> CloseOutcome {
    // Window state is re-queried now rather than trusted from
    // enumeration time; the flag only says a main window once existed.
    let main_window = if record.main_window_known {
        controller.main_window(record.pid)
    } else {
        None
    };

    match main_window {
        Some(window) => {
            if controller.request_close(window) {
                CloseOutcome::Closed
            } else {
                force_kill(controller, record.pid)
            }
        }
        None => close_headless(controller, record),
    }
}

fn close_headless(controller: &dyn ProcessController, record: &ProcessRecord) -> CloseOutcome {
    let windows = controller.enumerate_top_level_windows(record);
    if windows.is_empty() {
        return match controller.request_exit(record.pid) {
            ExitRequest::Delivered => CloseOutcome::Closed,
            ExitRequest::Gone => CloseOutcome::Skipped,
            ExitRequest::Refused => force_kill(controller, record.pid),
            ExitRequest::Unsupported => {
                tracing::trace!(pid = record.pid, "no windows and no exit mechanism; nothing to do");
                CloseOutcome::Closed
            }
        };
    }

    // Fire at every window. A delivery failure just means that window
    // vanished between enumeration and now.
    for window in windows {
        controller.request_close(window);
    }
    CloseOutcome::Closed
}

fn force_kill(controller: &dyn ProcessController, pid: u32) -> CloseOutcome {
    match controller.force_terminate(pid) {
        Ok(()) => CloseOutcome::Killed,
        Err(ControlError::Vanished { .. }) => CloseOutcome::Skipped,
        Err(err) => CloseOutcome::Failed {
            reason: err.to_string(),
        },
    }
}
