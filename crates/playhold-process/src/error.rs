use thiserror::Error;

/// Failures while enumerating and matching processes.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("process listing unavailable: {0}")]
    QueryUnavailable(String),

    #[error("scan cancelled")]
    Cancelled,
}

/// Failures while acting on a single process.
///
/// Every variant carries the pid so batch callers can report which
/// process an action failed on without extra bookkeeping.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("process {pid} no longer exists")]
    Vanished { pid: u32 },

    #[error("access denied to process {pid}")]
    AccessDenied { pid: u32 },

    #[error("failed to suspend process {pid}: {reason}")]
    SuspendFailed { pid: u32, reason: String },

    #[error("failed to resume process {pid}: {reason}")]
    ResumeFailed { pid: u32, reason: String },

    #[error("failed to terminate process {pid}: {reason}")]
    TerminateFailed { pid: u32, reason: String },
}
