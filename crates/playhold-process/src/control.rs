use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::platform::NativeController;
use crate::scanner::ProcessRecord;

/// Opaque top-level window identifier.
///
/// On Windows this is the raw `HWND` value. Unix platforms never produce
/// one; window-based close requests are a Windows concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowHandle(pub isize);

/// Result of asking a process to exit without going through a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    /// The request was delivered; the process may still ignore it.
    Delivered,
    /// The platform refused the request (typically a permission problem).
    Refused,
    /// The process was already gone.
    Gone,
    /// The platform has no windowless exit mechanism.
    Unsupported,
}

/// Platform process-control capabilities.
///
/// One implementation per OS lives in [`crate::platform`]; tests swap in
/// mocks to drive the shutdown state machine without touching real
/// processes.
pub trait ProcessController: Send + Sync {
    /// Pause all threads of the process.
    fn suspend(&self, pid: u32) -> Result<(), ControlError>;

    /// Undo a previous [`ProcessController::suspend`].
    fn resume(&self, pid: u32) -> Result<(), ControlError>;

    /// All top-level windows owned by the process's threads.
    fn enumerate_top_level_windows(&self, record: &ProcessRecord) -> Vec<WindowHandle>;

    /// The process's main window, if it currently has one.
    fn main_window(&self, pid: u32) -> Option<WindowHandle>;

    /// Ask a window to close. Returns whether the request was accepted
    /// for delivery, not whether the window actually closed.
    fn request_close(&self, window: WindowHandle) -> bool;

    /// Ask the process to exit without involving a window.
    fn request_exit(&self, pid: u32) -> ExitRequest;

    /// Forcibly terminate the process.
    fn force_terminate(&self, pid: u32) -> Result<(), ControlError>;
}

/// Suspend a process by pid.
///
/// The game keeps its memory and handles; only thread execution stops.
/// Callers are responsible for resuming it later, suspended processes
/// survive the caller exiting.
pub fn suspend_process(pid: u32) -> Result<(), ControlError> {
    NativeController.suspend(pid)
}

/// Resume a process previously suspended with [`suspend_process`].
pub fn resume_process(pid: u32) -> Result<(), ControlError> {
    NativeController.resume(pid)
}
