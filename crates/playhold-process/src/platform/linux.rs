// Linux implementation. Paths come from /proc, control goes through
// signals. There is no window-message equivalent here, so all window
// queries come back empty and graceful close falls through to SIGTERM.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use super::NativeController;
use crate::control::{ExitRequest, ProcessController, WindowHandle};
use crate::error::{ControlError, ScanError};
use crate::scanner::ProcessRecord;

/// Resolve executable paths for all visible processes via /proc/pid/exe.
///
/// The symlink is unreadable for kernel threads and for processes owned
/// by other users; those pids are simply left out.
pub(crate) fn executable_paths() -> Result<HashMap<u32, PathBuf>, ScanError> {
    let entries = fs::read_dir("/proc")
        .map_err(|e| ScanError::QueryUnavailable(format!("cannot read /proc: {e}")))?;

    let mut paths = HashMap::new();
    for entry in entries.filter_map(Result::ok) {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        if let Ok(path) = fs::read_link(format!("/proc/{pid}/exe")) {
            paths.insert(pid, path);
        }
    }

    Ok(paths)
}

/// Thread ids from /proc/pid/task. Informational on Linux; nothing here
/// consumes them the way the Windows window enumeration does.
pub(crate) fn thread_ids(pid: u32) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(format!("/proc/{pid}/task")) else {
        return vec![];
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str()?.parse::<u32>().ok())
        .collect()
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), Errno> {
    kill(Pid::from_raw(pid as i32), signal)
}

/// Map the errnos every signal shares, or build the operation-specific
/// error from the fallback.
fn signal_error(
    pid: u32,
    errno: Errno,
    fallback: impl FnOnce(String) -> ControlError,
) -> ControlError {
    match errno {
        Errno::ESRCH => ControlError::Vanished { pid },
        Errno::EPERM | Errno::EACCES => ControlError::AccessDenied { pid },
        other => fallback(other.to_string()),
    }
}

impl ProcessController for NativeController {
    fn suspend(&self, pid: u32) -> Result<(), ControlError> {
        send_signal(pid, Signal::SIGSTOP)
            .map_err(|e| signal_error(pid, e, |reason| ControlError::SuspendFailed { pid, reason }))
    }

    fn resume(&self, pid: u32) -> Result<(), ControlError> {
        send_signal(pid, Signal::SIGCONT)
            .map_err(|e| signal_error(pid, e, |reason| ControlError::ResumeFailed { pid, reason }))
    }

    fn enumerate_top_level_windows(&self, _record: &ProcessRecord) -> Vec<WindowHandle> {
        vec![]
    }

    fn main_window(&self, _pid: u32) -> Option<WindowHandle> {
        None
    }

    fn request_close(&self, _window: WindowHandle) -> bool {
        false
    }

    fn request_exit(&self, pid: u32) -> ExitRequest {
        match send_signal(pid, Signal::SIGTERM) {
            Ok(()) => ExitRequest::Delivered,
            Err(Errno::ESRCH) => ExitRequest::Gone,
            Err(errno) => {
                tracing::debug!(pid, %errno, "SIGTERM not delivered");
                ExitRequest::Refused
            }
        }
    }

    fn force_terminate(&self, pid: u32) -> Result<(), ControlError> {
        send_signal(pid, Signal::SIGKILL).map_err(|e| {
            signal_error(pid, e, |reason| ControlError::TerminateFailed { pid, reason })
        })
    }
}
