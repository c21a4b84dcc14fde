// macOS implementation. There is no /proc, so the rich listing comes
// from sysinfo; control goes through the same signals as Linux.

use std::collections::HashMap;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use sysinfo::System;

use super::NativeController;
use crate::control::{ExitRequest, ProcessController, WindowHandle};
use crate::error::{ControlError, ScanError};
use crate::scanner::ProcessRecord;

/// Resolve executable paths for all visible processes.
///
/// Processes sysinfo cannot resolve a path for (protected system
/// processes, mostly) are left out.
pub(crate) fn executable_paths() -> Result<HashMap<u32, PathBuf>, ScanError> {
    let mut sys = System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

    Ok(sys
        .processes()
        .iter()
        .filter_map(|(pid, p)| Some((pid.as_u32(), p.exe()?.to_path_buf())))
        .collect())
}

/// No per-thread window concept here; records carry no thread ids.
pub(crate) fn thread_ids(_pid: u32) -> Vec<u32> {
    vec![]
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
