#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ScanError;

/// [`crate::control::ProcessController`] backed by the running platform.
///
/// Stateless; every call opens and releases whatever OS resources it
/// needs. The per-OS implementations live in the submodules above.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeController;

/// Full-path process listing for the current platform: pid -> executable
/// path.
///
/// Pids whose path cannot be resolved (kernel threads, processes owned by
/// other users, protected processes) are absent from the map; callers
/// must treat a missing pid as "not inspectable", not as an error.
pub(crate) fn executable_paths() -> Result<HashMap<u32, PathBuf>, ScanError> {
    #[cfg(target_os = "windows")]
    {
        windows::executable_paths()
    }
    #[cfg(target_os = "macos")]
    {
        macos::executable_paths()
    }
    #[cfg(target_os = "linux")]
    {
        linux::executable_paths()
    }
}

/// Thread ids of a process, used for per-thread window enumeration on
/// Windows. Empty where the platform has no such concept.
pub(crate) fn thread_ids(pid: u32) -> Vec<u32> {
    #[cfg(target_os = "windows")]
    {
        windows::thread_ids(pid)
    }
    #[cfg(target_os = "macos")]
    {
        macos::thread_ids(pid)
    }
    #[cfg(target_os = "linux")]
    {
        linux::thread_ids(pid)
    }
}
