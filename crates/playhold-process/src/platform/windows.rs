// Windows implementation. Executable paths come from WMI because the
// Toolhelp-based listing cannot see inside processes of the other
// bitness; window messaging and process control go through Win32 and
// ntdll directly.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use windows::core::Error as Win32Error;
use windows::Win32::Foundation::{
    CloseHandle, BOOL, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, HANDLE, HWND, LPARAM, WPARAM,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Thread32First, Thread32Next, TH32CS_SNAPTHREAD, THREADENTRY32,
};
use windows::Win32::System::Threading::{
    OpenProcess, TerminateProcess, PROCESS_ACCESS_RIGHTS, PROCESS_SUSPEND_RESUME,
    PROCESS_TERMINATE,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumThreadWindows, EnumWindows, GetWindow, GetWindowThreadProcessId, IsWindowVisible,
    PostMessageW, GW_OWNER, WM_CLOSE,
};
use wmi::{COMLibrary, WMIConnection};

use super::NativeController;
use crate::control::{ExitRequest, ProcessController, WindowHandle};
use crate::error::{ControlError, ScanError};
use crate::scanner::ProcessRecord;

#[link(name = "ntdll")]
extern "system" {
    fn NtSuspendProcess(process_handle: HANDLE) -> i32;
    fn NtResumeProcess(process_handle: HANDLE) -> i32;
}

/// Row shape for the WMI process query. The wmi crate builds
/// `SELECT ProcessId, ExecutablePath FROM Win32_Process` from it.
#[allow(non_camel_case_types, non_snake_case)]
#[derive(Deserialize, Debug)]
struct Win32_Process {
    ProcessId: u32,
    ExecutablePath: Option<String>,
}

/// Resolve executable paths for all visible processes via WMI.
///
/// WMI reports paths for processes of both bitnesses, which the
/// snapshot APIs do not when the caller is a 32-bit process. The COM
/// connection is scoped to this call.
pub(crate) fn executable_paths() -> Result<HashMap<u32, PathBuf>, ScanError> {
    let com_con = COMLibrary::new()
        .map_err(|e| ScanError::QueryUnavailable(format!("COM initialization failed: {e}")))?;
    let wmi_con = WMIConnection::new(com_con.into())
        .map_err(|e| ScanError::QueryUnavailable(format!("WMI connection failed: {e}")))?;

    let rows: Vec<Win32_Process> = wmi_con
        .query()
        .map_err(|e| ScanError::QueryUnavailable(format!("WMI process query failed: {e}")))?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let path = row.ExecutablePath?;
            if path.is_empty() {
                return None;
            }
            Some((row.ProcessId, PathBuf::from(path)))
        })
        .collect())
}

/// Thread ids of a process from a Toolhelp thread snapshot.
pub(crate) fn thread_ids(pid: u32) -> Vec<u32> {
    let mut tids = Vec::new();
    unsafe {
        let Ok(snapshot) = CreateToolhelp32Snapshot(TH32CS_SNAPTHREAD, 0) else {
            return tids;
        };
        if snapshot.is_invalid() {
            return tids;
        }

        let mut entry = THREADENTRY32 {
            dwSize: std::mem::size_of::<THREADENTRY32>() as u32,
            ..Default::default()
        };

        if Thread32First(snapshot, &mut entry).is_ok() {
            loop {
                if entry.th32OwnerProcessID == pid {
                    tids.push(entry.th32ThreadID);
                }
                if Thread32Next(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        let _ = CloseHandle(snapshot);
    }
    tids
}

unsafe extern "system" fn collect_thread_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<WindowHandle>);
    windows.push(WindowHandle(hwnd.0 as isize));
    true.into()
}

/// Top-level windows belonging to the given threads.
fn thread_windows(tids: &[u32]) -> Vec<WindowHandle> {
    let mut windows: Vec<WindowHandle> = Vec::new();
    for &tid in tids {
        unsafe {
            let _ = EnumThreadWindows(
                tid,
                Some(collect_thread_window),
                LPARAM(std::ptr::addr_of_mut!(windows) as isize),
            );
        }
    }
    windows
}

struct MainWindowProbe {
    pid: u32,
    found: Option<WindowHandle>,
}

unsafe extern "system" fn find_main_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let probe = &mut *(lparam.0 as *mut MainWindowProbe);

    let mut owner_pid = 0u32;
    GetWindowThreadProcessId(hwnd, Some(&mut owner_pid));
    if owner_pid != probe.pid {
        return true.into();
    }

    // Same heuristic as .NET's Process.MainWindowHandle: the first
    // visible unowned top-level window of the process.
    if !IsWindowVisible(hwnd).as_bool() {
        return true.into();
    }
    let owner = GetWindow(hwnd, GW_OWNER).unwrap_or_default();
    if !owner.0.is_null() {
        return true.into();
    }

    probe.found = Some(WindowHandle(hwnd.0 as isize));
    false.into()
}

/// The process's main window, if it has one right now.
pub(crate) fn main_window(pid: u32) -> Option<WindowHandle> {
    let mut probe = MainWindowProbe { pid, found: None };
    unsafe {
        // EnumWindows reports an error when the callback stops the
        // enumeration early, which is exactly the found case.
        let _ = EnumWindows(
            Some(find_main_window),
            LPARAM(std::ptr::addr_of_mut!(probe) as isize),
        );
    }
    probe.found
}

/// Process handle that closes itself when dropped.
struct ProcessHandle(HANDLE);

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

fn open_process(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> Result<ProcessHandle, Win32Error> {
    let handle = unsafe { OpenProcess(access, false, pid) }?;
    Ok(ProcessHandle(handle))
}

/// Map the Win32 errors every process operation shares, or build the
/// operation-specific error from the fallback.
fn win32_error(
    pid: u32,
    err: &Win32Error,
    fallback: impl FnOnce(String) -> ControlError,
) -> ControlError {
    if err.code() == ERROR_ACCESS_DENIED.to_hresult() {
        ControlError::AccessDenied { pid }
    } else if err.code() == ERROR_INVALID_PARAMETER.to_hresult() {
        // OpenProcess reports an invalid parameter when the pid no
        // longer names a process.
        ControlError::Vanished { pid }
    } else {
        fallback(err.to_string())
    }
}

impl ProcessController for NativeController {
    fn suspend(&self, pid: u32) -> Result<(), ControlError> {
        let handle = open_process(pid, PROCESS_SUSPEND_RESUME).map_err(|e| {
            win32_error(pid, &e, |reason| ControlError::SuspendFailed { pid, reason })
        })?;
        let status = unsafe { NtSuspendProcess(handle.0) };
        if status < 0 {
            return Err(ControlError::SuspendFailed {
                pid,
                reason: format!("NTSTATUS {status:#010x}"),
            });
        }
        Ok(())
    }

    fn resume(&self, pid: u32) -> Result<(), ControlError> {
        let handle = open_process(pid, PROCESS_SUSPEND_RESUME).map_err(|e| {
            win32_error(pid, &e, |reason| ControlError::ResumeFailed { pid, reason })
        })?;
        let status = unsafe { NtResumeProcess(handle.0) };
        if status < 0 {
            return Err(ControlError::ResumeFailed {
                pid,
                reason: format!("NTSTATUS {status:#010x}"),
            });
        }
        Ok(())
    }

    fn enumerate_top_level_windows(&self, record: &ProcessRecord) -> Vec<WindowHandle> {
        // Records built outside a scan may not carry thread ids; take a
        // fresh snapshot for those.
        if record.threads.is_empty() {
            thread_windows(&thread_ids(record.pid))
        } else {
            thread_windows(&record.threads)
        }
    }

    fn main_window(&self, pid: u32) -> Option<WindowHandle> {
        main_window(pid)
    }

    fn request_close(&self, window: WindowHandle) -> bool {
        unsafe { PostMessageW(HWND(window.0 as *mut _), WM_CLOSE, WPARAM(0), LPARAM(0)).is_ok() }
    }

    fn request_exit(&self, _pid: u32) -> ExitRequest {
        // No windowless graceful-exit mechanism on Windows; a process
        // without windows has nothing to deliver WM_CLOSE to.
        ExitRequest::Unsupported
    }

    fn force_terminate(&self, pid: u32) -> Result<(), ControlError> {
        let handle = open_process(pid, PROCESS_TERMINATE).map_err(|e| {
            win32_error(pid, &e, |reason| ControlError::TerminateFailed { pid, reason })
        })?;
        unsafe { TerminateProcess(handle.0, 1) }.map_err(|e| {
            win32_error(pid, &e, |reason| ControlError::TerminateFailed { pid, reason })
        })
    }
}
