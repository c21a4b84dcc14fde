//! Integration tests against live processes.
//!
//! These run against the real platform: scans look for the test binary
//! itself, and the Unix control tests spawn a real child process to
//! suspend, resume and terminate. No mocking.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use playhold_process::{scan_in_background, ExclusionList, ProcessScanner, ScanError, ScanQuery};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn own_exe() -> PathBuf {
    std::env::current_exe().expect("test binary has a path")
}

// ── Scanning ─────────────────────────────────────────────────────────

#[test]
fn exact_path_scan_finds_this_test_binary() {
    init_tracing();
    let mut scanner = ProcessScanner::new(ExclusionList::bundled());
    let query = ScanQuery::exact_path(own_exe());

    let records = scanner
        .find_matching_processes(&query)
        .expect("scan should succeed");

    let own_pid = std::process::id();
    assert!(
        records.iter().any(|r| r.pid == own_pid),
        "expected pid {own_pid} among {records:?}"
    );
}

#[test]
fn install_dir_scan_finds_this_test_binary() {
    init_tracing();
    let dir = own_exe()
        .parent()
        .expect("test binary has a parent directory")
        .to_path_buf();
    let mut scanner = ProcessScanner::new(ExclusionList::empty());
    let query = ScanQuery::install_dir(dir, false);

    let records = scanner
        .find_matching_processes(&query)
        .expect("scan should succeed");
    assert!(records.iter().any(|r| r.pid == std::process::id()));
}

#[tokio::test]
async fn background_scan_finds_this_test_binary() {
    init_tracing();
    let cancel = Arc::new(AtomicBool::new(false));
    let query = ScanQuery::exact_path(own_exe());

    let records = scan_in_background(ExclusionList::bundled(), query, cancel)
        .await
        .expect("scan should succeed");
    assert!(records.iter().any(|r| r.pid == std::process::id()));
}

#[tokio::test]
async fn background_scan_honors_cancellation() {
    init_tracing();
    let cancel = Arc::new(AtomicBool::new(true));
    let query = ScanQuery::install_dir("/", false);

    let result = scan_in_background(ExclusionList::empty(), query, cancel).await;
    assert!(matches!(result, Err(ScanError::Cancelled)));
}

// ── Process control (Unix) ───────────────────────────────────────────

#[cfg(unix)]
mod unix_control {
    use std::path::PathBuf;
    use std::process::{Child, Command};

    use playhold_process::{
        close_all, close_one, resume_process, suspend_process, CloseOutcome, ControlError,
        NativeController, ProcessController, ProcessRecord,
    };

    use super::init_tracing;

    /// Kills the child on drop so a failed assertion does not leak a
    /// sleeping process into the test environment.
    struct ChildGuard(Child);

    impl Drop for ChildGuard {
        fn drop(&mut self) {
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }

    fn spawn_sleeper() -> ChildGuard {
        let child = Command::new("sleep")
            .arg("60")
            .spawn()
            .expect("spawn sleep child");
        ChildGuard(child)
    }

    fn headless_record(pid: u32) -> ProcessRecord {
        ProcessRecord {
            pid,
            exe_path: PathBuf::from("/bin/sleep"),
            main_window_known: false,
            threads: vec![],
        }
    }

    #[cfg(target_os = "linux")]
    fn process_state(pid: u32) -> Option<char> {
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        // State is the field after the parenthesised comm, which may
        // itself contain spaces.
        let after_comm = stat.rsplit(')').next()?;
        after_comm.split_whitespace().next()?.chars().next()
    }

    #[cfg(target_os = "linux")]
    fn wait_for_state(pid: u32, wanted: char) -> bool {
        use std::time::Duration;
        for _ in 0..100 {
            if process_state(pid) == Some(wanted) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn suspend_and_resume_a_real_child() {
        init_tracing();
        let guard = spawn_sleeper();
        let pid = guard.0.id();

        suspend_process(pid).expect("suspend should succeed");
        #[cfg(target_os = "linux")]
        assert!(wait_for_state(pid, 'T'), "child should reach stopped state");

        resume_process(pid).expect("resume should succeed");
        #[cfg(target_os = "linux")]
        assert!(wait_for_state(pid, 'S'), "child should be running again");
    }

    #[test]
    fn close_all_terminates_a_headless_child_gracefully() {
        init_tracing();
        let mut guard = spawn_sleeper();
        let pid = guard.0.id();

        let report = close_all(&[headless_record(pid)]);
        assert_eq!(report.closed(), 1);

        let status = guard.0.wait().expect("child should be reapable");
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(15), "child should die from SIGTERM");
    }

    #[test]
    fn force_terminate_kills_a_real_child() {
        init_tracing();
        let mut guard = spawn_sleeper();
        let pid = guard.0.id();

        NativeController
            .force_terminate(pid)
            .expect("force terminate should succeed");

        let status = guard.0.wait().expect("child should be reapable");
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(9), "child should die from SIGKILL");
    }

    #[test]
    fn close_one_skips_a_process_that_already_exited() {
        init_tracing();
        let mut guard = spawn_sleeper();
        let pid = guard.0.id();

        // Reap the child first so the pid is genuinely gone, not a zombie.
        guard.0.kill().expect("kill child");
        guard.0.wait().expect("reap child");

        assert_eq!(close_one(&headless_record(pid)), CloseOutcome::Skipped);
    }

    #[test]
    fn control_errors_identify_vanished_processes() {
        init_tracing();
        // Far beyond any real pid range; nothing to signal.
        let missing_pid = 999_999_999;

        match suspend_process(missing_pid) {
            Err(ControlError::Vanished { pid }) => assert_eq!(pid, missing_pid),
            other => panic!("expected Vanished, got {other:?}"),
        }
        match resume_process(missing_pid) {
            Err(ControlError::Vanished { pid }) => assert_eq!(pid, missing_pid),
            other => panic!("expected Vanished, got {other:?}"),
        }
    }
}
