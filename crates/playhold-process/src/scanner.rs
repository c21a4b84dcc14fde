use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::control::ProcessController;
use crate::error::ScanError;
use crate::exclusions::ExclusionList;
use crate::platform::{self, NativeController};

/// A running process matched to a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    /// Absolute path of the process's executable image.
    pub exe_path: PathBuf,
    /// Whether the process had a main window at enumeration time.
    /// Window state is checked again at close time; this only picks
    /// the close strategy to start from.
    pub main_window_known: bool,
    /// Thread ids at enumeration time. Empty on platforms without a
    /// per-thread window concept.
    pub threads: Vec<u32>,
}

/// What counts as "belongs to the game".
///
/// The two modes are mutually exclusive. An install-directory match
/// casts a wide net and wants the exclusion list; an exact path is
/// already as narrow as it gets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchTarget {
    /// Any executable whose path starts with this directory.
    InstallDir(PathBuf),
    /// Exactly this executable path.
    ExactPath(PathBuf),
}

/// One scan request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanQuery {
    pub target: MatchTarget,
    /// Filter out known companion tools on install-directory matches.
    /// Ignored for exact-path matches.
    pub use_exclusion_list: bool,
}

impl ScanQuery {
    /// Match every executable under an install directory.
    pub fn install_dir(dir: impl Into<PathBuf>, use_exclusion_list: bool) -> Self {
        Self {
            target: MatchTarget::InstallDir(dir.into()),
            use_exclusion_list,
        }
    }

    /// Match one exact executable path. An explicit path is trusted
    /// as-is, so the exclusion list is never consulted.
    pub fn exact_path(path: impl Into<PathBuf>) -> Self {
        Self {
            target: MatchTarget::ExactPath(path.into()),
            use_exclusion_list: false,
        }
    }
}

/// Finds the processes that belong to a specific game.
///
/// Matching works on executable paths, not process names: names collide
/// across games and tools, paths do not. Each scan takes two listings,
/// a cheap pid listing from sysinfo and a full-path listing from the
/// platform, and joins them on pid. Only processes present in both with
/// a non-empty path are considered; anything else is either mid-exit or
/// not inspectable, and acting on it would be a shot in the dark.
pub struct ProcessScanner {
    exclusions: ExclusionList,
    system: sysinfo::System,
}

impl ProcessScanner {
    pub fn new(exclusions: ExclusionList) -> Self {
        Self {
            exclusions,
            system: sysinfo::System::new(),
        }
    }

    /// Enumerate running processes and return those matching the query.
    pub fn find_matching_processes(
        &mut self,
        query: &ScanQuery,
    ) -> Result<Vec<ProcessRecord>, ScanError> {
        self.find_matching_processes_with_cancel(query, &AtomicBool::new(false))
    }

    /// [`ProcessScanner::find_matching_processes`] with a cancellation
    /// flag, checked between phases and between candidates. A cancelled
    /// scan returns [`ScanError::Cancelled`] rather than partial results.
    pub fn find_matching_processes_with_cancel(
        &mut self,
        query: &ScanQuery,
        cancel: &AtomicBool,
    ) -> Result<Vec<ProcessRecord>, ScanError> {
        if cancel.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }

        self.system
            .refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let listing: Vec<(u32, String)> = self
            .system
            .processes()
            .iter()
            .map(|(pid, p)| (pid.as_u32(), p.name().to_string_lossy().to_string()))
            .collect();

        if cancel.load(Ordering::Relaxed) {
            return Err(ScanError::Cancelled);
        }

        let paths = platform::executable_paths()?;
        let candidates = join_listings(listing, paths);

        let mut records = Vec::new();
        for candidate in candidates {
            if cancel.load(Ordering::Relaxed) {
                return Err(ScanError::Cancelled);
            }
            if !record_matches(&candidate.exe_path, query, &self.exclusions) {
                continue;
            }

            let main_window_known = NativeController.main_window(candidate.pid).is_some();
            let threads = platform::thread_ids(candidate.pid);
            records.push(ProcessRecord {
                pid: candidate.pid,
                exe_path: candidate.exe_path,
                main_window_known,
                threads,
            });
        }

        tracing::debug!(matched = records.len(), "process scan complete");
        Ok(records)
    }
}

/// Run one scan on the blocking pool.
///
/// A scan takes tens of milliseconds on a busy system (the Windows path
/// goes through WMI), too long to block a runtime thread. The scanner is
/// built inside the task so the future is `'static`; flip the cancel
/// flag to abandon a scan that is no longer wanted.
pub async fn scan_in_background(
    exclusions: ExclusionList,
    query: ScanQuery,
    cancel: Arc<AtomicBool>,
) -> Result<Vec<ProcessRecord>, ScanError> {
    let task = tokio::task::spawn_blocking(move || {
        ProcessScanner::new(exclusions).find_matching_processes_with_cancel(&query, &cancel)
    });

    match task.await {
        Ok(result) => result,
        Err(join_err) => Err(ScanError::QueryUnavailable(format!(
            "scan task failed: {join_err}"
        ))),
    }
}

/// A pid present in both listings with a usable executable path.
struct Candidate {
    pid: u32,
    exe_path: PathBuf,
}

/// Join the pid listing with the path listing on pid.
///
/// A pid in one listing but not the other belongs to a process that
/// started or exited between the two snapshots; it is dropped here and
/// will be picked up by the next scan if it still exists.
fn join_listings(listing: Vec<(u32, String)>, mut paths: HashMap<u32, PathBuf>) -> Vec<Candidate> {
    listing
        .into_iter()
        .filter_map(|(pid, name)| match paths.remove(&pid) {
            Some(exe_path) if !exe_path.as_os_str().is_empty() => Some(Candidate { pid, exe_path }),
            _ => {
                tracing::trace!(pid, process = %name, "no executable path for process; dropped");
                None
            }
        })
        .collect()
}

/// Whether an executable path satisfies the query.
///
/// All comparisons are textual and case-insensitive, matching how the
/// paths were configured by hand in a library entry. No filesystem
/// canonicalization: the process may already be gone by the time we
/// would stat anything.
fn record_matches(exe_path: &Path, query: &ScanQuery, exclusions: &ExclusionList) -> bool {
    let folded = exe_path.to_string_lossy().to_lowercase();

    match &query.target {
        MatchTarget::ExactPath(target) => folded == target.to_string_lossy().to_lowercase(),
        MatchTarget::InstallDir(dir) => {
            if !folded.starts_with(&dir.to_string_lossy().to_lowercase()) {
                return false;
            }
            if query.use_exclusion_list {
                let file_name = exe_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if exclusions.excludes(&file_name) {
                    return false;
                }
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paths() -> HashMap<u32, PathBuf> {
        let mut paths = HashMap::new();
        paths.insert(100, PathBuf::from(r"C:\Games\Sample\bin\Game.exe"));
        paths.insert(101, PathBuf::from(r"C:\Games\Sample\bin\setup.exe"));
        paths.insert(102, PathBuf::from(r"C:\Other\x.exe"));
        paths
    }

    fn sample_listing() -> Vec<(u32, String)> {
        vec![
            (100, "Game.exe".to_string()),
            (101, "setup.exe".to_string()),
            (102, "x.exe".to_string()),
        ]
    }

    fn matching_pids(query: &ScanQuery, exclusions: &ExclusionList) -> Vec<u32> {
        join_listings(sample_listing(), sample_paths())
            .into_iter()
            .filter(|c| record_matches(&c.exe_path, query, exclusions))
            .map(|c| c.pid)
            .collect()
    }

    #[test]
    fn install_dir_scan_filters_excluded_tools() {
        let query = ScanQuery::install_dir(r"C:\Games\Sample", true);
        let pids = matching_pids(&query, &ExclusionList::bundled());
        assert_eq!(pids, vec![100]);
    }

    #[test]
    fn install_dir_scan_without_exclusions_keeps_setup() {
        let query = ScanQuery::install_dir(r"C:\Games\Sample", false);
        let pids = matching_pids(&query, &ExclusionList::bundled());
        assert_eq!(pids, vec![100, 101]);
    }

    #[test]
    fn exact_path_ignores_exclusion_list() {
        // setup.exe is on the exclusion list, but an exact path wins.
        let query = ScanQuery::exact_path(r"C:\Games\Sample\bin\setup.exe");
        let pids = matching_pids(&query, &ExclusionList::bundled());
        assert_eq!(pids, vec![101]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let query = ScanQuery::exact_path(r"c:\games\sample\bin\GAME.EXE");
        let pids = matching_pids(&query, &ExclusionList::bundled());
        assert_eq!(pids, vec![100]);

        let query = ScanQuery::install_dir(r"c:\gAmEs\sAmPlE", false);
        let pids = matching_pids(&query, &ExclusionList::bundled());
        assert_eq!(pids, vec![100, 101]);
    }

    #[test]
    fn unrelated_directory_never_matches() {
        let query = ScanQuery::install_dir(r"C:\Games\Sample", false);
        let pids = matching_pids(&query, &ExclusionList::empty());
        assert!(!pids.contains(&102));
    }

    #[test]
    fn join_drops_pids_missing_from_either_listing() {
        // 103 exited after the pid listing; 104 started after it.
        let mut listing = sample_listing();
        listing.push((103, "ghost.exe".to_string()));
        let mut paths = sample_paths();
        paths.insert(104, PathBuf::from(r"C:\Games\Sample\bin\late.exe"));

        let candidates = join_listings(listing, paths);
        let pids: Vec<u32> = candidates.iter().map(|c| c.pid).collect();
        assert_eq!(pids, vec![100, 101, 102]);
    }

    #[test]
    fn join_drops_empty_paths() {
        let listing = vec![(200, "svchost.exe".to_string())];
        let mut paths = HashMap::new();
        paths.insert(200, PathBuf::new());

        assert!(join_listings(listing, paths).is_empty());
    }

    #[test]
    fn cancelled_scan_returns_no_partial_results() {
        let mut scanner = ProcessScanner::new(ExclusionList::empty());
        let cancel = AtomicBool::new(true);
        let query = ScanQuery::install_dir("/", false);

        let result = scanner.find_matching_processes_with_cancel(&query, &cancel);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }
}
