pub mod control;
pub mod error;
pub mod exclusions;
pub mod platform;
pub mod scanner;
pub mod shutdown;

pub use control::{resume_process, suspend_process, ExitRequest, ProcessController, WindowHandle};
pub use error::{ControlError, ScanError};
pub use exclusions::ExclusionList;
pub use platform::NativeController;
pub use scanner::{scan_in_background, MatchTarget, ProcessRecord, ProcessScanner, ScanQuery};
pub use shutdown::{close_all, close_one, CloseOutcome, CloseReport, CloseResult};
