//! Core sentinel machinery: tailing, pattern detection, debouncing and the watch loop

mod batch;
mod config;
mod debounce;
mod monitor;
mod patterns;
mod session;
mod tailer;

pub use batch::{BatchBuffer, BatchEntry};
pub use config::{Config, Mode};
pub use debounce::{signature, DebounceCache};
pub use monitor::{classify_free_space, DiskMonitor, DiskStatus};
pub use patterns::{severity_hint, PatternDetector};
pub use session::{Phase, Sentinel};
pub use tailer::{TailEvent, Tailer};
