//! Observation records, sidecar paths and append-only I/O for the sentinel

mod io;
mod paths;
mod types;
mod writer;

pub use io::{append_jsonl, append_line, atomic_write, read_jsonl};
pub use paths::SentinelPaths;
pub use types::{Observation, Severity};
pub use writer::ObservationWriter;
