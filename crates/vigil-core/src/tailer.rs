//! Incremental log reads with a persisted byte offset

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use vigil_telemetry::{atomic_write, SentinelPaths};

/// Result of one tail poll
#[derive(Debug, PartialEq, Eq)]
pub enum TailEvent {
    /// Bytes appended since the last poll (lossy UTF-8)
    Data(String),
    /// Nothing new
    Unchanged,
    /// The log file does not exist yet; caller backs off and retries
    NotFound,
}

/// Tracks a monotonically growing log file's read offset.
///
/// The offset is persisted to the `<log>.sentinel-last-check` marker after
/// every successful read, so a restarted sentinel resumes where it left off.
/// A file that shrank (rotation, truncation) resets the offset to 0; the next
/// poll treats the whole file as new.
pub struct Tailer {
    log: PathBuf,
    marker: PathBuf,
    offset: u64,
}

impl Tailer {
    pub fn new(paths: &SentinelPaths) -> Self {
        let marker = paths.offset_marker();
        let offset = load_offset(&marker);
        Self {
            log: paths.log.clone(),
            marker,
            offset,
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read bytes appended since the last poll
    pub fn poll(&mut self) -> std::io::Result<TailEvent> {
        let metadata = match std::fs::metadata(&self.log) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TailEvent::NotFound),
            Err(e) => return Err(e),
        };

        let len = metadata.len();
        if len < self.offset {
            // Shrank or rotated: start over from the top on the next poll
            self.offset = 0;
            self.persist_offset()?;
            return Ok(TailEvent::Unchanged);
        }
        if len == self.offset {
            return Ok(TailEvent::Unchanged);
        }

        let mut file = File::open(&self.log)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buffer = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buffer)?;

        self.offset += buffer.len() as u64;
        self.persist_offset()?;

        Ok(TailEvent::Data(
            String::from_utf8_lossy(&buffer).into_owned(),
        ))
    }

    fn persist_offset(&self) -> std::io::Result<()> {
        atomic_write(&self.marker, self.offset.to_string().as_bytes())
    }
}

fn load_offset(marker: &std::path::Path) -> u64 {
    std::fs::read_to_string(marker)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}
