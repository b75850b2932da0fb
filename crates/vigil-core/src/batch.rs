//! Accumulation of error snippets between analysis flushes

use chrono::{DateTime, Duration, Utc};

/// One snippet awaiting analysis
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub signature: String,
    pub snippet: String,
}

/// Collects snippets until the batch is old enough or big enough to flush
pub struct BatchBuffer {
    entries: Vec<BatchEntry>,
    started: Option<DateTime<Utc>>,
    window: Duration,
    max_lines: usize,
}

impl BatchBuffer {
    pub fn new(window: Duration, max_lines: usize) -> Self {
        Self {
            entries: Vec::new(),
            started: None,
            window,
            max_lines,
        }
    }

    pub fn push(&mut self, signature: &str, snippet: &str, now: DateTime<Utc>) {
        if self.started.is_none() {
            self.started = Some(now);
        }
        self.entries.push(BatchEntry {
            signature: signature.to_string(),
            snippet: snippet.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total snippet lines accumulated
    pub fn line_count(&self) -> usize {
        self.entries.iter().map(|e| e.snippet.lines().count()).sum()
    }

    /// True once the batch age exceeds the window or enough lines piled up
    pub fn should_flush(&self, now: DateTime<Utc>) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if self.line_count() >= self.max_lines {
            return true;
        }
        match self.started {
            Some(started) => now.signed_duration_since(started) > self.window,
            None => false,
        }
    }

    /// Take all accumulated entries, resetting the batch clock
    pub fn drain(&mut self) -> Vec<BatchEntry> {
        self.started = None;
        std::mem::take(&mut self.entries)
    }
}
