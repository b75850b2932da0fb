//! Signature debouncing and the analysis cache

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use vigil_telemetry::{atomic_write, SentinelPaths};

/// Stable digest of a captured snippet, the dedup and cache key
pub fn signature(snippet: &str) -> String {
    let digest = Sha256::digest(snippet.trim().as_bytes());
    hex::encode(&digest[..8])
}

#[derive(Debug, Serialize, Deserialize)]
struct ReportRecord {
    last_reported: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    analysis: String,
    last_used: DateTime<Utc>,
}

/// Per-signature report debouncing plus the analysis cache.
///
/// Both maps live in memory and mirror to flat files in the state directory
/// (`error-<hash>.state`, `analysis-<hash>.cache`) so a restarted sentinel
/// keeps its history. Persistence failures are logged and tolerated; the
/// in-memory state stays authoritative.
pub struct DebounceCache {
    paths: SentinelPaths,
    window: Duration,
    analysis_ttl: Duration,
    reported: HashMap<String, DateTime<Utc>>,
    analyses: HashMap<String, CacheRecord>,
}

impl DebounceCache {
    pub fn new(paths: SentinelPaths, window: Duration, analysis_ttl: Duration) -> Self {
        let mut cache = Self {
            paths,
            window,
            analysis_ttl,
            reported: HashMap::new(),
            analyses: HashMap::new(),
        };
        cache.load_state_dir();
        cache
    }

    /// True when the signature is unseen or its debounce window has expired
    pub fn should_report(&self, sig: &str, now: DateTime<Utc>) -> bool {
        match self.reported.get(sig) {
            Some(last) => now.signed_duration_since(*last) >= self.window,
            None => true,
        }
    }

    pub fn mark_reported(&mut self, sig: &str, now: DateTime<Utc>) {
        self.reported.insert(sig.to_string(), now);
        let record = ReportRecord { last_reported: now };
        self.persist(&self.paths.error_state_file(sig), &record);
    }

    pub fn is_analyzed(&self, sig: &str) -> bool {
        self.analyses.contains_key(sig)
    }

    pub fn cache_analysis(&mut self, sig: &str, analysis: &str, now: DateTime<Utc>) {
        let record = CacheRecord {
            analysis: analysis.to_string(),
            last_used: now,
        };
        self.persist(&self.paths.analysis_cache_file(sig), &record);
        self.analyses.insert(sig.to_string(), record);
    }

    /// Fetch a cached analysis, refreshing its last-used timestamp
    pub fn cached(&mut self, sig: &str, now: DateTime<Utc>) -> Option<String> {
        let record = self.analyses.get_mut(sig)?;
        record.last_used = now;
        let copy = record.clone();
        self.persist(&self.paths.analysis_cache_file(sig), &copy);
        Some(copy.analysis)
    }

    /// Drop analysis entries idle longer than the TTL
    pub fn evict_stale(&mut self, now: DateTime<Utc>) {
        let ttl = self.analysis_ttl;
        let stale: Vec<String> = self
            .analyses
            .iter()
            .filter(|(_, record)| now.signed_duration_since(record.last_used) > ttl)
            .map(|(sig, _)| sig.clone())
            .collect();

        for sig in stale {
            self.analyses.remove(&sig);
            let _ = std::fs::remove_file(self.paths.analysis_cache_file(&sig));
        }
    }

    fn load_state_dir(&mut self) {
        let entries = match std::fs::read_dir(&self.paths.state_dir) {
            Ok(entries) => entries,
            Err(_) => return, // First run, nothing persisted yet
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if let Some(sig) = strip_affixes(&name, "error-", ".state") {
                if let Some(record) = read_json::<ReportRecord>(&entry.path()) {
                    self.reported.insert(sig.to_string(), record.last_reported);
                }
            } else if let Some(sig) = strip_affixes(&name, "analysis-", ".cache") {
                if let Some(record) = read_json::<CacheRecord>(&entry.path()) {
                    self.analyses.insert(sig.to_string(), record);
                }
            }
        }
    }

    fn persist<T: Serialize>(&self, path: &std::path::Path, record: &T) {
        let json = match serde_json::to_string_pretty(record) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize state for {}: {}", path.display(), e);
                return;
            }
        };
        if let Err(e) = atomic_write(path, json.as_bytes()) {
            tracing::warn!("failed to persist {}: {}", path.display(), e);
        }
    }
}

fn strip_affixes<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &std::path::Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}
