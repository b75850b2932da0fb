//! Path resolution for sidecar markers and the sentinel state directory

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Resolves the on-disk companions of a watched log file
#[derive(Debug, Clone)]
pub struct SentinelPaths {
    pub log: PathBuf,
    pub state_dir: PathBuf,
}

impl SentinelPaths {
    /// Create a resolver for the given log file.
    ///
    /// The state directory lands under `~/.vigil/state/<log-hash>/`, falling
    /// back to the system temp directory when no home directory is available.
    pub fn new(log: &Path) -> Self {
        let hash = log.to_string_lossy().replace(['/', '.'], "-");
        let root = dirs::home_dir()
            .map(|home| home.join(".vigil").join("state"))
            .unwrap_or_else(|| std::env::temp_dir().join("vigil-state"));

        Self {
            log: log.to_path_buf(),
            state_dir: root.join(hash),
        }
    }

    /// Create a resolver with an explicit state directory
    pub fn with_state_dir(log: &Path, state_dir: &Path) -> Self {
        Self {
            log: log.to_path_buf(),
            state_dir: state_dir.to_path_buf(),
        }
    }

    /// Byte-offset marker: `<log>.sentinel-last-check`
    pub fn offset_marker(&self) -> PathBuf {
        self.sidecar(".sentinel-last-check")
    }

    /// External stop signal: `<log>.sentinel-pause`
    pub fn pause_signal(&self) -> PathBuf {
        self.sidecar(".sentinel-pause")
    }

    /// Emitted stop request: `<log>.sentinel-pause-required`
    pub fn pause_required(&self) -> PathBuf {
        self.sidecar(".sentinel-pause-required")
    }

    /// Default observation output: `<log>.observations.md`
    pub fn default_output(&self) -> PathBuf {
        self.sidecar(".observations.md")
    }

    /// Debounce state for one signature: `error-<hash>.state`
    pub fn error_state_file(&self, signature: &str) -> PathBuf {
        self.state_dir.join(format!("error-{}.state", signature))
    }

    /// Cached analysis for one signature: `analysis-<hash>.cache`
    pub fn analysis_cache_file(&self, signature: &str) -> PathBuf {
        self.state_dir.join(format!("analysis-{}.cache", signature))
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self
            .log
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(suffix);
        self.log.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_marker_name() {
        let paths = SentinelPaths::new(Path::new("/var/log/install.log"));
        assert_eq!(
            paths.offset_marker(),
            PathBuf::from("/var/log/install.log.sentinel-last-check")
        );
    }

    #[test]
    fn test_pause_files_are_siblings_of_log() {
        let paths = SentinelPaths::new(Path::new("/tmp/boot.log"));
        assert_eq!(
            paths.pause_signal(),
            PathBuf::from("/tmp/boot.log.sentinel-pause")
        );
        assert_eq!(
            paths.pause_required(),
            PathBuf::from("/tmp/boot.log.sentinel-pause-required")
        );
    }

    #[test]
    fn test_default_output_name() {
        let paths = SentinelPaths::new(Path::new("/tmp/boot.log"));
        assert_eq!(
            paths.default_output(),
            PathBuf::from("/tmp/boot.log.observations.md")
        );
    }

    #[test]
    fn test_state_dir_distinct_per_log() {
        let a = SentinelPaths::new(Path::new("/var/log/a.log"));
        let b = SentinelPaths::new(Path::new("/var/log/b.log"));
        assert_ne!(a.state_dir, b.state_dir);
    }

    #[test]
    fn test_state_file_names_carry_signature() {
        let paths = SentinelPaths::with_state_dir(Path::new("x.log"), Path::new("/tmp/state"));
        let err = paths.error_state_file("abc123");
        let cache = paths.analysis_cache_file("abc123");
        assert_eq!(err, PathBuf::from("/tmp/state/error-abc123.state"));
        assert_eq!(cache, PathBuf::from("/tmp/state/analysis-abc123.cache"));
    }
}
