use std::path::{Path, PathBuf};
use vigil_analyze::{AnalyzeError, Analyzer};
use vigil_core::{Config, Mode, Sentinel};
use vigil_telemetry::SentinelPaths;

/// Counts invocations and returns a canned analysis
pub struct MockAnalyzer {
    pub calls: usize,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self { calls: 0 }
    }
}

impl Analyzer for MockAnalyzer {
    fn analyze(&mut self, snippet: &str) -> Result<String, AnalyzeError> {
        self.calls += 1;
        Ok(format!(
            "Severity: ERROR\nPattern: {}\nSuggested action: retry",
            snippet.lines().next().unwrap_or("unknown")
        ))
    }
}

pub struct Watch {
    pub _dir: tempfile::TempDir,
    pub log: PathBuf,
    pub sentinel: Sentinel<MockAnalyzer>,
}

/// A sentinel over a fresh temp log with an isolated state directory.
/// Disk thresholds are zeroed so no real host can trip them.
pub fn watch_fixture(mode: Mode) -> Watch {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("install.log");
    std::fs::write(&log, "").unwrap();

    let mut config = Config::new(log.clone());
    config.mode = mode;
    config.quiet = true;
    config.disk_warn_gb = 0.0;
    config.disk_critical_gb = 0.0;

    let paths = SentinelPaths::with_state_dir(&log, &dir.path().join("state"));
    let sentinel = Sentinel::with_paths(config, paths, MockAnalyzer::new());

    Watch {
        _dir: dir,
        log,
        sentinel,
    }
}

pub fn append(log: &Path, line: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(log).unwrap();
    writeln!(file, "{}", line).unwrap();
}
