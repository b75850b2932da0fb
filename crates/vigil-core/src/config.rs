//! Sentinel configuration

use chrono::Duration;
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use vigil_analyze::Backend;

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Record observations to the output file only
    Observe,
    /// Also echo observations to the console
    Alert,
    /// Alert, plus request a stop once the critical threshold is reached
    Pause,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Observe => "observe",
            Mode::Alert => "alert",
            Mode::Pause => "pause",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observe" => Ok(Mode::Observe),
            "alert" => Ok(Mode::Alert),
            "pause" => Ok(Mode::Pause),
            other => Err(format!("unknown mode `{}`", other)),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentinel configuration, built once by the CLI and passed to constructors
#[derive(Debug, Clone)]
pub struct Config {
    /// Watched log file
    pub log: PathBuf,

    /// Observation output (defaults to `<log>.observations.md`)
    pub output: Option<PathBuf>,

    /// Operating mode
    pub mode: Mode,

    /// Analysis backend
    pub backend: Backend,

    /// Cloud model identifier
    pub cloud_model: String,

    /// Local model identifier
    pub ollama_model: String,

    /// Optional system prompt override file
    pub system_prompt_file: Option<PathBuf>,

    /// Sleep between poll iterations
    pub poll_interval: StdDuration,

    /// Minimum time between repeated observations for one signature
    pub debounce_window: Duration,

    /// Maximum age of the batch buffer before flushing
    pub batch_window: Duration,

    /// Flush the batch once this many snippet lines accumulate
    pub batch_max_lines: usize,

    /// Lines captured per snippet
    pub snippet_max_lines: usize,

    /// Analysis cache entries idle longer than this are evicted
    pub analysis_ttl: Duration,

    /// WARN below this many free GB
    pub disk_warn_gb: f64,

    /// CRITICAL below this many free GB
    pub disk_critical_gb: f64,

    /// Interval between disk checks
    pub disk_check_interval: Duration,

    /// Critical observations before a pause-mode stop
    pub critical_threshold: usize,

    /// Watch context ("install", "bootstrap", ...)
    pub context: String,

    /// Suppress console echo
    pub quiet: bool,
}

impl Config {
    pub fn new(log: PathBuf) -> Self {
        Self {
            log,
            output: None,
            mode: Mode::Observe,
            backend: Backend::Ollama,
            cloud_model: "gpt-4o".to_string(),
            ollama_model: "llama3".to_string(),
            system_prompt_file: None,
            poll_interval: StdDuration::from_secs(5),
            debounce_window: Duration::seconds(30),
            batch_window: Duration::seconds(60),
            batch_max_lines: 5,
            snippet_max_lines: 5,
            analysis_ttl: Duration::hours(1),
            disk_warn_gb: 10.0,
            disk_critical_gb: 5.0,
            disk_check_interval: Duration::seconds(60),
            critical_threshold: 3,
            context: "install".to_string(),
            quiet: false,
        }
    }
}
