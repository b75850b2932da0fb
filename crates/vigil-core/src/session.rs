//! The watch session: state machine and poll loop

use crate::batch::BatchBuffer;
use crate::config::{Config, Mode};
use crate::debounce::{signature, DebounceCache};
use crate::monitor::{DiskMonitor, DiskStatus};
use crate::patterns::{severity_hint, PatternDetector};
use crate::tailer::{TailEvent, Tailer};
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use vigil_analyze::Analyzer;
use vigil_telemetry::{atomic_write, Observation, ObservationWriter, SentinelPaths, Severity};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Watching,
    /// External pause signal observed (terminal)
    Paused,
    /// Stopped from within, e.g. critical threshold reached (terminal)
    Stopped,
}

/// A single watch session over one log file.
///
/// `run` drives the blocking poll loop; `step` performs one iteration at an
/// explicit instant, which is what the tests exercise. All external analysis
/// calls block the loop for their duration.
pub struct Sentinel<A: Analyzer> {
    config: Config,
    paths: SentinelPaths,
    writer: ObservationWriter,
    tailer: Tailer,
    detector: PatternDetector,
    debounce: DebounceCache,
    batch: BatchBuffer,
    monitor: DiskMonitor,
    analyzer: A,
    phase: Phase,
    started: Option<DateTime<Utc>>,
    critical_count: usize,
}

impl<A: Analyzer> Sentinel<A> {
    pub fn new(config: Config, analyzer: A) -> Self {
        let paths = SentinelPaths::new(&config.log);
        Self::with_paths(config, paths, analyzer)
    }

    /// Construct with explicit paths (tests point the state dir elsewhere)
    pub fn with_paths(config: Config, paths: SentinelPaths, analyzer: A) -> Self {
        let output = config
            .output
            .clone()
            .unwrap_or_else(|| paths.default_output());

        let writer = ObservationWriter::new(&output);
        let tailer = Tailer::new(&paths);
        let detector = PatternDetector::new(&config.context, config.snippet_max_lines);
        let debounce = DebounceCache::new(
            paths.clone(),
            config.debounce_window,
            config.analysis_ttl,
        );
        let batch = BatchBuffer::new(config.batch_window, config.batch_max_lines);
        let monitor = DiskMonitor::new(
            config.disk_check_interval,
            config.disk_warn_gb,
            config.disk_critical_gb,
        );

        Self {
            config,
            paths,
            writer,
            tailer,
            detector,
            debounce,
            batch,
            monitor,
            analyzer,
            phase: Phase::Idle,
            started: None,
            critical_count: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn critical_count(&self) -> usize {
        self.critical_count
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn output_path(&self) -> &std::path::Path {
        self.writer.output_path()
    }

    /// Write the session header and enter the watch phase
    pub fn start(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        anyhow::ensure!(self.phase == Phase::Idle, "session already started");

        self.writer
            .write_header(
                now,
                self.config.mode.as_str(),
                &backend_label(&self.config),
                &self.config.context,
            )
            .context("failed to write observation header")?;

        self.phase = Phase::Watching;
        self.started = Some(now);
        Ok(())
    }

    /// Run the blocking poll loop until a terminal phase is reached
    pub fn run(&mut self) -> anyhow::Result<Phase> {
        self.start(Utc::now())?;
        loop {
            let phase = self.step(Utc::now())?;
            if phase != Phase::Watching {
                return Ok(phase);
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// One poll iteration at the given instant
    pub fn step(&mut self, now: DateTime<Utc>) -> anyhow::Result<Phase> {
        if self.phase != Phase::Watching {
            return Ok(self.phase);
        }

        // The pause file is the sole inter-process signal; observed, not deleted
        if self.paths.pause_signal().exists() {
            self.append(&Observation::new(
                now,
                Severity::Info,
                "session",
                "pause signal observed, stopping",
            ))?;
            self.finish(Phase::Paused, now)?;
            return Ok(self.phase);
        }

        match self.tailer.poll() {
            Ok(TailEvent::Data(content)) => self.inspect(&content, now)?,
            Ok(TailEvent::Unchanged) => {}
            Ok(TailEvent::NotFound) => {
                tracing::warn!("{} not found, waiting", self.config.log.display());
            }
            Err(e) => {
                tracing::warn!("failed to read {}: {}", self.config.log.display(), e);
            }
        }
        if self.phase != Phase::Watching {
            return Ok(self.phase);
        }

        if self.batch.should_flush(now) {
            self.flush_batch(now)?;
        }

        if self.monitor.due(now) {
            self.check_disk(now)?;
            self.debounce.evict_stale(now);
        }

        Ok(self.phase)
    }

    fn inspect(&mut self, content: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
        let Some(snippet) = self.detector.scan(content) else {
            return Ok(());
        };

        let sig = signature(&snippet);
        if !self.debounce.should_report(&sig, now) {
            return Ok(());
        }

        self.debounce.mark_reported(&sig, now);
        let severity = severity_hint(&snippet);
        self.append(&Observation::new(now, severity, "log-pattern", &snippet))?;
        self.batch.push(&sig, &snippet, now);
        self.note_critical(severity, now)
    }

    fn flush_batch(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        for entry in self.batch.drain() {
            if let Some(cached) = self.debounce.cached(&entry.signature, now) {
                self.append(&Observation::new(now, Severity::Info, "analysis", &cached))?;
                continue;
            }

            match self.analyzer.analyze(&entry.snippet) {
                Ok(text) => {
                    self.debounce.cache_analysis(&entry.signature, &text, now);
                    self.append(&Observation::new(now, Severity::Info, "analysis", &text))?;
                }
                Err(e) => {
                    // Remaining entries are dropped with the batch
                    tracing::warn!("analysis failed, discarding batch: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    fn check_disk(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        match self.monitor.check(now) {
            DiskStatus::Low { severity, free_gb } => {
                let obs = Observation::new(
                    now,
                    severity,
                    "disk",
                    &format!("{:.1} GB free on root filesystem", free_gb),
                )
                .with_suggestion("free up disk space before the installation continues");
                self.append(&obs)?;
                self.note_critical(severity, now)
            }
            DiskStatus::Healthy { .. } => Ok(()),
            DiskStatus::Unknown => {
                tracing::debug!("disk query failed, skipping classification this cycle");
                Ok(())
            }
        }
    }

    fn note_critical(&mut self, severity: Severity, now: DateTime<Utc>) -> anyhow::Result<()> {
        if severity != Severity::Critical {
            return Ok(());
        }
        self.critical_count += 1;

        if self.config.mode == Mode::Pause
            && self.critical_count >= self.config.critical_threshold
            && self.phase == Phase::Watching
        {
            let note = format!(
                "pause requested after {} critical issue(s)\n",
                self.critical_count
            );
            atomic_write(&self.paths.pause_required(), note.as_bytes())
                .context("failed to write pause request marker")?;
            self.append(&Observation::new(
                now,
                Severity::Critical,
                "session",
                "critical threshold reached, pause requested",
            ))?;
            self.finish(Phase::Stopped, now)?;
        }
        Ok(())
    }

    fn append(&mut self, obs: &Observation) -> anyhow::Result<()> {
        self.writer
            .append(obs)
            .context("failed to append observation")?;

        if self.config.mode != Mode::Observe && !self.config.quiet {
            match obs.severity {
                Severity::Critical | Severity::Error => {
                    tracing::error!("[{}] {}", obs.category, obs.message);
                }
                Severity::Warn => tracing::warn!("[{}] {}", obs.category, obs.message),
                Severity::Info => tracing::info!("[{}] {}", obs.category, obs.message),
            }
        }
        Ok(())
    }

    fn finish(&mut self, phase: Phase, now: DateTime<Utc>) -> anyhow::Result<()> {
        if self.phase != Phase::Watching {
            return Ok(());
        }
        self.writer
            .write_trailer(self.started.unwrap_or(now), now, self.critical_count)
            .context("failed to write observation trailer")?;
        self.phase = phase;
        Ok(())
    }
}

fn backend_label(config: &Config) -> String {
    use vigil_analyze::Backend;
    match config.backend {
        Backend::Cloud => format!("cloud ({})", config.cloud_model),
        Backend::Ollama => format!("ollama ({})", config.ollama_model),
        Backend::Both => format!("both ({} + {})", config.cloud_model, config.ollama_model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use vigil_analyze::AnalyzeError;

    struct ScriptedAnalyzer {
        calls: usize,
        fail: bool,
    }

    impl ScriptedAnalyzer {
        fn new() -> Self {
            Self {
                calls: 0,
                fail: false,
            }
        }
    }

    impl Analyzer for ScriptedAnalyzer {
        fn analyze(&mut self, snippet: &str) -> Result<String, AnalyzeError> {
            self.calls += 1;
            if self.fail {
                Err(AnalyzeError::EmptyOutput("mock".to_string()))
            } else {
                Ok(format!("analysis of: {}", snippet.lines().next().unwrap_or("")))
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        log: std::path::PathBuf,
        sentinel: Sentinel<ScriptedAnalyzer>,
    }

    fn fixture(mode: Mode) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("install.log");
        std::fs::write(&log, "").unwrap();

        let mut config = Config::new(log.clone());
        config.mode = mode;
        config.quiet = true;
        // Disk thresholds no real host should trip
        config.disk_warn_gb = 0.0;
        config.disk_critical_gb = 0.0;

        let paths = SentinelPaths::with_state_dir(&log, &dir.path().join("state"));
        let sentinel = Sentinel::with_paths(config, paths, ScriptedAnalyzer::new());

        Fixture {
            _dir: dir,
            log,
            sentinel,
        }
    }

    fn append_log(log: &Path, line: &str) {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(log).unwrap();
        writeln!(file, "{}", line).unwrap();
    }

    #[test]
    fn test_step_before_start_is_idle() {
        let mut fx = fixture(Mode::Observe);
        assert_eq!(fx.sentinel.step(Utc::now()).unwrap(), Phase::Idle);
    }

    #[test]
    fn test_pause_signal_stops_with_trailer() {
        let mut fx = fixture(Mode::Observe);
        let t0 = Utc::now();
        fx.sentinel.start(t0).unwrap();

        assert_eq!(fx.sentinel.step(t0).unwrap(), Phase::Watching);

        std::fs::write(
            SentinelPaths::new(&fx.log).pause_signal(),
            "stop please",
        )
        .unwrap();
        assert_eq!(
            fx.sentinel.step(t0 + chrono::Duration::seconds(5)).unwrap(),
            Phase::Paused
        );

        let output = std::fs::read_to_string(fx.sentinel.output_path()).unwrap();
        assert_eq!(output.matches("Stopped:").count(), 1);

        // The signal file is observed, not deleted
        assert!(SentinelPaths::new(&fx.log).pause_signal().exists());
    }

    #[test]
    fn test_debounce_suppresses_repeat_within_window() {
        let mut fx = fixture(Mode::Observe);
        let t0 = Utc::now();
        fx.sentinel.start(t0).unwrap();

        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0).unwrap();

        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0 + chrono::Duration::seconds(10)).unwrap();

        let output = std::fs::read_to_string(fx.sentinel.output_path()).unwrap();
        assert_eq!(output.matches("[ERROR] log-pattern").count(), 1);

        // Past the window, the same signature fires again
        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0 + chrono::Duration::seconds(40)).unwrap();

        let output = std::fs::read_to_string(fx.sentinel.output_path()).unwrap();
        assert_eq!(output.matches("[ERROR] log-pattern").count(), 2);
    }

    #[test]
    fn test_analysis_called_once_then_cached() {
        let mut fx = fixture(Mode::Observe);
        let t0 = Utc::now();
        fx.sentinel.start(t0).unwrap();

        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0).unwrap();
        // Age the batch past the window so it flushes
        fx.sentinel.step(t0 + chrono::Duration::seconds(61)).unwrap();
        assert_eq!(fx.sentinel.analyzer.calls, 1);

        // Same signature past the debounce window: reported again, replayed
        // from cache, no second call
        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0 + chrono::Duration::seconds(70)).unwrap();
        fx.sentinel
            .step(t0 + chrono::Duration::seconds(140))
            .unwrap();
        assert_eq!(fx.sentinel.analyzer.calls, 1);

        let output = std::fs::read_to_string(fx.sentinel.output_path()).unwrap();
        assert_eq!(output.matches("[INFO] analysis").count(), 2);
    }

    #[test]
    fn test_failed_analysis_discards_batch_without_cache() {
        let mut fx = fixture(Mode::Observe);
        let t0 = Utc::now();
        fx.sentinel.start(t0).unwrap();
        fx.sentinel.analyzer.fail = true;

        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0).unwrap();
        fx.sentinel.step(t0 + chrono::Duration::seconds(61)).unwrap();
        assert_eq!(fx.sentinel.analyzer.calls, 1);

        let output = std::fs::read_to_string(fx.sentinel.output_path()).unwrap();
        assert_eq!(output.matches("[INFO] analysis").count(), 0);

        // Next occurrence is a fresh attempt, not a cache replay
        fx.sentinel.analyzer.fail = false;
        append_log(&fx.log, "Error: disk full");
        fx.sentinel.step(t0 + chrono::Duration::seconds(70)).unwrap();
        fx.sentinel
            .step(t0 + chrono::Duration::seconds(140))
            .unwrap();
        assert_eq!(fx.sentinel.analyzer.calls, 2);
    }

    #[test]
    fn test_pause_mode_stops_at_critical_threshold() {
        let mut fx = fixture(Mode::Pause);
        fx.sentinel.config.critical_threshold = 2;
        let t0 = Utc::now();
        fx.sentinel.start(t0).unwrap();

        append_log(&fx.log, "FATAL: stage one exploded");
        fx.sentinel.step(t0).unwrap();
        assert_eq!(fx.sentinel.phase(), Phase::Watching);
        assert_eq!(fx.sentinel.critical_count(), 1);

        append_log(&fx.log, "CRITICAL: stage two exploded");
        let phase = fx
            .sentinel
            .step(t0 + chrono::Duration::seconds(40))
            .unwrap();
        assert_eq!(phase, Phase::Stopped);

        assert!(SentinelPaths::new(&fx.log).pause_required().exists());
        let output = std::fs::read_to_string(fx.sentinel.output_path()).unwrap();
        assert_eq!(output.matches("Stopped:").count(), 1);
        assert!(output.contains("2 critical issue(s)"));
    }

    #[test]
    fn test_observe_mode_never_requests_pause() {
        let mut fx = fixture(Mode::Observe);
        fx.sentinel.config.critical_threshold = 1;
        let t0 = Utc::now();
        fx.sentinel.start(t0).unwrap();

        append_log(&fx.log, "FATAL: broken");
        fx.sentinel.step(t0).unwrap();

        assert_eq!(fx.sentinel.phase(), Phase::Watching);
        assert!(!SentinelPaths::new(&fx.log).pause_required().exists());
    }
}
