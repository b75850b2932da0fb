//! Append-only Markdown observation writer

use crate::io::{append_jsonl, append_line};
use crate::types::Observation;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Writes observation records to a Markdown file, mirroring each record to a
/// JSONL journal next to it. Records are appended, never rewritten.
#[derive(Debug, Clone)]
pub struct ObservationWriter {
    output: PathBuf,
    journal: PathBuf,
}

impl ObservationWriter {
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            journal: output.with_extension("jsonl"),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal
    }

    /// Write the session header block. Called once before the first record.
    pub fn write_header(
        &self,
        started: DateTime<Utc>,
        mode: &str,
        backend: &str,
        context: &str,
    ) -> std::io::Result<()> {
        let header = format!(
            "# Sentinel observations\n\n- Started: {}\n- Mode: {}\n- Backend: {}\n- Context: {}\n\n",
            started.to_rfc3339(),
            mode,
            backend,
            context,
        );
        append_line(&self.output, &header)
    }

    /// Append one observation record
    pub fn append(&self, obs: &Observation) -> std::io::Result<()> {
        let mut block = format!(
            "### [{}] {} — {}\n\n{}\n",
            obs.severity,
            obs.category,
            obs.timestamp.to_rfc3339(),
            obs.message.trim_end(),
        );
        if let Some(suggestion) = &obs.suggestion {
            block.push_str(&format!("\n**Suggestion:** {}\n", suggestion.trim_end()));
        }
        block.push('\n');

        append_line(&self.output, &block)?;
        append_jsonl(&self.journal, obs)
    }

    /// Write the session trailer. Called once when the sentinel stops.
    pub fn write_trailer(
        &self,
        started: DateTime<Utc>,
        stopped: DateTime<Utc>,
        critical_count: usize,
    ) -> std::io::Result<()> {
        let watched = stopped.signed_duration_since(started);
        let trailer = format!(
            "---\n\nStopped: {} (watched for {}, {} critical issue(s))\n",
            stopped.to_rfc3339(),
            format_duration_secs(watched.num_seconds().max(0)),
            critical_count,
        );
        append_line(&self.output, &trailer)
    }
}

fn format_duration_secs(total: i64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_jsonl;
    use crate::types::Severity;

    #[test]
    fn test_header_block_fields() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("obs.md");
        let writer = ObservationWriter::new(&output);

        writer
            .write_header(Utc::now(), "observe", "ollama", "install")
            .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("# Sentinel observations"));
        assert!(content.contains("- Mode: observe"));
        assert!(content.contains("- Backend: ollama"));
        assert!(content.contains("- Context: install"));
    }

    #[test]
    fn test_append_writes_markdown_and_journal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("obs.md");
        let writer = ObservationWriter::new(&output);

        let obs = Observation::new(Utc::now(), Severity::Error, "log-pattern", "Error: disk full")
            .with_suggestion("free up space");
        writer.append(&obs).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("[ERROR] log-pattern"));
        assert!(content.contains("Error: disk full"));
        assert!(content.contains("**Suggestion:** free up space"));

        let journal: Vec<Observation> = read_jsonl(writer.journal_path()).unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].category, "log-pattern");
    }

    #[test]
    fn test_records_accumulate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("obs.md");
        let writer = ObservationWriter::new(&output);

        writer
            .append(&Observation::new(Utc::now(), Severity::Warn, "disk", "low"))
            .unwrap();
        writer
            .append(&Observation::new(Utc::now(), Severity::Info, "analysis", "ok"))
            .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let warn_pos = content.find("[WARN] disk").unwrap();
        let info_pos = content.find("[INFO] analysis").unwrap();
        assert!(warn_pos < info_pos);
    }

    #[test]
    fn test_trailer_reports_duration_and_criticals() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("obs.md");
        let writer = ObservationWriter::new(&output);

        let started = Utc::now();
        let stopped = started + chrono::Duration::seconds(125);
        writer.write_trailer(started, stopped, 2).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("2m 5s"));
        assert!(content.contains("2 critical issue(s)"));
    }

    #[test]
    fn test_format_duration_secs() {
        assert_eq!(format_duration_secs(5), "5s");
        assert_eq!(format_duration_secs(65), "1m 5s");
        assert_eq!(format_duration_secs(3725), "1h 2m 5s");
    }
}
