//! Error pattern detection over newly appended log content

use regex::Regex;
use vigil_telemetry::Severity;

const BASE_KEYWORDS: &[&str] = &[
    "error",
    "failed",
    "warn",
    "exception",
    "timeout",
    "connection refused",
    "permission denied",
    "not found",
    "requires",
];

/// Extension set active in the bootstrap context
const BOOTSTRAP_KEYWORDS: &[&str] = &[
    "password",
    "passphrase",
    "credential",
    "keychain",
    "keyring",
    "biometric",
    "touch id",
];

/// Stateless scanner for error-like lines.
///
/// Matching is a case-insensitive alternation over the keyword table; the
/// bootstrap context adds authentication-related keywords on top.
pub struct PatternDetector {
    matcher: Regex,
    max_lines: usize,
}

impl PatternDetector {
    pub fn new(context: &str, max_lines: usize) -> Self {
        let mut keywords: Vec<&str> = BASE_KEYWORDS.to_vec();
        if context == "bootstrap" {
            keywords.extend_from_slice(BOOTSTRAP_KEYWORDS);
        }

        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&format!("(?i)({})", alternation)).unwrap();

        Self { matcher, max_lines }
    }

    /// Return the first matching lines as a snippet, or None when clean
    pub fn scan(&self, content: &str) -> Option<String> {
        let lines: Vec<&str> = content
            .lines()
            .filter(|line| self.matcher.is_match(line))
            .take(self.max_lines)
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Rough severity for a snippet before any analysis has run.
/// Warning-only snippets stay WARN; anything fatal-looking is CRITICAL.
pub fn severity_hint(snippet: &str) -> Severity {
    let lower = snippet.to_lowercase();
    if lower.contains("critical") || lower.contains("fatal") {
        return Severity::Critical;
    }
    let error_like = [
        "error",
        "failed",
        "exception",
        "permission denied",
        "connection refused",
    ];
    if error_like.iter().any(|k| lower.contains(k)) {
        Severity::Error
    } else {
        Severity::Warn
    }
}
