//! System prompt handling and user prompt assembly

use std::path::Path;

const MAX_INPUT_CHARS: usize = 10000;

/// Built-in system prompt, used when no prompt file is configured or readable
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are analyzing error snippets captured from an installation log. For the \
snippet you receive, respond with:\n\
1. Severity: one of INFO, WARN, ERROR, CRITICAL.\n\
2. Pattern: a short name for the error pattern (e.g. \"disk full\", \
\"permission denied\").\n\
3. Suggested action: one concrete step the operator should take.\n\
4. Learning log candidate: yes/no — whether this failure is novel enough to \
record for later study.\n\
Keep the whole response under 10 lines.";

/// Resolve the system prompt: file contents when a readable path is given,
/// the built-in default otherwise.
pub fn load_system_prompt(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_SYSTEM_PROMPT.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => contents,
        Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) => {
            tracing::warn!("system prompt {} unreadable ({}), using default", path.display(), e);
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Assemble the user prompt for one snippet, truncating oversized input
pub fn build_user_prompt(snippet: &str) -> String {
    let truncated = truncate_chars(snippet, MAX_INPUT_CHARS);
    format!("Log snippet:\n\n{}", truncated)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
