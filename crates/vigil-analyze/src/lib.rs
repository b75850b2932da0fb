//! External LLM invocation for error-snippet analysis

mod backend;
mod compare;
mod prompt;

pub use backend::{Analyzer, AnalyzeError, Backend, CommandAnalyzer};
pub use compare::{join_outputs, severity_verdict};
pub use prompt::{build_user_prompt, load_system_prompt, DEFAULT_SYSTEM_PROMPT};
