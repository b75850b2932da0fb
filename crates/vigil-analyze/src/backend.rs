//! External analysis command invocation

use crate::compare::join_outputs;
use crate::prompt::build_user_prompt;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Binary used for the cloud backend
const CLOUD_BIN: &str = "llm";
/// Binary used for the local backend
const OLLAMA_BIN: &str = "ollama";

/// Which external analysis provider to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cloud,
    Ollama,
    Both,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cloud => "cloud",
            Backend::Ollama => "ollama",
            Backend::Both => "both",
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cloud" => Ok(Backend::Cloud),
            "ollama" => Ok(Backend::Ollama),
            "both" => Ok(Backend::Both),
            other => Err(format!("unknown backend `{}`", other)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("required binary `{0}` not found on PATH")]
    MissingBinary(&'static str),
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },
    #[error("`{0}` produced no output")]
    EmptyOutput(String),
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// Seam for the external analysis call, mockable in tests
pub trait Analyzer {
    fn analyze(&mut self, snippet: &str) -> Result<String, AnalyzeError>;
}

/// Invokes the configured analysis CLI(s) and captures stdout
pub struct CommandAnalyzer {
    backend: Backend,
    cloud_model: String,
    ollama_model: String,
    system_prompt: String,
}

impl CommandAnalyzer {
    pub fn new(backend: Backend, cloud_model: &str, ollama_model: &str, system_prompt: &str) -> Self {
        Self {
            backend,
            cloud_model: cloud_model.to_string(),
            ollama_model: ollama_model.to_string(),
            system_prompt: system_prompt.to_string(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Verify the required binaries exist before the watch loop starts.
    ///
    /// A missing cloud binary falls back to ollama when that is available,
    /// returning a warning to surface to the operator. Anything else missing
    /// is fatal.
    pub fn check_dependencies(&mut self) -> Result<Option<String>, AnalyzeError> {
        let cloud_ok = binary_on_path(CLOUD_BIN);
        let ollama_ok = binary_on_path(OLLAMA_BIN);

        match self.backend {
            Backend::Cloud | Backend::Both if !cloud_ok => {
                if ollama_ok {
                    self.backend = Backend::Ollama;
                    Ok(Some(format!(
                        "`{}` not found, falling back to ollama backend",
                        CLOUD_BIN
                    )))
                } else {
                    Err(AnalyzeError::MissingBinary(CLOUD_BIN))
                }
            }
            Backend::Ollama | Backend::Both if !ollama_ok => {
                Err(AnalyzeError::MissingBinary(OLLAMA_BIN))
            }
            _ => Ok(None),
        }
    }

    fn invoke_cloud(&self, snippet: &str) -> Result<String, AnalyzeError> {
        run_command(
            Command::new(CLOUD_BIN)
                .arg("-m")
                .arg(&self.cloud_model)
                .arg("-s")
                .arg(&self.system_prompt)
                .arg(build_user_prompt(snippet)),
            CLOUD_BIN,
        )
    }

    fn invoke_ollama(&self, snippet: &str) -> Result<String, AnalyzeError> {
        // `ollama run` takes no system flag; prepend the system prompt
        let prompt = format!("{}\n\n{}", self.system_prompt, build_user_prompt(snippet));
        run_command(
            Command::new(OLLAMA_BIN)
                .arg("run")
                .arg(&self.ollama_model)
                .arg(prompt),
            OLLAMA_BIN,
        )
    }
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&mut self, snippet: &str) -> Result<String, AnalyzeError> {
        match self.backend {
            Backend::Cloud => self.invoke_cloud(snippet),
            Backend::Ollama => self.invoke_ollama(snippet),
            Backend::Both => {
                let cloud = self.invoke_cloud(snippet)?;
                let local = self.invoke_ollama(snippet)?;
                Ok(join_outputs(
                    &self.cloud_model,
                    &cloud,
                    &self.ollama_model,
                    &local,
                ))
            }
        }
    }
}

fn run_command(command: &mut Command, name: &str) -> Result<String, AnalyzeError> {
    let output = command.output().map_err(|source| AnalyzeError::Spawn {
        command: name.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(AnalyzeError::CommandFailed {
            command: name.to_string(),
            status: output.status.to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(AnalyzeError::EmptyOutput(name.to_string()));
    }
    Ok(stdout)
}

fn binary_on_path(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
