use clap::Parser;
use std::path::PathBuf;
use vigil_core::Config;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Watch an installation log and record LLM-analyzed observations")]
pub struct Cli {
    /// Log file to watch
    #[arg(long, value_name = "FILE")]
    pub log: PathBuf,

    /// Observation output file (defaults to <log>.observations.md)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Operating mode: observe, alert, or pause
    #[arg(long, default_value = "observe")]
    pub mode: String,

    /// Analysis backend: cloud, ollama, or both
    #[arg(long = "llm-backend", default_value = "ollama")]
    pub llm_backend: String,

    /// Cloud model identifier
    #[arg(long = "cloud-model", default_value = "gpt-4o", value_name = "NAME")]
    pub cloud_model: String,

    /// Local model identifier
    #[arg(long = "ollama-model", default_value = "llama3", value_name = "NAME")]
    pub ollama_model: String,

    /// System prompt file (built-in default when omitted)
    #[arg(long = "system-prompt", value_name = "FILE")]
    pub system_prompt: Option<PathBuf>,

    /// Seconds between poll iterations
    #[arg(long, default_value_t = 5, value_name = "SECONDS")]
    pub interval: u64,

    /// Debounce window in seconds
    #[arg(long, default_value_t = 30, value_name = "SECONDS")]
    pub debounce: u64,

    /// Watch context ("bootstrap" enables authentication patterns)
    #[arg(long, default_value = "install")]
    pub context: String,

    /// Suppress console echo of observations
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<Config> {
        let mode = self.mode.parse().map_err(anyhow::Error::msg)?;
        let backend = self.llm_backend.parse().map_err(anyhow::Error::msg)?;

        let mut config = Config::new(self.log);
        config.output = self.output;
        config.mode = mode;
        config.backend = backend;
        config.cloud_model = self.cloud_model;
        config.ollama_model = self.ollama_model;
        config.system_prompt_file = self.system_prompt;
        config.poll_interval = std::time::Duration::from_secs(self.interval);
        config.debounce_window = chrono::Duration::seconds(self.debounce as i64);
        config.context = self.context;
        config.quiet = self.quiet;
        Ok(config)
    }
}
