mod cli;

use clap::Parser;
use cli::Cli;
use vigil_analyze::{load_system_prompt, CommandAnalyzer};
use vigil_core::Sentinel;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = cli.into_config()?;

    let system_prompt = load_system_prompt(config.system_prompt_file.as_deref());
    let mut analyzer = CommandAnalyzer::new(
        config.backend,
        &config.cloud_model,
        &config.ollama_model,
        &system_prompt,
    );

    // Missing binaries are fatal here, before the loop starts
    if let Some(warning) = analyzer.check_dependencies()? {
        tracing::warn!("{}", warning);
        config.backend = analyzer.backend();
    }

    let mut sentinel = Sentinel::new(config, analyzer);
    let phase = sentinel.run()?;
    tracing::info!("sentinel stopped ({:?})", phase);
    Ok(())
}
