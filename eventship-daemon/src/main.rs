use anyhow::Result;
use clap::Parser;

use eventship_core::config::AgentConfig;
use eventship_daemon::cli::DaemonCli;
use eventship_daemon::logging::init_tracing;
use eventship_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = AgentConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "eventship-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await
}
