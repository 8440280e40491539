//! CLI argument definitions for eventship-daemon.

use std::path::PathBuf;

use clap::Parser;

/// eventship event shipping agent.
///
/// Collects events from the configured sources and periodically ships
/// them as JSON batches to a local directory or a remote endpoint.
#[derive(Parser, Debug)]
#[command(name = "eventship-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to eventship.toml configuration file.
    #[arg(short, long, default_value = "eventship.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path.
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut eventship_core::AgentConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
    }
}
