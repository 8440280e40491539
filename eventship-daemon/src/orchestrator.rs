//! Pipeline orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] owns the loaded configuration and the pipeline
//! supervisor. It writes the PID file, starts the supervisor, logs health
//! periodically while waiting for a shutdown signal, then stops the
//! supervisor and removes the PID file.

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use eventship_core::config::AgentConfig;
use eventship_core::metrics as m;
use eventship_core::pipeline::Pipeline;
use eventship_log_pipeline::{PipelineSettings, PipelineSupervisor, PipelineSupervisorBuilder};

use crate::health::DaemonHealth;
use crate::metrics_server;
use crate::pid_file::{remove_pid_file, write_pid_file};

/// Interval between periodic health reports.
const HEALTH_REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: AgentConfig,
    supervisor: PipelineSupervisor,
    start_time: Instant,
}

impl Orchestrator {
    /// Load `eventship.toml` (with environment overrides) and build.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = AgentConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Installs the metrics recorder when `[metrics]` is enabled.
    pub fn build_from_config(config: AgentConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION"))
                .set(1.0);
        }

        // No platform event log provider is linked in; event_log sources are
        // reported as failed by the supervisor.
        let supervisor = PipelineSupervisorBuilder::new()
            .settings(PipelineSettings::from_core(&config.pipeline))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build pipeline: {}", e))?;

        tracing::info!(
            sources = config.pipeline.sources.len(),
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            supervisor,
            start_time: Instant::now(),
        })
    }

    /// Run until SIGTERM or SIGINT (Ctrl-C on non-unix platforms).
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Run until `shutdown` resolves.
    ///
    /// `shutdown` yields the name of the trigger, used for logging.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let pid_path = (!self.config.general.pid_file.is_empty())
            .then(|| self.config.general.pid_file.clone());
        if let Some(path) = &pid_path {
            write_pid_file(Path::new(path))?;
        }

        if let Err(e) = self.supervisor.start().await {
            tracing::error!(error = %e, "failed to start pipeline");
            if let Some(path) = &pid_path {
                remove_pid_file(Path::new(path));
            }
            return Err(e.into());
        }

        let signal = self.wait_reporting_health(shutdown).await;
        match &signal {
            Ok(name) => tracing::info!(signal = *name, "shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "failed to wait for shutdown signal"),
        }

        let stopped = self.supervisor.stop().await;

        if let Some(path) = &pid_path {
            remove_pid_file(Path::new(path));
        }

        signal?;
        stopped?;
        tracing::info!("eventship-daemon shut down");
        Ok(())
    }

    async fn wait_reporting_health<F>(&self, shutdown: F) -> Result<&'static str>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let mut ticker = tokio::time::interval(HEALTH_REPORT_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // first tick fires immediately
        ticker.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = &mut shutdown => return result,
                _ = ticker.tick() => {
                    let health = self.health().await;
                    if self.config.metrics.enabled {
                        metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(health.uptime_secs as f64);
                    }
                    health.log();
                }
            }
        }
    }

    /// Current health snapshot.
    pub async fn health(&self) -> DaemonHealth {
        let queue = self.supervisor.queue();
        DaemonHealth {
            status: self.supervisor.health_check().await,
            uptime_secs: self.start_time.elapsed().as_secs(),
            queue_depth: queue.size(),
            queue_evicted: queue.evicted_count(),
            monitors: self.supervisor.monitor_count(),
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Wait for SIGTERM or SIGINT and return the signal name.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl-C handler: {}", e))?;
    Ok("CTRL_C")
}
