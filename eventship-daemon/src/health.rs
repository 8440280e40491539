//! Daemon health reporting.
//!
//! The orchestrator periodically builds a [`DaemonHealth`] from the
//! pipeline supervisor and logs it at a level matching its status.

use eventship_core::pipeline::HealthStatus;

/// Health snapshot for the whole daemon.
#[derive(Debug, Clone)]
pub struct DaemonHealth {
    /// Supervisor health.
    pub status: HealthStatus,
    /// Seconds since the orchestrator was built.
    pub uptime_secs: u64,
    /// Records currently waiting in the event queue.
    pub queue_depth: usize,
    /// Records dropped because the queue was full.
    pub queue_evicted: u64,
    /// Running source monitors.
    pub monitors: usize,
}

impl DaemonHealth {
    /// Emit this snapshot through `tracing`.
    pub fn log(&self) {
        match &self.status {
            HealthStatus::Healthy => tracing::info!(
                uptime_secs = self.uptime_secs,
                queue_depth = self.queue_depth,
                queue_evicted = self.queue_evicted,
                monitors = self.monitors,
                "daemon healthy"
            ),
            HealthStatus::Degraded(reason) => tracing::warn!(
                uptime_secs = self.uptime_secs,
                queue_depth = self.queue_depth,
                queue_evicted = self.queue_evicted,
                monitors = self.monitors,
                reason = %reason,
                "daemon degraded"
            ),
            HealthStatus::Unhealthy(reason) => tracing::error!(
                uptime_secs = self.uptime_secs,
                queue_depth = self.queue_depth,
                monitors = self.monitors,
                reason = %reason,
                "daemon unhealthy"
            ),
        }
    }
}
