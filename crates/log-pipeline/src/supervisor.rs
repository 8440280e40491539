//! 파이프라인 감독자 -- 큐, 전송기, 모니터의 생명주기를 관리합니다.
//!
//! [`PipelineSupervisor`]는 core의 [`Pipeline`] trait을 구현하여
//! 데몬에서 start/stop/health_check로 관리됩니다.
//!
//! # 시작/정지 순서
//! ```text
//! start: 큐 용량 적용 -> 전송기 시작 -> 소스별 모니터 시작
//! stop:  모니터 정지(각각 제한 시간) -> 전송기 정지 -> stopped 신호
//! ```
//!
//! 모니터나 전송기 생성 실패는 기록만 하고 나머지 구성 요소는 계속 시작합니다.
//! 전송기가 시작되지 않으면 health_check는 Unhealthy를 보고합니다.

use std::sync::Arc;

use eventship_core::config::SourceConfig;
use eventship_core::error::{AgentError, PipelineError};
use eventship_core::pipeline::{HealthStatus, Pipeline};
use tokio::sync::watch;

use crate::config::PipelineSettings;
use crate::error::LogPipelineError;
use crate::monitor::{
    EventLogMonitor, EventSourceFactory, FileMonitor, MonitorHandle, ProcessMonitor,
};
use crate::queue::BoundedEventQueue;
use crate::sender::DeliverySender;
use crate::sink::Sink;

/// 큐 사용률 경고 임계값
const QUEUE_DEGRADED_UTILIZATION: f64 = 0.9;

/// 감독자 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupervisorState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 수집/전송 파이프라인 감독자
///
/// # 사용 예시
/// ```ignore
/// use eventship_log_pipeline::{PipelineSettings, PipelineSupervisorBuilder};
///
/// let mut supervisor = PipelineSupervisorBuilder::new()
///     .settings(PipelineSettings::from_core(&config.pipeline))
///     .build()?;
///
/// supervisor.start().await?;
/// ```
pub struct PipelineSupervisor {
    settings: PipelineSettings,
    queue: Arc<BoundedEventQueue>,
    sender: DeliverySender,
    factory: Option<Arc<dyn EventSourceFactory>>,
    monitors: Vec<MonitorHandle>,
    failed_sources: Vec<String>,
    sender_failure: Option<String>,
    state: SupervisorState,
    stopped_tx: watch::Sender<bool>,
}

impl PipelineSupervisor {
    /// 현재 상태 이름
    pub fn state_name(&self) -> &'static str {
        match self.state {
            SupervisorState::Initialized => "initialized",
            SupervisorState::Running => "running",
            SupervisorState::Stopped => "stopped",
        }
    }

    /// 공유 큐
    pub fn queue(&self) -> &Arc<BoundedEventQueue> {
        &self.queue
    }

    /// 실행 중인 모니터 수
    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// 시작에 실패한 소스 이름
    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }

    /// 정지 완료 신호 수신기
    ///
    /// `stop()`이 끝나면 값이 `true`로 바뀝니다.
    pub fn stopped_signal(&self) -> watch::Receiver<bool> {
        self.stopped_tx.subscribe()
    }

    /// 설정된 소스마다 모니터를 시작합니다.
    fn start_monitors(&mut self) {
        for (idx, source) in self.settings.sources.iter().enumerate() {
            let name = format!("{}-{idx}", source.kind());
            match self.spawn_monitor(&name, source) {
                Ok(Some(handle)) => {
                    tracing::info!(monitor = %name, "monitor started");
                    self.monitors.push(handle);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(monitor = %name, error = %e, "failed to start monitor");
                    self.failed_sources.push(name);
                }
            }
        }
    }

    fn spawn_monitor(
        &self,
        name: &str,
        source: &SourceConfig,
    ) -> Result<Option<MonitorHandle>, LogPipelineError> {
        let queue = Arc::clone(&self.queue);
        let format = self.settings.output_format_for(source)?;

        let handle = match source {
            SourceConfig::EventLog(config) => {
                let Some(factory) = self.factory.as_deref() else {
                    return Err(LogPipelineError::Source {
                        source_type: source.kind().to_owned(),
                        reason: "no event log provider available on this platform".to_owned(),
                    });
                };
                EventLogMonitor::spawn(
                    name,
                    config,
                    factory,
                    format,
                    queue,
                    self.settings.monitor_poll_interval,
                )?
            }
            SourceConfig::File(config) => FileMonitor::spawn(name, config, format, queue)?,
            SourceConfig::Process(config) => ProcessMonitor::spawn(name, config, format, queue)?,
            SourceConfig::Trace(config) => {
                tracing::warn!(
                    monitor = %name,
                    providers = config.providers.len(),
                    "trace sources are not supported on this platform, skipping"
                );
                return Ok(None);
            }
        };
        Ok(Some(handle))
    }
}

impl Pipeline for PipelineSupervisor {
    async fn start(&mut self) -> Result<(), AgentError> {
        if self.state == SupervisorState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        if self.state == SupervisorState::Stopped {
            return Err(PipelineError::InitFailed(
                "pipeline cannot be restarted after stop".to_owned(),
            )
            .into());
        }

        tracing::info!(sources = self.settings.sources.len(), "starting pipeline");

        // 1. 큐 용량
        let capacity = self.queue.set_max_size(self.settings.queue_capacity);
        tracing::info!(capacity, "event queue configured");

        // 2. 전송기
        if let Err(e) = self.sender.start(&self.settings) {
            tracing::error!(error = %e, "delivery sender failed to start");
            self.sender_failure = Some(e.to_string());
        }

        // 3. 모니터
        self.start_monitors();

        self.state = SupervisorState::Running;
        tracing::info!(
            monitors = self.monitors.len(),
            failed = self.failed_sources.len(),
            "pipeline started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), AgentError> {
        if self.state != SupervisorState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!(monitors = self.monitors.len(), "stopping pipeline");

        // 1. 새 레코드 생산 중단
        let timeout = self.settings.monitor_stop_timeout;
        for monitor in self.monitors.iter_mut() {
            monitor.stop(timeout).await;
        }
        self.monitors.clear();

        // 2. 전송기
        self.sender.stop();
        if let Err(e) = self.sender.join(timeout).await {
            tracing::error!(error = %e, "delivery sender shutdown timed out");
        }

        self.state = SupervisorState::Stopped;
        self.stopped_tx.send_replace(true);
        tracing::info!(
            remaining = self.queue.size(),
            evicted = self.queue.evicted_count(),
            "pipeline stopped"
        );
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            SupervisorState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            SupervisorState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
            SupervisorState::Running => {
                if let Some(reason) = &self.sender_failure {
                    return HealthStatus::Unhealthy(format!(
                        "delivery sender failed to start: {reason}"
                    ));
                }
                if !self.sender.is_running() {
                    return HealthStatus::Unhealthy("delivery sender is not running".to_owned());
                }

                let utilization = self.queue.utilization();
                if utilization > QUEUE_DEGRADED_UTILIZATION {
                    return HealthStatus::Degraded(format!(
                        "queue utilization high: {:.1}%",
                        utilization * 100.0
                    ));
                }

                if !self.failed_sources.is_empty() {
                    return HealthStatus::Degraded(format!(
                        "sources failed to start: {}",
                        self.failed_sources.join(", ")
                    ));
                }

                let finished: Vec<_> = self
                    .monitors
                    .iter()
                    .filter(|m| m.is_finished())
                    .map(MonitorHandle::name)
                    .collect();
                if !finished.is_empty() {
                    return HealthStatus::Degraded(format!(
                        "monitors exited: {}",
                        finished.join(", ")
                    ));
                }

                HealthStatus::Healthy
            }
        }
    }
}

/// 감독자 빌더
pub struct PipelineSupervisorBuilder {
    settings: PipelineSettings,
    queue: Option<Arc<BoundedEventQueue>>,
    factory: Option<Arc<dyn EventSourceFactory>>,
    sink: Option<Arc<dyn Sink>>,
}

impl PipelineSupervisorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            settings: PipelineSettings::default(),
            queue: None,
            factory: None,
            sink: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 공유 큐를 지정합니다. 지정하지 않으면 새로 만듭니다.
    pub fn queue(mut self, queue: Arc<BoundedEventQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// 이벤트 로그 소스 팩토리를 지정합니다.
    ///
    /// 지정하지 않으면 event_log 소스는 시작에 실패한 소스로 기록됩니다.
    pub fn event_source_factory(mut self, factory: Arc<dyn EventSourceFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// 전송 싱크를 직접 지정합니다. 지정하지 않으면 설정에 따라 고릅니다.
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 감독자를 빌드합니다.
    pub fn build(self) -> Result<PipelineSupervisor, LogPipelineError> {
        self.settings.validate()?;

        let queue = self
            .queue
            .unwrap_or_else(|| Arc::new(BoundedEventQueue::new()));
        let sender = match self.sink {
            Some(sink) => DeliverySender::with_sink(Arc::clone(&queue), sink),
            None => DeliverySender::new(Arc::clone(&queue)),
        };
        let (stopped_tx, _) = watch::channel(false);

        Ok(PipelineSupervisor {
            settings: self.settings,
            queue,
            sender,
            factory: self.factory,
            monitors: Vec::new(),
            failed_sources: Vec::new(),
            sender_failure: None,
            state: SupervisorState::Initialized,
            stopped_tx,
        })
    }
}

impl Default for PipelineSupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
