//! 소스 모니터 -- 소스별 취소 가능한 수집 태스크
//!
//! 각 모니터는 설정된 소스 하나에서 레코드를 만들어 공유 큐에 넣습니다.
//!
//! - [`event_log`]: [`EventSource`]에서 원시 이벤트를 가져와 렌더링
//! - [`file`]: 디렉토리의 텍스트 로그 파일 tail
//! - [`process`]: 자식 프로세스의 표준 출력/에러 라인
//!
//! # 상태 전이
//! ```text
//! Created -> Subscribing -> Running -> StopRequested -> Stopped
//! ```

pub mod event_log;
pub mod file;
pub mod process;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use eventship_core::config::EventLogChannel;
use eventship_core::metrics as m;
use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::LogPipelineError;
use crate::format::OutputFormat;
use crate::queue::BoundedEventQueue;
use crate::record::{LogRecord, RawEvent};

pub use event_log::EventLogMonitor;
pub use file::FileMonitor;
pub use process::ProcessMonitor;

/// 모니터 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Created,
    Subscribing,
    Running,
    StopRequested,
    Stopped,
}

impl MonitorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Subscribing => "subscribing",
            Self::Running => "running",
            Self::StopRequested => "stop_requested",
            Self::Stopped => "stopped",
        }
    }
}

/// 원시 이벤트 공급자
///
/// 플랫폼 구독 API를 감쌉니다. `next_batch`는 지금 읽을 수 있는 이벤트만
/// 반환하고 블록하지 않아야 합니다.
pub trait EventSource: Send {
    /// 지금까지 도착한 이벤트를 모두 가져옵니다. 없으면 빈 Vec입니다.
    fn next_batch(&mut self) -> Result<Vec<RawEvent>, LogPipelineError>;
}

/// 채널 설정으로 [`EventSource`]를 여는 팩토리
///
/// 레벨 필터는 구독 쿼리에서 적용합니다.
pub trait EventSourceFactory: Send + Sync {
    /// 채널을 구독합니다. 실패는 모니터 생성 에러가 됩니다.
    fn open(
        &self,
        channel: &EventLogChannel,
        start_at_oldest_record: bool,
    ) -> Result<Box<dyn EventSource>, LogPipelineError>;
}

/// 공유 상태 셀
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<Mutex<MonitorState>>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(MonitorState::Created)))
    }

    pub(crate) fn get(&self) -> MonitorState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, state: MonitorState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// 실행 중인 모니터 태스크 핸들
pub struct MonitorHandle {
    name: String,
    kind: &'static str,
    cancel: CancellationToken,
    state: StateCell,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// 모니터 태스크를 생성합니다.
    ///
    /// Tokio 런타임 밖에서 호출하면 생성 에러입니다.
    pub(crate) fn spawn<F, Fut>(
        name: impl Into<String>,
        kind: &'static str,
        state: StateCell,
        body: F,
    ) -> Result<Self, LogPipelineError>
    where
        F: FnOnce(CancellationToken, StateCell) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| LogPipelineError::Source {
            source_type: kind.to_owned(),
            reason: format!("cannot spawn monitor '{name}': {e}"),
        })?;

        let cancel = CancellationToken::new();
        let task_state = state.clone();
        let fut = body(cancel.clone(), state.clone());
        let task_name = name.clone();
        let task = runtime.spawn(async move {
            let _active = ActiveGuard::enter();
            fut.await;
            task_state.set(MonitorState::Stopped);
            tracing::info!(monitor = %task_name, "monitor stopped");
        });

        Ok(Self {
            name,
            kind,
            cancel,
            state,
            task: Some(task),
        })
    }

    /// 모니터 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 소스 유형
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// 현재 상태
    pub fn state(&self) -> MonitorState {
        self.state.get()
    }

    /// 태스크가 끝났는지 확인합니다.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 정지를 요청하고 최대 `timeout`만큼 기다립니다.
    ///
    /// 시간 초과 시 에러를 기록하고 태스크를 중단합니다.
    pub async fn stop(&mut self, timeout: Duration) {
        if self.state.get() != MonitorState::Stopped {
            self.state.set(MonitorState::StopRequested);
        }
        self.cancel.cancel();

        let Some(mut task) = self.task.take() else {
            return;
        };

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(monitor = %self.name, error = %e, "monitor task failed");
            }
            Err(_) => {
                tracing::error!(
                    monitor = %self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "monitor did not stop in time, aborting"
                );
                task.abort();
            }
        }
        self.state.set(MonitorState::Stopped);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// 실행 중인 모니터 수 게이지
///
/// 태스크가 처음 poll될 때 올리고, 정상 종료/중단/패닉으로 future가
/// drop될 때 내립니다.
struct ActiveGuard;

impl ActiveGuard {
    fn enter() -> Self {
        gauge!(m::MONITOR_ACTIVE).increment(1.0);
        Self
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        gauge!(m::MONITOR_ACTIVE).decrement(1.0);
    }
}

/// 레코드를 포맷해서 큐에 넣습니다.
///
/// 포맷 실패나 빈 결과는 기록하고 건너뜁니다. 성공하면 `true`입니다.
pub(crate) fn emit<R: LogRecord>(
    queue: &BoundedEventQueue,
    format: &OutputFormat,
    record: &R,
    source_kind: &'static str,
) -> bool {
    match format.format(record) {
        Ok(line) if !line.trim().is_empty() => {
            queue.push(line);
            counter!(m::MONITOR_EVENTS_COLLECTED_TOTAL, m::LABEL_SOURCE => source_kind).increment(1);
            true
        }
        Ok(_) => {
            counter!(m::MONITOR_RENDER_ERRORS_TOTAL, m::LABEL_SOURCE => source_kind).increment(1);
            tracing::warn!(source = source_kind, "formatted record is empty, skipped");
            false
        }
        Err(e) => {
            counter!(m::MONITOR_RENDER_ERRORS_TOTAL, m::LABEL_SOURCE => source_kind).increment(1);
            tracing::warn!(source = source_kind, error = %e, "failed to format record, skipped");
            false
        }
    }
}

/// 정지 토큰 또는 `timeout` 중 먼저 오는 쪽을 기다립니다. 정지면 `true`입니다.
pub(crate) async fn wait_or_cancelled(cancel: &CancellationToken, timeout: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(timeout) => false,
    }
}
