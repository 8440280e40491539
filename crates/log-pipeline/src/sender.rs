//! 배치 전송기 -- 주기적으로 큐를 비워 싱크로 전달합니다.
//!
//! [`DeliverySender`]는 전송 태스크 하나를 관리합니다. 태스크는 주기마다
//! [`DeliveryCycle::run_once`]를 실행하고, 정지 토큰과 전송 주기 중 먼저 오는
//! 쪽을 기다립니다.
//!
//! # 상태 전이
//! ```text
//! Idle -> start() -> Running -> stop() -> Draining -> Stopped
//! ```
//!
//! 전달에 실패한 배치는 버리지 않고 다음 주기에 새 레코드를 덧붙여 재시도합니다.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use eventship_core::metrics as m;
use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::batch::JsonBatch;
use crate::config::PipelineSettings;
use crate::error::LogPipelineError;
use crate::queue::BoundedEventQueue;
use crate::sink::{FileSink, HttpSink, Sink};

/// 전송기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// 생성됨, 아직 시작하지 않음
    Idle,
    /// 전송 루프 실행 중
    Running,
    /// 정지 요청됨, 진행 중인 주기를 마무리하는 중
    Draining,
    /// 루프 종료
    Stopped,
}

impl SenderState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

type SharedState = Arc<Mutex<SenderState>>;

fn set_state(state: &SharedState, next: SenderState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// 한 번의 전송 주기 (큐 드레인 + 전달)
///
/// 배치는 전달에 성공할 때만 비워집니다.
pub struct DeliveryCycle {
    queue: Arc<BoundedEventQueue>,
    sink: Arc<dyn Sink>,
    batch: JsonBatch,
    max_send_events: usize,
}

impl DeliveryCycle {
    pub fn new(queue: Arc<BoundedEventQueue>, sink: Arc<dyn Sink>, max_send_events: usize) -> Self {
        Self {
            queue,
            sink,
            batch: JsonBatch::new(),
            max_send_events,
        }
    }

    /// 현재 보류 중인 배치
    pub fn batch(&self) -> &JsonBatch {
        &self.batch
    }

    /// 큐에서 최대 `max_send_events`개를 꺼내 배치에 붙입니다.
    ///
    /// 배치에 붙일 수 없는 레코드를 만나면 큐에 남겨두고 이번 드레인을 끝냅니다.
    /// 꺼낸 레코드 수를 반환합니다.
    pub fn drain(&mut self) -> usize {
        let target = self.queue.size().min(self.max_send_events);
        let mut drained = 0;

        while drained < target && !self.queue.is_empty() {
            let record = self.queue.peek();
            if let Err(e) = self.batch.append(&record) {
                tracing::warn!(error = %e, "record could not be added to batch, leaving it queued");
                break;
            }
            self.queue.pop();
            drained += 1;
        }

        drained
    }

    /// 드레인 후 싱크로 전달합니다.
    ///
    /// 성공하면 전달한 레코드 수를 반환하고 배치를 `[]`로 되돌립니다.
    pub async fn run_once(&mut self) -> Result<usize, LogPipelineError> {
        let drained = self.drain();
        let sink_name = self.sink.name();
        let started = Instant::now();

        match self.sink.deliver(self.batch.as_str()).await {
            Ok(()) => {
                let sent = self.batch.len();
                histogram!(m::SENDER_DELIVERY_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
                if sent > 0 {
                    counter!(m::SENDER_DELIVERIES_TOTAL, m::LABEL_SINK => sink_name, m::LABEL_RESULT => "success")
                        .increment(1);
                    counter!(m::SENDER_EVENTS_SENT_TOTAL).increment(sent as u64);
                    tracing::debug!(sink = sink_name, drained, sent, "batch delivered");
                }
                self.batch.reset();
                Ok(sent)
            }
            Err(e) => {
                counter!(m::SENDER_DELIVERIES_TOTAL, m::LABEL_SINK => sink_name, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::error!(
                    sink = sink_name,
                    error = %e,
                    retained = self.batch.len(),
                    "batch delivery failed, retrying next interval"
                );
                Err(e)
            }
        }
    }
}

/// 배치 전송기
pub struct DeliverySender {
    queue: Arc<BoundedEventQueue>,
    sink: Option<Arc<dyn Sink>>,
    state: SharedState,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DeliverySender {
    /// 설정에 따라 싱크를 고르는 전송기를 만듭니다.
    pub fn new(queue: Arc<BoundedEventQueue>) -> Self {
        Self {
            queue,
            sink: None,
            state: Arc::new(Mutex::new(SenderState::Idle)),
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    /// 지정한 싱크로 전달하는 전송기를 만듭니다.
    pub fn with_sink(queue: Arc<BoundedEventQueue>, sink: Arc<dyn Sink>) -> Self {
        let mut sender = Self::new(queue);
        sender.sink = Some(sink);
        sender
    }

    /// 현재 상태
    pub fn state(&self) -> SenderState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state() == SenderState::Running
    }

    /// 전송 루프를 시작합니다.
    ///
    /// 파이프라인 생명주기 동안 한 번만 호출할 수 있습니다.
    pub fn start(&mut self, settings: &PipelineSettings) -> Result<(), LogPipelineError> {
        if self.handle.is_some() || self.state() != SenderState::Idle {
            return Err(LogPipelineError::AlreadyRunning("delivery sender".to_owned()));
        }

        let sink: Arc<dyn Sink> = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None if settings.uses_remote_sink() => {
                Arc::new(HttpSink::new(&settings.send_url_path, settings.http_timeout)?)
            }
            None => Arc::new(FileSink::new(&settings.send_local_path)),
        };

        tracing::info!(
            interval_secs = settings.send_interval.as_secs(),
            max_send_events = settings.max_send_events,
            local_path = %settings.send_local_path,
            url = %settings.send_url_path,
            sink = sink.name(),
            "starting delivery sender"
        );

        let cycle = DeliveryCycle::new(Arc::clone(&self.queue), sink, settings.max_send_events);
        set_state(&self.state, SenderState::Running);
        self.handle = Some(tokio::spawn(run_loop(
            cycle,
            settings.send_interval,
            self.cancel.clone(),
            Arc::clone(&self.state),
        )));
        Ok(())
    }

    /// 정지를 요청합니다. 루프 종료를 기다리지 않습니다.
    pub fn stop(&self) {
        if self.state() == SenderState::Running {
            set_state(&self.state, SenderState::Draining);
        }
        self.cancel.cancel();
    }

    /// 루프 종료를 최대 `timeout`만큼 기다립니다.
    ///
    /// 시간 안에 끝나지 않으면 태스크를 중단하고 에러를 반환합니다.
    pub async fn join(&mut self, timeout: Duration) -> Result<(), LogPipelineError> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "delivery sender task failed");
                set_state(&self.state, SenderState::Stopped);
                Ok(())
            }
            Err(_) => {
                handle.abort();
                set_state(&self.state, SenderState::Stopped);
                tracing::error!(
                    timeout_ms = timeout.as_millis() as u64,
                    "delivery sender did not stop in time, aborted"
                );
                Err(LogPipelineError::StopTimeout {
                    component: "delivery sender".to_owned(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

impl Drop for DeliverySender {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    mut cycle: DeliveryCycle,
    interval: Duration,
    cancel: CancellationToken,
    state: SharedState,
) {
    loop {
        // 에러는 run_once 안에서 기록되고 배치는 보존된다
        let _ = cycle.run_once().await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    if !cycle.batch().is_empty() {
        tracing::warn!(
            pending = cycle.batch().len(),
            "delivery sender stopped with undelivered records"
        );
    }
    set_state(&state, SenderState::Stopped);
    tracing::info!("delivery sender stopped");
}
