//! 이벤트 로그 모니터
//!
//! 채널마다 [`EventSource`]를 열고, 주기마다 도착한 이벤트를 모두 렌더링해서
//! 큐에 넣습니다. 이벤트 하나의 렌더링 실패는 기록 후 건너뜁니다.

use std::sync::Arc;
use std::time::Duration;

use eventship_core::config::EventLogSourceConfig;
use eventship_core::metrics as m;
use metrics::counter;
use tokio_util::sync::CancellationToken;

use super::{
    EventSource, EventSourceFactory, MonitorHandle, MonitorState, StateCell, emit,
    wait_or_cancelled,
};
use crate::error::LogPipelineError;
use crate::format::OutputFormat;
use crate::queue::BoundedEventQueue;
use crate::record::render_event;

const KIND: &str = "event_log";

/// 이벤트 로그 모니터 생성기
pub struct EventLogMonitor;

impl EventLogMonitor {
    /// 채널을 구독하고 모니터 태스크를 시작합니다.
    ///
    /// 구독에 성공한 채널이 하나도 없거나 런타임이 없으면 에러입니다.
    pub fn spawn(
        name: impl Into<String>,
        config: &EventLogSourceConfig,
        factory: &dyn EventSourceFactory,
        format: OutputFormat,
        queue: Arc<BoundedEventQueue>,
        poll_interval: Duration,
    ) -> Result<MonitorHandle, LogPipelineError> {
        let name = name.into();
        let state = StateCell::new();
        state.set(MonitorState::Subscribing);

        let mut sources = Vec::with_capacity(config.channels.len());
        for channel in &config.channels {
            match factory.open(channel, config.start_at_oldest_record) {
                Ok(source) => {
                    tracing::info!(
                        monitor = %name,
                        channel = %channel.name,
                        level = ?channel.level,
                        "subscribed to event log channel"
                    );
                    sources.push((channel.name.clone(), source));
                }
                Err(e) => {
                    tracing::error!(
                        monitor = %name,
                        channel = %channel.name,
                        error = %e,
                        "failed to subscribe to event log channel"
                    );
                }
            }
        }

        if sources.is_empty() {
            return Err(LogPipelineError::Source {
                source_type: KIND.to_owned(),
                reason: format!("monitor '{name}' could not subscribe to any channel"),
            });
        }

        let multi_line = config.event_format_multi_line;
        MonitorHandle::spawn(name.clone(), KIND, state, move |cancel, state| {
            run(name, sources, multi_line, format, queue, poll_interval, cancel, state)
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    name: String,
    mut sources: Vec<(String, Box<dyn EventSource>)>,
    multi_line: bool,
    format: OutputFormat,
    queue: Arc<BoundedEventQueue>,
    poll_interval: Duration,
    cancel: CancellationToken,
    state: StateCell,
) {
    state.set(MonitorState::Running);
    tracing::info!(monitor = %name, format = format.name(), "event log monitor running");

    loop {
        for (channel, source) in sources.iter_mut() {
            let events = match source.next_batch() {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(monitor = %name, channel = %channel, error = %e, "failed to read events");
                    continue;
                }
            };

            for raw in &events {
                match render_event(raw, multi_line) {
                    Ok(entry) => {
                        emit(&queue, &format, &entry, KIND);
                    }
                    Err(e) => {
                        counter!(m::MONITOR_RENDER_ERRORS_TOTAL, m::LABEL_SOURCE => KIND)
                            .increment(1);
                        tracing::warn!(
                            monitor = %name,
                            channel = %channel,
                            event_id = raw.event_id,
                            error = %e,
                            "failed to render event, skipped"
                        );
                    }
                }
            }
        }

        if wait_or_cancelled(&cancel, poll_interval).await {
            break;
        }
    }
}
