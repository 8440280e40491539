//! 프로세스 모니터
//!
//! 설정된 명령을 실행하고 표준 출력/에러의 각 줄을 레코드로 만듭니다.
//! 정지 요청 시 자식 프로세스를 종료합니다.

use std::process::Stdio;
use std::sync::Arc;

use eventship_core::config::ProcessSourceConfig;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

use super::{MonitorHandle, MonitorState, StateCell, emit};
use crate::error::LogPipelineError;
use crate::format::OutputFormat;
use crate::queue::BoundedEventQueue;
use crate::record::ProcessLogEntry;

const KIND: &str = "process";

/// 프로세스 모니터 생성기
pub struct ProcessMonitor;

impl ProcessMonitor {
    /// 명령을 실행하고 출력 수집 태스크를 시작합니다.
    ///
    /// 런타임이 없거나 프로세스를 띄우지 못하면 생성 에러입니다.
    pub fn spawn(
        name: impl Into<String>,
        config: &ProcessSourceConfig,
        format: OutputFormat,
        queue: Arc<BoundedEventQueue>,
    ) -> Result<MonitorHandle, LogPipelineError> {
        let name = name.into();
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(LogPipelineError::Source {
                source_type: KIND.to_owned(),
                reason: format!("cannot spawn monitor '{name}' outside a tokio runtime"),
            });
        }

        let state = StateCell::new();
        state.set(MonitorState::Subscribing);

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LogPipelineError::Source {
                source_type: KIND.to_owned(),
                reason: format!("failed to start '{}': {e}", config.command),
            })?;

        let stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let stderr = child.stderr.take().map(|s| BufReader::new(s).lines());
        tracing::info!(
            monitor = %name,
            command = %config.command,
            pid = child.id(),
            "process started"
        );

        let command = config.command.clone();
        MonitorHandle::spawn(name.clone(), KIND, state, move |cancel, state| {
            run(name, command, child, stdout, stderr, format, queue, cancel, state)
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    name: String,
    command: String,
    mut child: Child,
    mut stdout: Option<Lines<BufReader<ChildStdout>>>,
    mut stderr: Option<Lines<BufReader<ChildStderr>>>,
    format: OutputFormat,
    queue: Arc<BoundedEventQueue>,
    cancel: CancellationToken,
    state: StateCell,
) {
    state.set(MonitorState::Running);

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(monitor = %name, error = %e, "failed to kill process");
                }
                return;
            }
            line = next_line(&mut stdout) => {
                handle_line(&name, &command, "stdout", line, &mut stdout, &format, &queue);
            }
            line = next_line(&mut stderr) => {
                handle_line(&name, &command, "stderr", line, &mut stderr, &format, &queue);
            }
        }
    }

    tokio::select! {
        _ = cancel.cancelled() => {
            let _ = child.kill().await;
        }
        status = child.wait() => match status {
            Ok(status) => tracing::info!(monitor = %name, %status, "process exited"),
            Err(e) => tracing::warn!(monitor = %name, error = %e, "failed to wait for process"),
        },
    }
}

async fn next_line<R>(reader: &mut Option<Lines<R>>) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match reader {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

fn handle_line<R>(
    name: &str,
    command: &str,
    stream: &'static str,
    line: std::io::Result<Option<String>>,
    reader: &mut Option<R>,
    format: &OutputFormat,
    queue: &BoundedEventQueue,
) {
    match line {
        Ok(Some(line)) => {
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                emit(queue, format, &ProcessLogEntry::new(command, stream, line), KIND);
            }
        }
        Ok(None) => {
            tracing::debug!(monitor = %name, stream, "process stream closed");
            *reader = None;
        }
        Err(e) => {
            tracing::warn!(monitor = %name, stream, error = %e, "failed to read process output");
            *reader = None;
        }
    }
}
