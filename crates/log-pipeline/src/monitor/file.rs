//! 파일 모니터
//!
//! 디렉토리에서 이름 필터에 맞는 파일을 찾아 새로 추가된 줄을 레코드로 만듭니다.
//! `tail -f`와 비슷하게 동작합니다.
//!
//! - 시작 시 이미 있던 파일은 끝에서부터 읽고, 이후 생긴 파일은 처음부터 읽습니다.
//! - 파일 크기가 줄면(truncation) 처음부터 다시 읽습니다.
//! - 줄바꿈으로 끝나지 않은 마지막 줄은 다음 주기까지 보류합니다.
//! - 한 주기 읽기 한도보다 긴 줄은 한도 크기 조각으로 잘라 내보냅니다.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eventship_core::config::FileSourceConfig;
use glob::Pattern;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use super::{MonitorHandle, MonitorState, StateCell, emit, wait_or_cancelled};
use crate::error::LogPipelineError;
use crate::format::OutputFormat;
use crate::queue::BoundedEventQueue;
use crate::record::FileLogEntry;

const KIND: &str = "file";

/// 파일 상태 확인 주기
pub const FILE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 한 주기에 파일 하나에서 읽을 최대 바이트
const MAX_READ_PER_POLL: u64 = 4 * 1024 * 1024;

/// 파일 모니터 생성기
pub struct FileMonitor;

impl FileMonitor {
    /// 파일 모니터 태스크를 시작합니다.
    ///
    /// 필터가 올바른 glob 패턴이 아니면 생성 에러입니다.
    pub fn spawn(
        name: impl Into<String>,
        config: &FileSourceConfig,
        format: OutputFormat,
        queue: Arc<BoundedEventQueue>,
    ) -> Result<MonitorHandle, LogPipelineError> {
        let name = name.into();
        let filter = Pattern::new(&config.filter).map_err(|e| LogPipelineError::Source {
            source_type: KIND.to_owned(),
            reason: format!("invalid filter '{}': {e}", config.filter),
        })?;

        let tailer = Tailer {
            root: PathBuf::from(&config.directory),
            filter,
            recursive: config.include_subdirectories,
            offsets: HashMap::new(),
        };
        let wait_for_dir = Duration::from_secs(config.wait_in_seconds);

        MonitorHandle::spawn(name.clone(), KIND, StateCell::new(), move |cancel, state| {
            run(name, tailer, wait_for_dir, format, queue, cancel, state)
        })
    }
}

async fn run(
    name: String,
    mut tailer: Tailer,
    wait_for_dir: Duration,
    format: OutputFormat,
    queue: Arc<BoundedEventQueue>,
    cancel: CancellationToken,
    state: StateCell,
) {
    state.set(MonitorState::Subscribing);

    let mut waited = Duration::ZERO;
    while !tailer.root.is_dir() {
        if waited >= wait_for_dir {
            tracing::error!(
                monitor = %name,
                dir = %tailer.root.display(),
                waited_secs = waited.as_secs(),
                "directory does not exist, file monitor giving up"
            );
            return;
        }
        if wait_or_cancelled(&cancel, FILE_POLL_INTERVAL).await {
            return;
        }
        waited += FILE_POLL_INTERVAL;
    }

    // 이미 있던 파일은 현재 끝에서부터 따라간다
    if let Err(e) = tailer.seed_offsets().await {
        tracing::warn!(monitor = %name, error = %e, "failed to scan directory");
    }

    state.set(MonitorState::Running);
    tracing::info!(
        monitor = %name,
        dir = %tailer.root.display(),
        filter = %tailer.filter,
        recursive = tailer.recursive,
        "file monitor running"
    );

    loop {
        match tailer.poll().await {
            Ok(lines) => {
                for (file_name, line) in lines {
                    emit(&queue, &format, &FileLogEntry::new(file_name, line), KIND);
                }
            }
            Err(e) => {
                tracing::warn!(monitor = %name, error = %e, "failed to read log files");
            }
        }

        if wait_or_cancelled(&cancel, FILE_POLL_INTERVAL).await {
            break;
        }
    }
}

/// 디렉토리 내 파일별 읽기 위치 추적기
struct Tailer {
    root: PathBuf,
    filter: Pattern,
    recursive: bool,
    offsets: HashMap<PathBuf, u64>,
}

impl Tailer {
    async fn seed_offsets(&mut self) -> Result<(), LogPipelineError> {
        for path in self.matching_files().await? {
            let len = tokio::fs::metadata(&path).await?.len();
            self.offsets.insert(path, len);
        }
        Ok(())
    }

    /// 새로 추가된 완결된 줄을 `(파일 이름, 줄)`로 반환합니다.
    async fn poll(&mut self) -> Result<Vec<(String, String)>, LogPipelineError> {
        let mut out = Vec::new();
        let files = self.matching_files().await?;
        self.offsets.retain(|path, _| files.contains(path));

        for path in files {
            match self.read_new_lines(&path).await {
                Ok(lines) => {
                    let file_name = path.display().to_string();
                    out.extend(lines.into_iter().map(|l| (file_name.clone(), l)));
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        Ok(out)
    }

    async fn read_new_lines(&mut self, path: &Path) -> Result<Vec<String>, LogPipelineError> {
        let len = tokio::fs::metadata(path).await?.len();
        let offset = self.offsets.entry(path.to_path_buf()).or_insert(0);
        if len < *offset {
            tracing::info!(path = %path.display(), "file truncated, reading from start");
            *offset = 0;
        }
        if len == *offset {
            return Ok(Vec::new());
        }

        let mut file = tokio::fs::File::open(path).await?;
        file.seek(SeekFrom::Start(*offset)).await?;
        let mut buf = Vec::new();
        file.take((len - *offset).min(MAX_READ_PER_POLL))
            .read_to_end(&mut buf)
            .await?;

        // 마지막 줄바꿈까지만 소비한다
        let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
            if buf.len() as u64 == MAX_READ_PER_POLL {
                tracing::warn!(
                    path = %path.display(),
                    bytes = buf.len(),
                    "line exceeds read limit, emitting truncated chunk"
                );
                *offset += buf.len() as u64;
                return Ok(vec![String::from_utf8_lossy(&buf).into_owned()]);
            }
            return Ok(Vec::new());
        };
        *offset += last_newline as u64 + 1;

        Ok(String::from_utf8_lossy(&buf[..last_newline])
            .split('\n')
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    async fn matching_files(&self) -> Result<Vec<PathBuf>, LogPipelineError> {
        let mut out = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    if self.recursive {
                        pending.push(path);
                    }
                } else if file_type.is_file()
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|n| self.filter.matches(n))
                {
                    out.push(path);
                }
            }
        }

        out.sort();
        Ok(out)
    }
}
