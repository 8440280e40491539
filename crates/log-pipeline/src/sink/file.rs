//! 로컬 파일 싱크
//!
//! 성공한 플러시마다 `output_<YYYYMMDD>_<HHMMSS>.json` 파일 하나를 씁니다.
//! 쓰기가 중간에 실패한 파일은 지우지 않습니다.

use std::path::{Component, Path, PathBuf};

use eventship_core::pipeline::BoxFuture;
use tokio::io::AsyncWriteExt;

use super::{MIN_PAYLOAD_LEN, Sink, timestamped_filename};
use crate::error::LogPipelineError;

/// 디렉토리에 배치 파일을 기록하는 싱크
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// 설정 경로를 검증해서 싱크를 만듭니다.
    ///
    /// 경로가 유효하지 않으면 실행 파일 디렉토리를 사용합니다.
    pub fn new(configured: &str) -> Self {
        let dir = sanitize_folder_path(configured);
        tracing::info!(dir = %dir.display(), "file sink directory");
        Self { dir }
    }

    /// 실제 기록 디렉토리
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_payload(&self, payload: &str) -> Result<(), LogPipelineError> {
        if payload.len() < MIN_PAYLOAD_LEN {
            tracing::debug!(len = payload.len(), "payload too short, nothing written");
            return Ok(());
        }

        let path = self.dir.join(timestamped_filename());
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            LogPipelineError::Sink {
                sink: "file".to_owned(),
                reason: format!("failed to open {}: {e}", path.display()),
            }
        })?;

        let bytes = payload.as_bytes();
        file.write_all(bytes)
            .await
            .map_err(|e| LogPipelineError::Sink {
                sink: "file".to_owned(),
                reason: format!("short write to {} ({} bytes): {e}", path.display(), bytes.len()),
            })?;
        file.flush().await?;
        file.sync_all().await?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "batch written");
        Ok(())
    }
}

impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn deliver<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<(), LogPipelineError>> {
        Box::pin(self.write_payload(payload))
    }
}

/// 싱크 디렉토리를 검증합니다.
///
/// `..` 컴포넌트가 있거나, 비어 있거나, 존재하지 않는 디렉토리면
/// 실행 파일이 있는 디렉토리로 대체합니다. 끝의 구분자는 제거합니다.
pub fn sanitize_folder_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let trimmed = match trimmed.trim_end_matches(['/', '\\']) {
        "" if !trimmed.is_empty() => &trimmed[..1],
        rest => rest,
    };

    if trimmed.is_empty() {
        return fallback_dir();
    }

    let path = Path::new(trimmed);
    let has_parent = trimmed.contains("../")
        || trimmed.contains("..\\")
        || path.components().any(|c| c == Component::ParentDir);
    if has_parent {
        tracing::warn!(path = trimmed, "sink path contains '..', using executable directory");
        return fallback_dir();
    }

    if !path.is_dir() {
        tracing::warn!(path = trimmed, "sink path does not exist, using executable directory");
        return fallback_dir();
    }

    path.to_path_buf()
}

fn fallback_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exe_dir() -> PathBuf {
        fallback_dir()
    }

    #[test]
    fn existing_directory_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().to_str().unwrap();
        assert_eq!(sanitize_folder_path(raw), dir.path());
    }

    #[test]
    fn trailing_separator_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let raw = format!("{}/", dir.path().display());
        assert_eq!(sanitize_folder_path(&raw), dir.path());
    }

    #[test]
    fn parent_components_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let raw = format!("{}/../", dir.path().display());
        assert_eq!(sanitize_folder_path(&raw), exe_dir());
        assert_eq!(sanitize_folder_path("..\\windows"), exe_dir());
    }

    #[test]
    fn missing_directory_falls_back() {
        assert_eq!(sanitize_folder_path("/definitely/not/here/eventship"), exe_dir());
        assert_eq!(sanitize_folder_path(""), exe_dir());
    }

    #[tokio::test]
    async fn writes_whole_payload_to_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().to_str().unwrap());
        sink.deliver(r#"[{"a":1}]"#).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_str().unwrap().to_owned();
        assert!(name.starts_with("output_") && name.ends_with(".json"));
        assert_eq!(std::fs::read_to_string(&entries[0]).unwrap(), r#"[{"a":1}]"#);
    }

    #[tokio::test]
    async fn empty_batch_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().to_str().unwrap());
        sink.deliver("[]").await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
