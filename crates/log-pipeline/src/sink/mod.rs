//! 전송 싱크 -- 배치 페이로드의 최종 목적지
//!
//! - [`file`]: 로컬 디렉토리에 타임스탬프 파일로 기록
//! - [`http`]: 원격 엔드포인트로 POST
//!
//! 전송기는 원격 URL이 비어 있으면 파일 싱크를, 아니면 HTTP 싱크를 사용합니다.

pub mod file;
pub mod http;

use eventship_core::pipeline::BoxFuture;

use crate::error::LogPipelineError;
use crate::record::local_stamp;

pub use file::{FileSink, sanitize_folder_path};
pub use http::HttpSink;

/// 이보다 짧은 페이로드(`[]` 등)는 전달하지 않습니다.
pub const MIN_PAYLOAD_LEN: usize = 3;

/// 배치 전달 대상
///
/// `Arc<dyn Sink>`로 공유되므로 dyn-compatible한 형태로 정의합니다.
pub trait Sink: Send + Sync {
    /// 싱크 이름 (메트릭 레이블, 로그용)
    fn name(&self) -> &'static str;

    /// 페이로드 전체를 전달합니다. 실패하면 호출자가 배치를 보존합니다.
    fn deliver<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, Result<(), LogPipelineError>>;
}

/// `output_<YYYYMMDD>_<HHMMSS>.json` 형식의 파일 이름 (로컬 시각)
pub fn timestamped_filename() -> String {
    format!("output_{}.json", local_stamp())
}
