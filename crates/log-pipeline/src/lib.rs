#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`record`]: 원시 이벤트와 소스별 레코드 타입, 타임스탬프 렌더링
//! - [`format`]: JSON / XML / 사용자 템플릿 출력 형식
//! - [`queue`]: 용량 제한 이벤트 큐 (오래된 레코드 제거)
//! - [`batch`]: JSON 배열 배치 누적기
//! - [`sink`]: 로컬 파일 / HTTP 전송 대상
//! - [`sender`]: 주기적 배치 전송 루프
//! - [`monitor`]: 소스별 수집 태스크
//! - [`supervisor`]: 전체 생명주기 관리 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 런타임 설정 (core 설정 변환)
//! - [`error`]: 도메인 에러 타입

pub mod batch;
pub mod config;
pub mod error;
pub mod format;
pub mod monitor;
pub mod queue;
pub mod record;
pub mod sender;
pub mod sink;
pub mod supervisor;

// --- 주요 타입 re-export ---

// 감독자
pub use supervisor::{PipelineSupervisor, PipelineSupervisorBuilder};

// 설정
pub use config::{PipelineSettings, PipelineSettingsBuilder};

// 에러
pub use error::LogPipelineError;

// 큐 / 배치 / 전송
pub use batch::JsonBatch;
pub use queue::BoundedEventQueue;
pub use sender::{DeliveryCycle, DeliverySender, SenderState};
pub use sink::{FileSink, HttpSink, Sink};

// 레코드 / 형식
pub use format::{CustomTemplate, OutputFormat};
pub use record::{EventLogEntry, FileLogEntry, LogRecord, ProcessLogEntry, RawEvent};

// 모니터
pub use monitor::{EventSource, EventSourceFactory, MonitorHandle, MonitorState};
