//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 수집/포맷/전송 파이프라인 내부에서 발생하는 에러를 표현합니다.
//! `From<LogPipelineError> for AgentError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use eventship_core::error::{AgentError, ConfigError, PipelineError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 이벤트 렌더링 실패
    #[error("render error: {0}")]
    Render(String),

    /// 배치에 추가할 수 없는 레코드
    #[error("record rejected: {0}")]
    RecordRejected(String),

    /// 소스 구독/생성 실패
    #[error("source error: {source_type}: {reason}")]
    Source {
        /// 소스 유형 (event_log, file, process)
        source_type: String,
        /// 실패 사유
        reason: String,
    },

    /// 싱크 전달 실패
    #[error("sink error: {sink}: {reason}")]
    Sink {
        /// 싱크 이름 (file, http)
        sink: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 이미 시작된 컴포넌트
    #[error("{0} is already running")]
    AlreadyRunning(String),

    /// 태스크 종료 대기 시간 초과
    #[error("{component} did not stop within {timeout_ms}ms")]
    StopTimeout {
        /// 컴포넌트 이름
        component: String,
        /// 대기 시간
        timeout_ms: u64,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP 클라이언트 에러
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<LogPipelineError> for AgentError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                AgentError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::AlreadyRunning(_) => {
                AgentError::Pipeline(PipelineError::AlreadyRunning)
            }
            LogPipelineError::StopTimeout {
                component,
                timeout_ms,
            } => AgentError::Pipeline(PipelineError::ShutdownTimeout {
                component,
                timeout_ms,
            }),
            LogPipelineError::Io(e) => AgentError::Io(e),
            other => AgentError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_error_display() {
        let err = LogPipelineError::Sink {
            sink: "file".to_owned(),
            reason: "short write".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("file"));
        assert!(msg.contains("short write"));
    }

    #[test]
    fn config_error_maps_to_agent_config_error() {
        let err = LogPipelineError::Config {
            field: "max_send_events".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let agent: AgentError = err.into();
        assert!(matches!(
            agent,
            AgentError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn already_running_maps_to_pipeline_error() {
        let agent: AgentError = LogPipelineError::AlreadyRunning("sender".to_owned()).into();
        assert!(matches!(
            agent,
            AgentError::Pipeline(PipelineError::AlreadyRunning)
        ));
    }

    #[test]
    fn source_error_converts_to_init_failed() {
        let err = LogPipelineError::Source {
            source_type: "event_log".to_owned(),
            reason: "channel not found".to_owned(),
        };
        let agent: AgentError = err.into();
        assert!(matches!(
            agent,
            AgentError::Pipeline(PipelineError::InitFailed(_))
        ));
    }
}
