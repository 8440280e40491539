//! 에러 타입 -- 도메인별 에러 정의

/// eventship 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중인 파이프라인을 다시 시작하려 함
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아닌 파이프라인을 정지하려 함
    #[error("pipeline is not running")]
    NotRunning,

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 종료 대기 시간 초과
    #[error("shutdown timed out after {timeout_ms}ms: {component}")]
    ShutdownTimeout { component: String, timeout_ms: u64 },
}
