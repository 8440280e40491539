//! 파이프라인 설정
//!
//! [`PipelineSettings`]는 core의 [`PipelineConfig`](eventship_core::config::PipelineConfig)를
//! 런타임 타입(`Duration`, [`OutputFormat`])으로 변환한 설정입니다.
//! 시작 후에는 바뀌지 않으며, 변경하려면 재시작해야 합니다.
//!
//! # 사용 예시
//! ```ignore
//! use eventship_core::config::AgentConfig;
//! use eventship_log_pipeline::config::PipelineSettings;
//!
//! let core_config = AgentConfig::default();
//! let settings = PipelineSettings::from_core(&core_config.pipeline);
//! ```

use std::time::Duration;

use eventship_core::config::{PipelineConfig, QUEUE_HARD_LIMIT, SourceConfig};

use crate::error::LogPipelineError;
use crate::format::OutputFormat;

/// 파이프라인 런타임 설정
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// 큐 용량
    pub queue_capacity: usize,
    /// 전송 주기
    pub send_interval: Duration,
    /// 주기당 최대 전송 레코드 수
    pub max_send_events: usize,
    /// 로컬 파일 싱크 디렉토리
    pub send_local_path: String,
    /// 원격 싱크 URL (빈 문자열이면 파일 싱크)
    pub send_url_path: String,
    /// HTTP 요청 타임아웃
    pub http_timeout: Duration,
    /// 모니터 대기 주기
    pub monitor_poll_interval: Duration,
    /// 모니터 종료 대기 시간
    pub monitor_stop_timeout: Duration,
    /// 전역 출력 형식 이름
    pub log_format: String,
    /// 수집 소스
    pub sources: Vec<SourceConfig>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_core(&PipelineConfig::default())
    }
}

impl PipelineSettings {
    /// core 설정에서 런타임 설정을 만듭니다.
    pub fn from_core(core: &PipelineConfig) -> Self {
        Self {
            queue_capacity: core.max_queue_events,
            send_interval: Duration::from_secs(core.send_interval_mins.saturating_mul(60)),
            max_send_events: core.max_send_events,
            send_local_path: core.send_local_path.clone(),
            send_url_path: core.send_url_path.clone(),
            http_timeout: Duration::from_secs(core.http_timeout_secs),
            monitor_poll_interval: Duration::from_secs(core.monitor_poll_secs),
            monitor_stop_timeout: Duration::from_secs(core.monitor_stop_timeout_secs),
            log_format: core.log_format.clone(),
            sources: core.sources.clone(),
        }
    }

    /// 소스에 적용할 출력 형식을 결정합니다.
    ///
    /// 소스별 오버라이드가 있으면 그것을, 없으면 전역 형식을 사용합니다.
    pub fn output_format_for(&self, source: &SourceConfig) -> Result<OutputFormat, LogPipelineError> {
        let name = source.log_format_override().unwrap_or(&self.log_format);
        OutputFormat::from_name(name, source.custom_log_format())
    }

    /// 원격 싱크를 사용하는지 확인합니다.
    pub fn uses_remote_sink(&self) -> bool {
        !self.send_url_path.is_empty()
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.queue_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "queue_capacity".to_owned(),
                reason: format!("must be 1-{QUEUE_HARD_LIMIT} (larger values are clamped)"),
            });
        }

        if self.send_interval.is_zero() {
            return Err(LogPipelineError::Config {
                field: "send_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_send_events == 0 {
            return Err(LogPipelineError::Config {
                field: "max_send_events".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.monitor_poll_interval.is_zero() {
            return Err(LogPipelineError::Config {
                field: "monitor_poll_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineSettingsBuilder {
    settings: PipelineSettings,
}

impl PipelineSettingsBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 큐 용량을 설정합니다.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.settings.queue_capacity = capacity;
        self
    }

    /// 전송 주기를 설정합니다.
    pub fn send_interval(mut self, interval: Duration) -> Self {
        self.settings.send_interval = interval;
        self
    }

    /// 주기당 최대 전송 레코드 수를 설정합니다.
    pub fn max_send_events(mut self, max: usize) -> Self {
        self.settings.max_send_events = max;
        self
    }

    /// 로컬 싱크 디렉토리를 설정합니다.
    pub fn send_local_path(mut self, path: impl Into<String>) -> Self {
        self.settings.send_local_path = path.into();
        self
    }

    /// 원격 싱크 URL을 설정합니다.
    pub fn send_url_path(mut self, url: impl Into<String>) -> Self {
        self.settings.send_url_path = url.into();
        self
    }

    /// HTTP 타임아웃을 설정합니다.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.settings.http_timeout = timeout;
        self
    }

    /// 모니터 대기 주기를 설정합니다.
    pub fn monitor_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.monitor_poll_interval = interval;
        self
    }

    /// 모니터 종료 대기 시간을 설정합니다.
    pub fn monitor_stop_timeout(mut self, timeout: Duration) -> Self {
        self.settings.monitor_stop_timeout = timeout;
        self
    }

    /// 전역 출력 형식을 설정합니다.
    pub fn log_format(mut self, format: impl Into<String>) -> Self {
        self.settings.log_format = format.into();
        self
    }

    /// 소스를 추가합니다.
    pub fn source(mut self, source: SourceConfig) -> Self {
        self.settings.sources.push(source);
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<PipelineSettings, LogPipelineError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
