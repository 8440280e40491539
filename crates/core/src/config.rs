//! 설정 관리 -- eventship.toml 파싱 및 런타임 설정
//!
//! [`AgentConfig`]는 에이전트 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 데몬에서 적용)
//! 2. 환경변수 (`EVENTSHIP_PIPELINE_SEND_INTERVAL_MINS=1` 형식)
//! 3. 설정 파일 (`eventship.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), eventship_core::error::AgentError> {
//! use eventship_core::config::AgentConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = AgentConfig::load("eventship.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = AgentConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AgentError, ConfigError};

/// 큐 최대 용량의 하드 상한
pub const QUEUE_HARD_LIMIT: usize = 50_000;

/// 레코드 출력 형식 이름
pub const LOG_FORMATS: [&str; 3] = ["json", "xml", "custom"];

/// eventship 통합 설정
///
/// `eventship.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집/전송 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AgentConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AgentError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, AgentError> {
        toml::from_str(toml_str).map_err(|e| {
            AgentError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `EVENTSHIP_{SECTION}_{FIELD}`
    /// 소스 목록(`pipeline.sources`)은 환경변수로 오버라이드하지 않습니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "EVENTSHIP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "EVENTSHIP_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "EVENTSHIP_GENERAL_PID_FILE");

        // Pipeline
        override_string(&mut self.pipeline.log_format, "EVENTSHIP_PIPELINE_LOG_FORMAT");
        override_usize(
            &mut self.pipeline.max_queue_events,
            "EVENTSHIP_PIPELINE_MAX_QUEUE_EVENTS",
        );
        override_u64(
            &mut self.pipeline.send_interval_mins,
            "EVENTSHIP_PIPELINE_SEND_INTERVAL_MINS",
        );
        override_usize(
            &mut self.pipeline.max_send_events,
            "EVENTSHIP_PIPELINE_MAX_SEND_EVENTS",
        );
        override_string(
            &mut self.pipeline.send_local_path,
            "EVENTSHIP_PIPELINE_SEND_LOCAL_PATH",
        );
        override_string(
            &mut self.pipeline.send_url_path,
            "EVENTSHIP_PIPELINE_SEND_URL_PATH",
        );
        override_u64(
            &mut self.pipeline.http_timeout_secs,
            "EVENTSHIP_PIPELINE_HTTP_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.pipeline.monitor_poll_secs,
            "EVENTSHIP_PIPELINE_MONITOR_POLL_SECS",
        );
        override_u64(
            &mut self.pipeline.monitor_stop_timeout_secs,
            "EVENTSHIP_PIPELINE_MONITOR_STOP_TIMEOUT_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "EVENTSHIP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "EVENTSHIP_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "EVENTSHIP_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AgentError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.pipeline.validate()?;

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0".to_owned()));
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 생성하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
    /// 스크레이프 경로 (현재 `/metrics`만 지원)
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 수집/전송 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 레코드 출력 형식 (json, xml, custom)
    pub log_format: String,
    /// 큐 최대 이벤트 수 (50,000으로 클램프)
    pub max_queue_events: usize,
    /// 전송 주기 (분)
    pub send_interval_mins: u64,
    /// 전송 주기당 최대 이벤트 수
    pub max_send_events: usize,
    /// 로컬 파일 싱크 디렉토리
    pub send_local_path: String,
    /// 원격 싱크 URL (빈 문자열이면 로컬 파일 싱크 사용)
    pub send_url_path: String,
    /// 원격 싱크 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
    /// 모니터 대기 주기 (초)
    pub monitor_poll_secs: u64,
    /// 모니터 종료 대기 시간 (초)
    pub monitor_stop_timeout_secs: u64,
    /// 수집 소스 목록
    pub sources: Vec<SourceConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_format: "json".to_owned(),
            max_queue_events: 10_000,
            send_interval_mins: 5,
            max_send_events: 500,
            send_local_path: String::new(),
            send_url_path: String::new(),
            http_timeout_secs: 30,
            monitor_poll_secs: 60,
            monitor_stop_timeout_secs: 5,
            sources: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// 파이프라인 설정을 검증합니다.
    pub fn validate(&self) -> Result<(), AgentError> {
        if !is_log_format(&self.log_format) {
            return Err(invalid(
                "pipeline.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        if self.max_queue_events == 0 {
            return Err(invalid(
                "pipeline.max_queue_events",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.max_queue_events > QUEUE_HARD_LIMIT {
            warn!(
                requested = self.max_queue_events,
                limit = QUEUE_HARD_LIMIT,
                "max_queue_events exceeds hard limit, it will be clamped"
            );
        }

        if self.send_interval_mins == 0 {
            return Err(invalid(
                "pipeline.send_interval_mins",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.max_send_events == 0 {
            return Err(invalid(
                "pipeline.max_send_events",
                "must be greater than 0".to_owned(),
            ));
        }

        if !self.send_url_path.is_empty()
            && !(self.send_url_path.starts_with("http://")
                || self.send_url_path.starts_with("https://"))
        {
            return Err(invalid(
                "pipeline.send_url_path",
                "must start with http:// or https://".to_owned(),
            ));
        }

        if self.monitor_poll_secs == 0 {
            return Err(invalid(
                "pipeline.monitor_poll_secs",
                "must be greater than 0".to_owned(),
            ));
        }

        for (idx, source) in self.sources.iter().enumerate() {
            source.validate(idx, &self.log_format)?;
        }

        Ok(())
    }
}

/// 수집 소스 설정
///
/// `type` 필드로 구분되는 태그 유니온입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Windows 이벤트 로그 채널
    #[serde(alias = "EventLog")]
    EventLog(EventLogSourceConfig),
    /// 디렉토리 내 텍스트 로그 파일
    #[serde(alias = "File")]
    File(FileSourceConfig),
    /// ETW 트레이스 프로바이더
    #[serde(alias = "ETW", alias = "etw")]
    Trace(TraceSourceConfig),
    /// 자식 프로세스 표준 출력
    #[serde(alias = "Process")]
    Process(ProcessSourceConfig),
}

impl SourceConfig {
    /// 소스 유형 이름을 반환합니다.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EventLog(_) => "event_log",
            Self::File(_) => "file",
            Self::Trace(_) => "trace",
            Self::Process(_) => "process",
        }
    }

    /// 소스별 출력 형식 오버라이드를 반환합니다.
    pub fn log_format_override(&self) -> Option<&str> {
        match self {
            Self::EventLog(c) => c.log_format.as_deref(),
            Self::File(c) => c.log_format.as_deref(),
            Self::Trace(c) => c.log_format.as_deref(),
            Self::Process(c) => c.log_format.as_deref(),
        }
    }

    /// 소스별 사용자 정의 템플릿을 반환합니다.
    pub fn custom_log_format(&self) -> &str {
        match self {
            Self::EventLog(c) => &c.custom_log_format,
            Self::File(c) => &c.custom_log_format,
            Self::Trace(c) => &c.custom_log_format,
            Self::Process(c) => &c.custom_log_format,
        }
    }

    fn validate(&self, idx: usize, global_format: &str) -> Result<(), AgentError> {
        let field = |name: &str| format!("pipeline.sources[{idx}].{name}");

        if let Some(format) = self.log_format_override() {
            if !is_log_format(format) {
                return Err(invalid(
                    &field("log_format"),
                    format!("must be one of: {}", LOG_FORMATS.join(", ")),
                ));
            }
        }

        let effective = self.log_format_override().unwrap_or(global_format);
        if effective.eq_ignore_ascii_case("custom") && self.custom_log_format().trim().is_empty() {
            return Err(invalid(
                &field("custom_log_format"),
                "required when the output format is custom".to_owned(),
            ));
        }

        match self {
            Self::EventLog(c) => {
                if c.channels.is_empty() {
                    return Err(invalid(
                        &field("channels"),
                        "at least one channel is required".to_owned(),
                    ));
                }
                if c.channels.iter().any(|ch| ch.name.trim().is_empty()) {
                    return Err(invalid(
                        &field("channels"),
                        "channel name must not be empty".to_owned(),
                    ));
                }
            }
            Self::File(c) => {
                if c.directory.trim().is_empty() {
                    return Err(invalid(
                        &field("directory"),
                        "directory must not be empty".to_owned(),
                    ));
                }
            }
            Self::Trace(c) => {
                if c.providers.is_empty() {
                    return Err(invalid(
                        &field("providers"),
                        "at least one provider is required".to_owned(),
                    ));
                }
                if c
                    .providers
                    .iter()
                    .any(|p| p.provider_name.is_empty() && p.provider_guid.is_empty())
                {
                    return Err(invalid(
                        &field("providers"),
                        "provider needs a non-empty provider_name or provider_guid".to_owned(),
                    ));
                }
            }
            Self::Process(c) => {
                if c.command.trim().is_empty() {
                    return Err(invalid(
                        &field("command"),
                        "command must not be empty".to_owned(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// 이벤트 로그 레벨 필터
///
/// 채널별로 수집할 최대 상세 수준을 지정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLevel {
    /// 치명적 이벤트만
    #[serde(alias = "Critical")]
    Critical,
    /// 에러 이상 (기본값)
    #[default]
    #[serde(alias = "Error")]
    Error,
    /// 경고 이상
    #[serde(alias = "Warning")]
    Warning,
    /// 정보 이상
    #[serde(alias = "Information", alias = "info")]
    Information,
    /// 전체
    #[serde(alias = "Verbose")]
    Verbose,
}

impl ChannelLevel {
    /// 플랫폼 레벨 값 (1=Critical .. 5=Verbose)을 반환합니다.
    pub fn as_raw(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::Error => 2,
            Self::Warning => 3,
            Self::Information => 4,
            Self::Verbose => 5,
        }
    }
}

/// 이벤트 로그 채널
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogChannel {
    /// 채널 이름 (예: "system", "application")
    pub name: String,
    /// 레벨 필터
    #[serde(default)]
    pub level: ChannelLevel,
}

/// 이벤트 로그 소스 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogSourceConfig {
    /// 구독할 채널 목록
    pub channels: Vec<EventLogChannel>,
    /// 메시지의 개행 유지 여부 (false면 공백으로 치환)
    #[serde(default = "default_true")]
    pub event_format_multi_line: bool,
    /// 가장 오래된 레코드부터 재생할지 여부
    #[serde(default)]
    pub start_at_oldest_record: bool,
    /// 출력 형식 오버라이드
    #[serde(default)]
    pub log_format: Option<String>,
    /// 사용자 정의 템플릿 (`%Field%` 토큰, `|JSON` 접미사)
    #[serde(default)]
    pub custom_log_format: String,
}

/// 파일 소스 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSourceConfig {
    /// 감시할 디렉토리
    pub directory: String,
    /// 파일 이름 필터 (glob, 기본 `*.*`)
    #[serde(default = "default_file_filter")]
    pub filter: String,
    /// 하위 디렉토리 포함 여부
    #[serde(default)]
    pub include_subdirectories: bool,
    /// 디렉토리가 생길 때까지 기다릴 최대 시간 (초, 0이면 기다리지 않음)
    #[serde(default = "default_wait_in_seconds")]
    pub wait_in_seconds: u64,
    /// 출력 형식 오버라이드
    #[serde(default)]
    pub log_format: Option<String>,
    /// 사용자 정의 템플릿
    #[serde(default)]
    pub custom_log_format: String,
}

/// ETW 프로바이더
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceProvider {
    /// 프로바이더 이름
    #[serde(default)]
    pub provider_name: String,
    /// 프로바이더 GUID
    #[serde(default)]
    pub provider_guid: String,
    /// 레벨 필터
    #[serde(default)]
    pub level: ChannelLevel,
    /// 키워드 비트마스크
    #[serde(default)]
    pub keywords: u64,
}

/// ETW 트레이스 소스 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSourceConfig {
    /// 프로바이더 목록
    pub providers: Vec<TraceProvider>,
    /// 메시지의 개행 유지 여부
    #[serde(default = "default_true")]
    pub event_format_multi_line: bool,
    /// 출력 형식 오버라이드
    #[serde(default)]
    pub log_format: Option<String>,
    /// 사용자 정의 템플릿
    #[serde(default)]
    pub custom_log_format: String,
}

/// 프로세스 소스 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSourceConfig {
    /// 실행할 명령
    pub command: String,
    /// 명령 인자
    #[serde(default)]
    pub args: Vec<String>,
    /// 출력 형식 오버라이드
    #[serde(default)]
    pub log_format: Option<String>,
    /// 사용자 정의 템플릿
    #[serde(default)]
    pub custom_log_format: String,
}

fn default_true() -> bool {
    true
}

fn default_file_filter() -> String {
    "*.*".to_owned()
}

fn default_wait_in_seconds() -> u64 {
    300
}

fn is_log_format(value: &str) -> bool {
    LOG_FORMATS.iter().any(|f| f.eq_ignore_ascii_case(value))
}

fn invalid(field: &str, reason: String) -> AgentError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const FULL_TOML: &str = r#"
[general]
log_level = "debug"
log_format = "pretty"

[pipeline]
log_format = "xml"
max_queue_events = 2000
send_interval_mins = 1
max_send_events = 50
send_local_path = "/var/spool/eventship"

[[pipeline.sources]]
type = "event_log"
start_at_oldest_record = true
channels = [
    { name = "system", level = "warning" },
    { name = "application" },
]

[[pipeline.sources]]
type = "file"
directory = "/var/log/app"
filter = "*.log"
include_subdirectories = true

[[pipeline.sources]]
type = "process"
command = "journalctl"
args = ["-f", "-o", "cat"]
log_format = "custom"
custom_log_format = "%TimeStamp% %Message%"
"#;

    #[test]
    fn default_config_has_sane_values() {
        let config = AgentConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.pipeline.max_queue_events, 10_000);
        assert_eq!(config.pipeline.send_interval_mins, 5);
        assert_eq!(config.pipeline.max_send_events, 500);
        assert_eq!(config.pipeline.monitor_poll_secs, 60);
        assert_eq!(config.pipeline.monitor_stop_timeout_secs, 5);
        assert!(config.pipeline.send_url_path.is_empty());
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        AgentConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = AgentConfig::parse("").unwrap();
        assert_eq!(config.pipeline.log_format, "json");
        assert!(config.pipeline.sources.is_empty());
    }

    #[test]
    fn from_str_full_toml() {
        let config = AgentConfig::parse(FULL_TOML).unwrap();
        config.validate().unwrap();

        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.pipeline.log_format, "xml");
        assert_eq!(config.pipeline.max_queue_events, 2000);
        assert_eq!(config.pipeline.sources.len(), 3);

        match &config.pipeline.sources[0] {
            SourceConfig::EventLog(c) => {
                assert!(c.start_at_oldest_record);
                assert!(c.event_format_multi_line);
                assert_eq!(c.channels[0].level, ChannelLevel::Warning);
                assert_eq!(c.channels[1].level, ChannelLevel::Error);
            }
            other => panic!("expected event_log source, got {}", other.kind()),
        }

        match &config.pipeline.sources[1] {
            SourceConfig::File(c) => {
                assert_eq!(c.filter, "*.log");
                assert!(c.include_subdirectories);
                assert_eq!(c.wait_in_seconds, 300);
            }
            other => panic!("expected file source, got {}", other.kind()),
        }

        let process = &config.pipeline.sources[2];
        assert_eq!(process.kind(), "process");
        assert_eq!(process.log_format_override(), Some("custom"));
        assert_eq!(process.custom_log_format(), "%TimeStamp% %Message%");
    }

    #[test]
    fn source_type_accepts_legacy_names() {
        let config = AgentConfig::parse(
            r#"
[[pipeline.sources]]
type = "ETW"
providers = [{ provider_name = "Microsoft-Windows-Kernel-Process", keywords = 16 }]
"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.sources[0].kind(), "trace");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = AgentConfig::parse("[pipeline\nmax_queue_events = ").unwrap_err();
        assert!(matches!(
            err,
            AgentError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = AgentConfig::default();
        config.general.log_level = "loud".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_unknown_record_format() {
        let mut config = AgentConfig::default();
        config.pipeline.log_format = "yaml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pipeline.log_format"));
    }

    #[test]
    fn validate_accepts_uppercase_record_format() {
        let mut config = AgentConfig::default();
        config.pipeline.log_format = "JSON".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_send_events() {
        let mut config = AgentConfig::default();
        config.pipeline.max_send_events = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let mut config = AgentConfig::default();
        config.pipeline.send_url_path = "ftp://collector/upload".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("send_url_path"));
    }

    #[test]
    fn validate_rejects_event_log_without_channels() {
        let mut config = AgentConfig::default();
        config.pipeline.sources.push(SourceConfig::EventLog(EventLogSourceConfig {
            channels: Vec::new(),
            event_format_multi_line: true,
            start_at_oldest_record: false,
            log_format: None,
            custom_log_format: String::new(),
        }));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sources[0].channels"));
    }

    #[test]
    fn validate_requires_template_for_custom_format() {
        let mut config = AgentConfig::default();
        config.pipeline.log_format = "custom".to_owned();
        config.pipeline.sources.push(SourceConfig::Process(ProcessSourceConfig {
            command: "echo".to_owned(),
            args: Vec::new(),
            log_format: None,
            custom_log_format: "  ".to_owned(),
        }));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("custom_log_format"));
    }

    #[test]
    fn channel_level_raw_values() {
        assert_eq!(ChannelLevel::Critical.as_raw(), 1);
        assert_eq!(ChannelLevel::Verbose.as_raw(), 5);
        assert!(ChannelLevel::Error < ChannelLevel::Warning);
    }

    #[test]
    #[serial]
    fn env_override_pipeline_values() {
        let mut config = AgentConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe {
            std::env::set_var("EVENTSHIP_PIPELINE_SEND_INTERVAL_MINS", "2");
            std::env::set_var("EVENTSHIP_PIPELINE_SEND_URL_PATH", "https://collector/ingest");
        }
        config.apply_env_overrides();
        assert_eq!(config.pipeline.send_interval_mins, 2);
        assert_eq!(config.pipeline.send_url_path, "https://collector/ingest");
        unsafe {
            std::env::remove_var("EVENTSHIP_PIPELINE_SEND_INTERVAL_MINS");
            std::env::remove_var("EVENTSHIP_PIPELINE_SEND_URL_PATH");
        }
    }

    #[test]
    #[serial]
    fn env_override_invalid_number_keeps_original() {
        let mut val = 500usize;
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_EVENTSHIP_USIZE_BAD", "lots") };
        override_usize(&mut val, "TEST_EVENTSHIP_USIZE_BAD");
        assert_eq!(val, 500);
        unsafe { std::env::remove_var("TEST_EVENTSHIP_USIZE_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_EVENTSHIP_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = AgentConfig::parse(FULL_TOML).unwrap();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = AgentConfig::parse(&toml_str).unwrap();
        assert_eq!(config.pipeline.sources, parsed.pipeline.sources);
        assert_eq!(config.general.log_level, parsed.general.log_level);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = AgentConfig::from_file("/nonexistent/path/eventship.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
