//! eventship.toml 통합 설정 테스트
//!
//! - eventship.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use eventship_core::config::{AgentConfig, ChannelLevel, SourceConfig};
use eventship_core::error::{AgentError, ConfigError};

const EXAMPLE: &str = include_str!("../../../eventship.toml.example");

// =============================================================================
// eventship.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = AgentConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.general.pid_file, "/var/run/eventship/eventship.pid");
}

#[test]
fn example_config_passes_validation() {
    let config = AgentConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_expected_sources() {
    let config = AgentConfig::parse(EXAMPLE).expect("should parse");
    let kinds: Vec<_> = config.pipeline.sources.iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec!["event_log", "file"]);

    let SourceConfig::EventLog(event_log) = &config.pipeline.sources[0] else {
        panic!("first source should be event_log");
    };
    assert!(!event_log.event_format_multi_line);
    assert_eq!(event_log.channels.len(), 2);
    assert_eq!(event_log.channels[1].name, "application");
    assert_eq!(event_log.channels[1].level, ChannelLevel::Warning);
}

#[test]
fn example_config_matches_code_defaults() {
    let from_file = AgentConfig::parse(EXAMPLE).expect("should parse");
    let from_code = AgentConfig::default();

    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);

    assert_eq!(from_file.pipeline.log_format, from_code.pipeline.log_format);
    assert_eq!(
        from_file.pipeline.max_queue_events,
        from_code.pipeline.max_queue_events
    );
    assert_eq!(
        from_file.pipeline.send_interval_mins,
        from_code.pipeline.send_interval_mins
    );
    assert_eq!(
        from_file.pipeline.max_send_events,
        from_code.pipeline.max_send_events
    );
    assert_eq!(
        from_file.pipeline.send_url_path,
        from_code.pipeline.send_url_path
    );
    assert_eq!(
        from_file.pipeline.http_timeout_secs,
        from_code.pipeline.http_timeout_secs
    );
    assert_eq!(
        from_file.pipeline.monitor_poll_secs,
        from_code.pipeline.monitor_poll_secs
    );
    assert_eq!(
        from_file.pipeline.monitor_stop_timeout_secs,
        from_code.pipeline.monitor_stop_timeout_secs
    );

    assert_eq!(from_file.metrics.enabled, from_code.metrics.enabled);
    assert_eq!(from_file.metrics.port, from_code.metrics.port);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = AgentConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    // 나머지 섹션은 기본값
    assert_eq!(config.pipeline.max_queue_events, 10_000);
    assert!(config.pipeline.sources.is_empty());
}

#[test]
fn partial_config_pipeline_only() {
    let toml = r#"
[pipeline]
send_interval_mins = 1
send_url_path = "https://collector.local/ingest"
"#;
    let config = AgentConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.pipeline.send_interval_mins, 1);
    assert_eq!(
        config.pipeline.send_url_path,
        "https://collector.local/ingest"
    );
    assert_eq!(config.pipeline.max_send_events, 500);
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn oversized_queue_is_accepted_for_later_clamping() {
    let toml = r#"
[pipeline]
max_queue_events = 60000
"#;
    let config = AgentConfig::parse(toml).expect("should parse");
    config.validate().expect("oversized queue is clamped, not rejected");
}

#[test]
fn unknown_source_type_is_parse_error() {
    let toml = r#"
[[pipeline.sources]]
type = "registry"
key = "HKLM"
"#;
    let err = AgentConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        AgentError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("EVENTSHIP_GENERAL_LOG_LEVEL").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("EVENTSHIP_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = AgentConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("EVENTSHIP_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("EVENTSHIP_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("EVENTSHIP_PIPELINE_MAX_SEND_EVENTS").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("EVENTSHIP_PIPELINE_MAX_SEND_EVENTS", "25");
    }

    let mut config = AgentConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.pipeline.max_send_events;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("EVENTSHIP_PIPELINE_MAX_SEND_EVENTS", val),
            None => std::env::remove_var("EVENTSHIP_PIPELINE_MAX_SEND_EVENTS"),
        }
    }

    assert_eq!(result, 25);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("EVENTSHIP_METRICS_ENABLED").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("EVENTSHIP_METRICS_ENABLED", "true");
    }

    let mut config = AgentConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.metrics.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("EVENTSHIP_METRICS_ENABLED", val),
            None => std::env::remove_var("EVENTSHIP_METRICS_ENABLED"),
        }
    }

    assert!(result);
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_from_file_applies_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("eventship.toml");
    std::fs::write(&path, "[pipeline]\nmax_send_events = 0\n").expect("write");

    let err = AgentConfig::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("max_send_events"));
}

#[tokio::test]
async fn empty_file_loads_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.toml");
    std::fs::write(&path, "").expect("write");

    let config = AgentConfig::from_file(&path).await.expect("should load");
    assert_eq!(config.pipeline.log_format, "json");
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = AgentConfig::parse("[general\nlog_level = ").unwrap_err();
    assert!(matches!(
        err,
        AgentError::Config(ConfigError::ParseFailed { .. })
    ));
}
