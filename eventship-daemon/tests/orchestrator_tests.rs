//! Orchestrator lifecycle tests: build, PID file handling and shutdown.

use std::path::Path;

use eventship_core::config::{AgentConfig, FileSourceConfig, SourceConfig};
use eventship_daemon::orchestrator::Orchestrator;
use tempfile::TempDir;

fn config_in(dir: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.pipeline.send_local_path = dir.display().to_string();
    config
}

#[tokio::test]
async fn test_build_from_config_rejects_invalid_pipeline() {
    let temp = TempDir::new().unwrap();
    let mut config = config_in(temp.path());
    config.pipeline.max_send_events = 0;

    let result = Orchestrator::build_from_config(config);
    assert!(result.is_err(), "max_send_events = 0 must be rejected");
}

#[tokio::test]
async fn test_build_from_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let result = Orchestrator::build(&temp.path().join("missing.toml")).await;
    let err = result.err().expect("missing config file must fail");
    assert!(err.to_string().contains("failed to load config"));
}

#[tokio::test]
async fn test_build_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("eventship.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[general]
log_level = "debug"

[pipeline]
send_local_path = "{}"
max_send_events = 50
"#,
            temp.path().display()
        ),
    )
    .unwrap();

    let orchestrator = Orchestrator::build(&path).await.unwrap();
    assert_eq!(orchestrator.config().general.log_level, "debug");
    assert_eq!(orchestrator.config().pipeline.max_send_events, 50);
}

#[tokio::test]
async fn test_health_before_run_is_unhealthy() {
    let temp = TempDir::new().unwrap();
    let orchestrator = Orchestrator::build_from_config(config_in(temp.path())).unwrap();

    let health = orchestrator.health().await;
    assert!(health.status.is_unhealthy());
    assert_eq!(health.queue_depth, 0);
    assert_eq!(health.monitors, 0);
}

#[tokio::test]
async fn test_run_writes_and_removes_pid_file() {
    let temp = TempDir::new().unwrap();
    let pid_path = temp.path().join("run").join("eventship.pid");
    let mut config = config_in(temp.path());
    config.general.pid_file = pid_path.display().to_string();

    let mut orchestrator = Orchestrator::build_from_config(config).unwrap();

    let observed = pid_path.clone();
    orchestrator
        .run_until(async move {
            assert!(observed.exists(), "PID file should exist while running");
            Ok("test")
        })
        .await
        .unwrap();

    assert!(!pid_path.exists(), "PID file should be removed after shutdown");
}

#[tokio::test]
async fn test_existing_pid_file_blocks_startup() {
    let temp = TempDir::new().unwrap();
    let pid_path = temp.path().join("eventship.pid");
    std::fs::write(&pid_path, "4242\n").unwrap();

    let mut config = config_in(temp.path());
    config.general.pid_file = pid_path.display().to_string();
    let mut orchestrator = Orchestrator::build_from_config(config).unwrap();

    let err = orchestrator
        .run_until(async { Ok("test") })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("4242"));
    assert_eq!(std::fs::read_to_string(&pid_path).unwrap(), "4242\n");
}

#[tokio::test]
async fn test_shutdown_error_still_stops_pipeline() {
    let temp = TempDir::new().unwrap();
    let pid_path = temp.path().join("eventship.pid");
    let mut config = config_in(temp.path());
    config.general.pid_file = pid_path.display().to_string();
    let mut orchestrator = Orchestrator::build_from_config(config).unwrap();

    let result = orchestrator
        .run_until(async { Err(anyhow::anyhow!("signal handler unavailable")) })
        .await;

    assert!(result.is_err());
    assert!(!pid_path.exists());
    assert!(orchestrator.health().await.status.is_unhealthy());
}

#[tokio::test]
async fn test_run_with_file_source() {
    let temp = TempDir::new().unwrap();
    let logs = temp.path().join("logs");
    std::fs::create_dir(&logs).unwrap();

    let mut config = config_in(temp.path());
    config.pipeline.sources.push(SourceConfig::File(FileSourceConfig {
        directory: logs.display().to_string(),
        filter: "*.log".to_owned(),
        include_subdirectories: false,
        wait_in_seconds: 1,
        log_format: None,
        custom_log_format: String::new(),
    }));

    let mut orchestrator = Orchestrator::build_from_config(config).unwrap();
    orchestrator
        .run_until(async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok("test")
        })
        .await
        .unwrap();
}
