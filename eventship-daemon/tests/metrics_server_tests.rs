//! Metrics server configuration tests.

use eventship_core::config::MetricsConfig;
use eventship_daemon::metrics_server;
use serial_test::serial;

fn config(listen_addr: &str, port: u16, endpoint: &str) -> MetricsConfig {
    MetricsConfig {
        enabled: true,
        listen_addr: listen_addr.to_owned(),
        port,
        endpoint: endpoint.to_owned(),
    }
}

#[test]
#[serial]
fn test_rejects_invalid_address() {
    let result = metrics_server::install_metrics_recorder(&config("999.999.999.999", 9464, "/metrics"));
    let err = result.unwrap_err().to_string();
    assert!(err.contains("invalid metrics listen address"), "got: {err}");
}

#[test]
#[serial]
fn test_rejects_unsupported_endpoint() {
    let result = metrics_server::install_metrics_recorder(&config("127.0.0.1", 19_464, "/custom"));
    let err = result.unwrap_err().to_string();
    assert!(err.contains("unsupported metrics endpoint"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn test_installs_recorder_on_ephemeral_port() {
    let result = metrics_server::install_metrics_recorder(&config("127.0.0.1", 0, "/metrics"));
    assert!(result.is_ok(), "install failed: {:?}", result.err());

    // a second global recorder cannot be installed
    let again = metrics_server::install_metrics_recorder(&config("127.0.0.1", 0, "/metrics"));
    assert!(again.is_err());
}
