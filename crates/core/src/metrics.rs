//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `eventship_`
//! - 컴포넌트명: `queue_`, `monitor_`, `sender_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(eventship_core::metrics::QUEUE_EVENTS_PUSHED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 유형 레이블 키 (event_log, file, process)
pub const LABEL_SOURCE: &str = "source";

/// 싱크 레이블 키 (file, http)
pub const LABEL_SINK: &str = "sink";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Queue 메트릭 ────────────────────────────────────────────────────

/// Queue: 적재된 레코드 수 (counter)
pub const QUEUE_EVENTS_PUSHED_TOTAL: &str = "eventship_queue_events_pushed_total";

/// Queue: 용량 초과로 버려진 레코드 수 (counter)
pub const QUEUE_EVENTS_EVICTED_TOTAL: &str = "eventship_queue_events_evicted_total";

/// Queue: 현재 대기 중인 레코드 수 (gauge)
pub const QUEUE_DEPTH: &str = "eventship_queue_depth";

// ─── Monitor 메트릭 ──────────────────────────────────────────────────

/// Monitor: 수집된 레코드 수 (counter, label: source)
pub const MONITOR_EVENTS_COLLECTED_TOTAL: &str = "eventship_monitor_events_collected_total";

/// Monitor: 렌더링 실패로 건너뛴 이벤트 수 (counter, label: source)
pub const MONITOR_RENDER_ERRORS_TOTAL: &str = "eventship_monitor_render_errors_total";

/// Monitor: 실행 중인 모니터 수 (gauge)
pub const MONITOR_ACTIVE: &str = "eventship_monitor_active";

// ─── Sender 메트릭 ───────────────────────────────────────────────────

/// Sender: 전달 시도 수 (counter, labels: sink, result)
pub const SENDER_DELIVERIES_TOTAL: &str = "eventship_sender_deliveries_total";

/// Sender: 성공적으로 전달된 레코드 수 (counter)
pub const SENDER_EVENTS_SENT_TOTAL: &str = "eventship_sender_events_sent_total";

/// Sender: 배치 전달 소요 시간 (histogram, 초)
pub const SENDER_DELIVERY_DURATION_SECONDS: &str = "eventship_sender_delivery_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "eventship_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "eventship_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 전달 소요 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 60s 범위 (HTTP 타임아웃 포함)
pub const DELIVERY_DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 10.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Queue
    describe_counter!(
        QUEUE_EVENTS_PUSHED_TOTAL,
        "Total number of records pushed into the shared event queue"
    );
    describe_counter!(
        QUEUE_EVENTS_EVICTED_TOTAL,
        "Total number of oldest records discarded because the queue was full"
    );
    describe_gauge!(QUEUE_DEPTH, "Current number of records waiting in the queue");

    // Monitor
    describe_counter!(
        MONITOR_EVENTS_COLLECTED_TOTAL,
        "Total number of records produced by source monitors"
    );
    describe_counter!(
        MONITOR_RENDER_ERRORS_TOTAL,
        "Total number of events skipped because rendering failed"
    );
    describe_gauge!(MONITOR_ACTIVE, "Number of source monitors currently running");

    // Sender
    describe_counter!(
        SENDER_DELIVERIES_TOTAL,
        "Total number of batch delivery attempts by sink and result"
    );
    describe_counter!(
        SENDER_EVENTS_SENT_TOTAL,
        "Total number of records successfully delivered"
    );
    describe_histogram!(
        SENDER_DELIVERY_DURATION_SECONDS,
        "Time to deliver a single batch in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "eventship daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        QUEUE_EVENTS_PUSHED_TOTAL,
        QUEUE_EVENTS_EVICTED_TOTAL,
        QUEUE_DEPTH,
        MONITOR_EVENTS_COLLECTED_TOTAL,
        MONITOR_RENDER_ERRORS_TOTAL,
        MONITOR_ACTIVE,
        SENDER_DELIVERIES_TOTAL,
        SENDER_EVENTS_SENT_TOTAL,
        SENDER_DELIVERY_DURATION_SECONDS,
        DAEMON_UPTIME_SECONDS,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_eventship_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("eventship_"),
                "Metric '{}' does not start with 'eventship_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            QUEUE_EVENTS_PUSHED_TOTAL,
            QUEUE_EVENTS_EVICTED_TOTAL,
            MONITOR_EVENTS_COLLECTED_TOTAL,
            MONITOR_RENDER_ERRORS_TOTAL,
            SENDER_DELIVERIES_TOTAL,
            SENDER_EVENTS_SENT_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' must end with _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 없어도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SOURCE, LABEL_SINK, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn delivery_duration_buckets_are_sorted() {
        let buckets = DELIVERY_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
