//! 공유 이벤트 큐 -- 모니터와 전송기 사이의 유한 FIFO
//!
//! [`BoundedEventQueue`]는 포맷이 끝난 레코드 문자열을 삽입 순서대로 보관합니다.
//! 모든 모니터가 쓰고, 전송기 하나만 읽습니다.
//!
//! # 오버플로우 정책
//! 용량에 도달하면 가장 오래된 레코드를 버리고 새 레코드를 추가합니다.
//! `push`는 블록되거나 실패하지 않습니다.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use eventship_core::config::QUEUE_HARD_LIMIT;
use eventship_core::metrics as m;
use metrics::{counter, gauge};

/// 기본 큐 용량
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

struct Inner {
    records: VecDeque<String>,
    capacity: usize,
    pushed: u64,
    evicted: u64,
}

/// 유한 용량 레코드 큐
///
/// 각 연산은 내부 락을 자기 연산 동안만 잡습니다.
/// `peek` 후 `pop`은 두 개의 임계 구역이므로 소비자는 하나여야 합니다.
pub struct BoundedEventQueue {
    inner: Mutex<Inner>,
}

impl BoundedEventQueue {
    /// 기본 용량(10,000)으로 큐를 생성합니다.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// 지정한 용량으로 큐를 생성합니다. 용량은 50,000으로 클램프됩니다.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(QUEUE_HARD_LIMIT);
        Self {
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
                pushed: 0,
                evicted: 0,
            }),
        }
    }

    // 패닉한 스레드가 남긴 락이어도 VecDeque 상태는 일관적이므로 계속 사용한다
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 레코드를 뒤에 추가합니다. 가득 찼으면 맨 앞 레코드를 먼저 버립니다.
    pub fn push(&self, record: String) {
        let mut inner = self.lock();
        let mut evicted = 0u64;
        while inner.records.len() >= inner.capacity && !inner.records.is_empty() {
            inner.records.pop_front();
            evicted += 1;
        }
        if inner.capacity > 0 {
            inner.records.push_back(record);
        } else {
            evicted += 1;
        }
        inner.pushed += 1;
        inner.evicted += evicted;
        let depth = inner.records.len();
        drop(inner);

        counter!(m::QUEUE_EVENTS_PUSHED_TOTAL).increment(1);
        if evicted > 0 {
            counter!(m::QUEUE_EVENTS_EVICTED_TOTAL).increment(evicted);
            tracing::trace!(evicted, "queue full, dropped oldest record");
        }
        gauge!(m::QUEUE_DEPTH).set(depth as f64);
    }

    /// 맨 앞 레코드를 제거합니다. 비어 있으면 아무 일도 하지 않습니다.
    pub fn pop(&self) {
        let mut inner = self.lock();
        inner.records.pop_front();
        let depth = inner.records.len();
        drop(inner);
        gauge!(m::QUEUE_DEPTH).set(depth as f64);
    }

    /// 맨 앞 레코드의 복사본을 반환합니다. 비어 있으면 빈 문자열입니다.
    pub fn peek(&self) -> String {
        self.lock().records.front().cloned().unwrap_or_default()
    }

    /// 큐가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// 현재 레코드 수를 반환합니다.
    pub fn size(&self) -> usize {
        self.lock().records.len()
    }

    /// 용량을 변경합니다.
    ///
    /// 요청 값은 50,000으로 클램프되며, 초과분은 앞에서부터 버립니다.
    /// 실제 적용된 용량을 반환합니다.
    pub fn set_max_size(&self, requested: usize) -> usize {
        let capacity = requested.min(QUEUE_HARD_LIMIT);
        if capacity < requested {
            tracing::warn!(
                requested,
                limit = QUEUE_HARD_LIMIT,
                "queue capacity clamped to hard limit"
            );
        }

        let mut inner = self.lock();
        inner.capacity = capacity;
        let mut evicted = 0u64;
        while inner.records.len() > capacity {
            inner.records.pop_front();
            evicted += 1;
        }
        inner.evicted += evicted;
        drop(inner);

        if evicted > 0 {
            counter!(m::QUEUE_EVENTS_EVICTED_TOTAL).increment(evicted);
            tracing::info!(evicted, capacity, "queue resized, dropped oldest records");
        }
        capacity
    }

    /// 현재 용량을 반환합니다.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// 큐 사용률을 0.0~1.0 범위로 반환합니다.
    pub fn utilization(&self) -> f64 {
        let inner = self.lock();
        if inner.capacity == 0 {
            return 0.0;
        }
        inner.records.len() as f64 / inner.capacity as f64
    }

    /// 지금까지 추가된 레코드 수
    pub fn pushed_count(&self) -> u64 {
        self.lock().pushed
    }

    /// 지금까지 용량 초과로 버려진 레코드 수
    pub fn evicted_count(&self) -> u64 {
        self.lock().evicted
    }
}

impl Default for BoundedEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BoundedEventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("BoundedEventQueue")
            .field("size", &inner.records.len())
            .field("capacity", &inner.capacity)
            .field("evicted", &inner.evicted)
            .finish()
    }
}
