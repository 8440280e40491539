//! 파이프라인 trait -- 장기 실행 컴포넌트의 생명주기 정의
//!
//! [`Pipeline`]은 데몬이 관리하는 모든 장기 실행 컴포넌트가 구현하는 trait입니다.
//! RPITIT를 사용하므로 구체 타입으로 보관합니다.
//!
//! # 생명주기
//! ```text
//! Initialized → start() → Running → stop() → Stopped
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::AgentError;

/// 박싱된 Send future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 컴포넌트 건강 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상 동작
    Healthy,
    /// 동작 중이나 일부 기능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 기능 저하 상태인지 확인합니다.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 장기 실행 컴포넌트의 생명주기 trait
pub trait Pipeline: Send + Sync {
    /// 컴포넌트를 시작합니다.
    ///
    /// 이미 실행 중이면 `PipelineError::AlreadyRunning`을 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), AgentError>> + Send;

    /// 컴포넌트를 정지합니다.
    ///
    /// 실행 중이 아니면 `PipelineError::NotRunning`을 반환합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), AgentError>> + Send;

    /// 컴포넌트의 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
