//! 에러 타입 정의.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// 계좌 원장 에러.
///
/// 모두 오케스트레이션 버그를 뜻하므로 호출자는 무시하지 말고 전파해야 합니다.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccountError {
    #[error("최대 포지션 수 초과: {max}")]
    Capacity { max: usize },
    #[error("포지션을 찾을 수 없음: {id}")]
    PositionNotFound { id: Uuid },
    #[error("유효하지 않은 주문: {0}")]
    InvalidOrder(String),
    #[error("청산 시각 역전: {exit_time} < 직전 청산 {last_exit}")]
    OutOfOrderExit {
        exit_time: DateTime<Utc>,
        last_exit: DateTime<Utc>,
    },
}

/// 리스크 설정 에러.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskConfigError {
    #[error("risk_per_trade는 (0, 1] 범위여야 합니다: {0}")]
    RiskPerTrade(Decimal),
    #[error("max_trades는 1 이상이어야 합니다")]
    MaxTrades,
    #[error("min_confidence는 [0, 1] 범위여야 합니다: {0}")]
    MinConfidence(f64),
    #[error("{name}은(는) 0 이상이어야 합니다: {value}")]
    NegativeThreshold { name: &'static str, value: Decimal },
}
