//! 전략의 매매 신호.
//!
//! 이 모듈은 전략이 생성하는 신호 관련 타입을 정의합니다:
//! - `Direction` - 포지션 방향 (Long/Short)
//! - `Signal` - 한 스텝 안에서만 소비되는 매매 의도

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// 매수 포지션 (가격 상승 시 이익)
    Long,
    /// 매도 포지션 (가격 하락 시 이익)
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// 전략이 제안한 매매 신호.
///
/// 한 스텝 안에서 리스크 검사와 체결에 쓰이고 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// 고유 신호 ID
    pub id: Uuid,
    /// 진입 방향
    pub direction: Direction,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    /// 제안 진입 가격
    pub price: Decimal,
    /// 신호를 만든 패턴 이름 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// 제안 손절가 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    /// 제안 익절가 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
}

impl Signal {
    /// 새 신호를 생성합니다. 신뢰도 기본값은 1.0입니다.
    pub fn new(direction: Direction, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            confidence: 1.0,
            price,
            pattern: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    /// 매수 진입 신호.
    pub fn long(price: Decimal) -> Self {
        Self::new(Direction::Long, price)
    }

    /// 매도 진입 신호.
    pub fn short(price: Decimal) -> Self {
        Self::new(Direction::Short, price)
    }

    /// 신뢰도를 설정합니다 (0.0 ~ 1.0으로 제한, NaN은 0.0).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// 패턴 이름을 설정합니다.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// 손절/익절 가격을 설정합니다.
    pub fn with_stops(mut self, stop_loss: Option<Decimal>, take_profit: Option<Decimal>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }
}
