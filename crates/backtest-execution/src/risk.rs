//! 리스크 관리 정책.
//!
//! 설정 외에는 상태를 갖지 않습니다. 진입 허용(admission)과 크기 조정(sizing)을
//! 분리해 두어, 오케스트레이터가 허용되지 않은 신호에 대해 전략의 크기 계산을
//! 호출하지 않도록 합니다.

use backtest_core::Signal;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{account::Account, error::RiskConfigError};

/// 포지션 크기 소수 자릿수
pub const SIZE_DECIMALS: u32 = 8;

/// 리스크 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// 거래당 최대 위험 비율 (예: 0.02 = 자산의 2%)
    pub risk_per_trade: Decimal,
    /// 최대 동시 포지션 수
    pub max_trades: usize,
    /// 거래 가능한 최소 자산
    pub min_equity: Decimal,
    /// 최소 신호 신뢰도
    pub min_confidence: f64,
    /// 최소 유효 포지션 크기 (이보다 작으면 진입하지 않음)
    pub min_position_size: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: Decimal::new(2, 2), // 2%
            max_trades: 1,
            min_equity: Decimal::from(1000),
            min_confidence: 0.5,
            min_position_size: Decimal::new(1, 2), // 0.01
        }
    }
}

impl RiskConfig {
    /// 설정 검증
    pub fn validate(&self) -> Result<(), RiskConfigError> {
        if self.risk_per_trade <= Decimal::ZERO || self.risk_per_trade > Decimal::ONE {
            return Err(RiskConfigError::RiskPerTrade(self.risk_per_trade));
        }
        if self.max_trades == 0 {
            return Err(RiskConfigError::MaxTrades);
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(RiskConfigError::MinConfidence(self.min_confidence));
        }
        if self.min_equity < Decimal::ZERO {
            return Err(RiskConfigError::NegativeThreshold {
                name: "min_equity",
                value: self.min_equity,
            });
        }
        if self.min_position_size < Decimal::ZERO {
            return Err(RiskConfigError::NegativeThreshold {
                name: "min_position_size",
                value: self.min_position_size,
            });
        }
        Ok(())
    }
}

/// 진입 거부 사유.
///
/// 에러가 아니라 정상적인 제어 흐름 결과입니다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// 최대 포지션 수 도달
    MaxTradesReached { open: usize, max: usize },
    /// 자산이 최소 자산 미만
    InsufficientEquity { equity: Decimal, min: Decimal },
    /// 신호 신뢰도 부족
    LowConfidence { confidence: f64, min: f64 },
}

/// 리스크 관리자
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    /// 새 리스크 관리자 생성 (설정 검증 포함)
    pub fn new(config: RiskConfig) -> Result<Self, RiskConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 설정 조회
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// 거부 사유를 평가합니다. 허용이면 `None`.
    pub fn check(&self, account: &Account, signal: &Signal) -> Option<Rejection> {
        let open = account.positions().len();
        if open >= self.config.max_trades {
            return Some(Rejection::MaxTradesReached {
                open,
                max: self.config.max_trades,
            });
        }

        let equity = account.equity();
        if equity < self.config.min_equity {
            return Some(Rejection::InsufficientEquity {
                equity,
                min: self.config.min_equity,
            });
        }

        if signal.confidence.is_nan() || signal.confidence < self.config.min_confidence {
            return Some(Rejection::LowConfidence {
                confidence: signal.confidence,
                min: self.config.min_confidence,
            });
        }

        None
    }

    /// 신호 진입 허용 여부.
    pub fn admits(&self, account: &Account, signal: &Signal) -> bool {
        match self.check(account, signal) {
            None => true,
            Some(rejection) => {
                debug!(
                    signal_id = %signal.id,
                    direction = %signal.direction,
                    rejection = ?rejection,
                    "신호 거부"
                );
                false
            }
        }
    }

    /// 포지션 크기 조정.
    ///
    /// `equity * risk_per_trade / price`를 상한으로 제한하고 [`SIZE_DECIMALS`]
    /// 자리에서 버림합니다. 결과가 최소 유효 크기 미만이거나 상한 계산이
    /// 오버플로하면 0(진입하지 않음)을 반환합니다.
    pub fn size_position(&self, proposed: Decimal, price: Decimal, equity: Decimal) -> Decimal {
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let Some(max_size) = equity
            .checked_mul(self.config.risk_per_trade)
            .and_then(|budget| budget.checked_div(price))
        else {
            return Decimal::ZERO;
        };
        let adjusted = proposed
            .min(max_size)
            .round_dp_with_strategy(SIZE_DECIMALS, RoundingStrategy::ToZero);

        if adjusted < self.config.min_position_size || adjusted <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        adjusted
    }
}
