//! 포지션과 청산 거래 기록.
//!
//! 포지션 상태는 `OPEN → CLOSED` 한 방향으로만 전이합니다.
//! `Position::close`가 포지션을 소비하여 `ClosedTrade`를 만들기 때문에
//! 청산된 포지션이 다시 쓰이는 경우는 타입 수준에서 막힙니다.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::signal::Direction;

/// 손익 계산.
///
/// 롱은 `(exit - entry) * size`, 숏은 부호를 뒤집습니다.
pub fn calculate_pnl(
    direction: Direction,
    entry_price: Decimal,
    exit_price: Decimal,
    size: Decimal,
) -> Decimal {
    match direction {
        Direction::Long => (exit_price - entry_price) * size,
        Direction::Short => (entry_price - exit_price) * size,
    }
}

/// 청산 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// 전략의 청산 판단
    Strategy,
    /// 시계열 종료 시 강제 청산
    EndOfData,
}

/// 보유 중인 포지션.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// 포지션 ID
    pub id: Uuid,
    /// 방향
    pub direction: Direction,
    /// 진입 시각
    pub entry_time: DateTime<Utc>,
    /// 진입 가격
    pub entry_price: Decimal,
    /// 수량
    pub size: Decimal,
    /// 손절가 (원 신호에서 전달)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    /// 익절가 (원 신호에서 전달)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    /// 진입 패턴 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// 마지막 평가 가격
    pub mark_price: Decimal,
}

impl Position {
    /// 새 포지션 생성. 평가 가격은 진입가로 시작합니다.
    pub fn new(
        direction: Direction,
        entry_price: Decimal,
        size: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            entry_time,
            entry_price,
            size,
            stop_loss: None,
            take_profit: None,
            pattern: None,
            mark_price: entry_price,
        }
    }

    /// 손절/익절 가격 설정.
    pub fn with_stops(mut self, stop_loss: Option<Decimal>, take_profit: Option<Decimal>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// 패턴 이름 설정.
    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    /// 주어진 가격 기준 손익.
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        calculate_pnl(self.direction, self.entry_price, price, self.size)
    }

    /// 평가 가격 기준 미실현 손익.
    pub fn unrealized_pnl(&self) -> Decimal {
        self.pnl_at(self.mark_price)
    }

    /// 손절가 도달 여부 (손절가 미설정이면 false).
    pub fn stop_loss_hit(&self, price: Decimal) -> bool {
        match (self.stop_loss, self.direction) {
            (Some(sl), Direction::Long) => price <= sl,
            (Some(sl), Direction::Short) => price >= sl,
            (None, _) => false,
        }
    }

    /// 익절가 도달 여부 (익절가 미설정이면 false).
    pub fn take_profit_hit(&self, price: Decimal) -> bool {
        match (self.take_profit, self.direction) {
            (Some(tp), Direction::Long) => price >= tp,
            (Some(tp), Direction::Short) => price <= tp,
            (None, _) => false,
        }
    }

    /// 포지션을 청산하여 거래 기록으로 변환합니다.
    pub fn close(
        self,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        exit_reason: ExitReason,
    ) -> ClosedTrade {
        let pnl = self.pnl_at(exit_price);
        ClosedTrade {
            position_id: self.id,
            direction: self.direction,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            size: self.size,
            pnl,
            exit_reason,
            pattern: self.pattern,
        }
    }
}

/// 청산된 거래 (라운드트립).
///
/// 거래 로그에 추가된 뒤에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// 원 포지션 ID
    pub position_id: Uuid,
    /// 방향
    pub direction: Direction,
    /// 진입 시각
    pub entry_time: DateTime<Utc>,
    /// 진입 가격
    pub entry_price: Decimal,
    /// 청산 시각
    pub exit_time: DateTime<Utc>,
    /// 청산 가격
    pub exit_price: Decimal,
    /// 수량
    pub size: Decimal,
    /// 실현 손익
    pub pnl: Decimal,
    /// 청산 사유
    pub exit_reason: ExitReason,
    /// 진입 패턴 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ClosedTrade {
    /// 수익 거래 여부.
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// 손실 거래 여부.
    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }

    /// 보유 기간.
    pub fn holding_period(&self) -> Duration {
        self.exit_time - self.entry_time
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_long_and_short_pnl() {
        // 100 진입, 110 청산, 수량 1
        assert_eq!(calculate_pnl(Direction::Long, dec!(100), dec!(110), dec!(1)), dec!(10));
        assert_eq!(calculate_pnl(Direction::Short, dec!(100), dec!(110), dec!(1)), dec!(-10));
    }

    #[test]
    fn test_close_converts_to_trade() {
        let position = Position::new(Direction::Long, dec!(100), dec!(2), ts(0))
            .with_pattern(Some("flag".to_string()));
        let id = position.id;

        let trade = position.close(dec!(95), ts(3), ExitReason::Strategy);
        assert_eq!(trade.position_id, id);
        assert_eq!(trade.pnl, dec!(-10));
        assert!(trade.is_loss());
        assert!(!trade.is_win());
        assert_eq!(trade.holding_period(), Duration::hours(3));
        assert_eq!(trade.pattern.as_deref(), Some("flag"));
    }

    #[test]
    fn test_unrealized_follows_mark_price() {
        let mut position = Position::new(Direction::Short, dec!(50), dec!(4), ts(0));
        assert_eq!(position.unrealized_pnl(), Decimal::ZERO);

        position.mark_price = dec!(45);
        assert_eq!(position.unrealized_pnl(), dec!(20));
    }

    #[test]
    fn test_stop_and_target_triggers() {
        let long = Position::new(Direction::Long, dec!(100), dec!(1), ts(0))
            .with_stops(Some(dec!(95)), Some(dec!(110)));
        assert!(long.stop_loss_hit(dec!(94)));
        assert!(!long.stop_loss_hit(dec!(96)));
        assert!(long.take_profit_hit(dec!(110)));

        let short = Position::new(Direction::Short, dec!(100), dec!(1), ts(0))
            .with_stops(Some(dec!(105)), None);
        assert!(short.stop_loss_hit(dec!(106)));
        assert!(!short.take_profit_hit(dec!(1)));
    }
}
