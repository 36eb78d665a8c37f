//! 시뮬레이션 계좌 원장.
//!
//! 현금, 보유 포지션, 거래 로그, 자산 곡선을 관리합니다.
//! 증거금 없는 원장이므로 진입 시 현금은 변하지 않고 청산 시 실현 손익만
//! 현금에 반영됩니다. 따라서 언제나 `equity == cash + Σ 미실현 손익`입니다.

use std::collections::HashMap;

use backtest_core::{ClosedTrade, Direction, EquityPoint, ExitReason, Position};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccountError;

/// 계좌 상태 스냅샷 (리포트용).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// 초기 잔고
    pub initial_balance: Decimal,
    /// 현금
    pub cash: Decimal,
    /// 평가 자산
    pub equity: Decimal,
    /// 미실현 손익 합계
    pub unrealized_pnl: Decimal,
    /// 보유 포지션
    pub open_positions: Vec<Position>,
    /// 청산 거래 수
    pub closed_trades: usize,
    /// 성공한 진입 주문 수
    pub orders_opened: usize,
}

/// 시뮬레이션 계좌.
#[derive(Debug, Clone)]
pub struct Account {
    /// 초기 잔고
    initial_balance: Decimal,
    /// 현금 (초기 잔고 + 실현 손익)
    cash: Decimal,
    /// 최대 동시 포지션 수
    max_trades: usize,
    /// 보유 포지션 (진입 순서)
    positions: Vec<Position>,
    /// 청산 거래 로그 (청산 시각 순, 추가 전용)
    trades: Vec<ClosedTrade>,
    /// 자산 곡선 (스텝당 1개)
    equity_curve: Vec<EquityPoint>,
    /// 성공한 진입 주문 수
    orders_opened: usize,
}

impl Account {
    /// 새 계좌 생성.
    pub fn new(initial_balance: Decimal, max_trades: usize) -> Self {
        Self {
            initial_balance,
            cash: initial_balance,
            max_trades,
            positions: Vec::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            orders_opened: 0,
        }
    }

    /// 초기 잔고
    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    /// 현금
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// 최대 동시 포지션 수
    pub fn max_trades(&self) -> usize {
        self.max_trades
    }

    /// 보유 포지션 목록
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// 특정 포지션 조회
    pub fn position(&self, id: Uuid) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// 거래 로그
    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    /// 자산 곡선
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// 성공한 진입 주문 수
    pub fn orders_opened(&self) -> usize {
        self.orders_opened
    }

    /// 미실현 손익 합계
    pub fn unrealized_pnl(&self) -> Decimal {
        self.positions.iter().map(Position::unrealized_pnl).sum()
    }

    /// 실현 손익 합계
    pub fn realized_pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    /// 평가 자산 (현금 + 미실현 손익)
    pub fn equity(&self) -> Decimal {
        self.cash + self.unrealized_pnl()
    }

    /// 포지션 진입.
    ///
    /// 리스크 관리자가 먼저 허용 여부를 확인해야 하며, 여기서는 최후의
    /// 불변식으로 최대 포지션 수를 다시 검사합니다.
    pub fn open_position(
        &mut self,
        direction: Direction,
        price: Decimal,
        size: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<Position, AccountError> {
        self.open(Position::new(direction, price, size, timestamp))
    }

    /// 준비된 포지션(손절/익절/패턴 메타데이터 포함)으로 진입.
    pub fn open(&mut self, position: Position) -> Result<Position, AccountError> {
        if self.positions.len() >= self.max_trades {
            return Err(AccountError::Capacity {
                max: self.max_trades,
            });
        }
        if position.entry_price <= Decimal::ZERO {
            return Err(AccountError::InvalidOrder(format!(
                "진입 가격은 0보다 커야 합니다: {}",
                position.entry_price
            )));
        }
        if position.size <= Decimal::ZERO {
            return Err(AccountError::InvalidOrder(format!(
                "수량은 0보다 커야 합니다: {}",
                position.size
            )));
        }

        self.positions.push(position.clone());
        self.orders_opened += 1;
        Ok(position)
    }

    /// 포지션 청산 (전략 판단에 의한 청산).
    pub fn close_position(
        &mut self,
        id: Uuid,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
    ) -> Result<ClosedTrade, AccountError> {
        self.close_position_with_reason(id, exit_price, exit_time, ExitReason::Strategy)
    }

    /// 사유를 지정하여 포지션 청산.
    ///
    /// 실현 손익을 현금에 반영하고 거래 로그에 추가합니다.
    pub fn close_position_with_reason(
        &mut self,
        id: Uuid,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<ClosedTrade, AccountError> {
        let idx = self
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(AccountError::PositionNotFound { id })?;

        if exit_price <= Decimal::ZERO {
            return Err(AccountError::InvalidOrder(format!(
                "청산 가격은 0보다 커야 합니다: {}",
                exit_price
            )));
        }
        if let Some(last) = self.trades.last() {
            if exit_time < last.exit_time {
                return Err(AccountError::OutOfOrderExit {
                    exit_time,
                    last_exit: last.exit_time,
                });
            }
        }

        let position = self.positions.remove(idx);
        let trade = position.close(exit_price, exit_time, reason);
        self.cash += trade.pnl;
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// 모든 포지션을 같은 가격으로 청산.
    pub fn close_all(
        &mut self,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Result<Vec<ClosedTrade>, AccountError> {
        // 포지션 ID 목록 복사 (빌림 충돌 방지)
        let ids: Vec<Uuid> = self.positions.iter().map(|p| p.id).collect();
        ids.into_iter()
            .map(|id| self.close_position_with_reason(id, exit_price, exit_time, reason))
            .collect()
    }

    /// 포지션별 가격으로 평가.
    ///
    /// 맵에 없는 포지션은 이전 평가 가격을 유지합니다.
    pub fn mark_to_market(&mut self, prices: &HashMap<Uuid, Decimal>) {
        for position in &mut self.positions {
            if let Some(price) = prices.get(&position.id) {
                position.mark_price = *price;
            }
        }
    }

    /// 모든 포지션을 단일 가격으로 평가 (단일 종목 시계열).
    pub fn mark_all(&mut self, price: Decimal) {
        for position in &mut self.positions {
            position.mark_price = price;
        }
    }

    /// 현재 평가 자산을 자산 곡선에 기록합니다.
    pub fn record_equity(&mut self, timestamp: DateTime<Utc>) -> Decimal {
        let equity = self.equity();
        self.equity_curve.push(EquityPoint::new(timestamp, equity));
        equity
    }

    /// 상태 스냅샷
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            initial_balance: self.initial_balance,
            cash: self.cash,
            equity: self.equity(),
            unrealized_pnl: self.unrealized_pnl(),
            open_positions: self.positions.clone(),
            closed_trades: self.trades.len(),
            orders_opened: self.orders_opened,
        }
    }

    /// 초기 상태로 되돌림
    pub fn reset(&mut self) {
        self.cash = self.initial_balance;
        self.positions.clear();
        self.trades.clear();
        self.equity_curve.clear();
        self.orders_opened = 0;
    }
}
