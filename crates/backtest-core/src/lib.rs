//! 캔들 백테스트 도메인 타입.
//!
//! 이 crate는 다음을 제공합니다:
//! - `Candle` - OHLCV 캔들 한 개
//! - `Direction` - 포지션 방향 (Long/Short)
//! - `Signal` - 전략이 제안하는 매매 신호
//! - `Position` / `ClosedTrade` - 보유 포지션과 청산된 거래 기록
//! - `EquityPoint` - 자산 곡선 샘플
//!
//! 실행(계좌, 리스크)과 시뮬레이션 루프는 각각 `backtest-execution`,
//! `backtest-analytics` crate에 있습니다.

pub mod domain;

// 주요 타입 재내보내기
pub use domain::{
    calculate_pnl, Candle, ClosedTrade, Direction, EquityPoint, ExitReason, Position, Signal,
};
