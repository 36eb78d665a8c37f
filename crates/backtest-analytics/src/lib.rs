//! 백테스트 시뮬레이션 및 성과 분석.
//!
//! # 주요 구성요소
//!
//! - [`DataHandler`]: 시뮬레이션 시계 (현재 시점까지의 캔들만 노출)
//! - [`Strategy`]: 외부 전략이 구현하는 capability trait
//! - [`BacktestEngine`]: 스텝 루프를 구동하는 오케스트레이터
//! - [`PerformanceMetrics`]: 거래 로그와 자산 곡선으로 계산한 성과 지표

pub mod backtest;
pub mod data;
pub mod performance;
pub mod strategy;

pub use backtest::{
    BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult,
    ProgressCallback, ProgressUpdate,
};
pub use data::DataHandler;
pub use performance::{max_drawdown, sharpe_ratio, PerformanceMetrics};
pub use strategy::Strategy;
