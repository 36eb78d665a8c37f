//! 백테스팅 엔진
//!
//! 캔들 시계열 위에서 전략을 스텝 단위로 시뮬레이션하고 성과를 분석합니다.
//!
//! # 스텝 순서
//!
//! 1. 보유 포지션을 현재 종가로 평가하고 전략의 청산 판단을 반영
//! 2. 신규 신호 생성
//! 3. 리스크 허용 → 크기 계산 → 체결
//! 4. 자산 곡선 기록, 진행 상황 알림, 시계 전진
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use backtest_analytics::{BacktestConfig, BacktestEngine};
//! use rust_decimal_macros::dec;
//!
//! let config = BacktestConfig::new(dec!(10_000))
//!     .with_risk_per_trade(dec!(0.02))
//!     .with_max_trades(3);
//!
//! let engine = BacktestEngine::new(config, candles)?
//!     .with_progress_callback(Box::new(|p| println!("{:.0}%", p.fraction * 100.0)));
//!
//! let report = engine.run(&mut strategy)?;
//! println!("{}", report.summary());
//! ```

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use backtest_core::{Candle, ClosedTrade, EquityPoint, ExitReason, Position};
use backtest_execution::{Account, AccountError, AccountSnapshot, RiskConfig, RiskManager};
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    backtest::progress::{ProgressCallback, ProgressThrottle, ProgressUpdate},
    data::DataHandler,
    performance::{PerformanceMetrics, DEFAULT_ANNUALIZATION_FACTOR},
    strategy::Strategy,
};

/// 백테스트 오류
#[derive(Debug, Error)]
pub enum BacktestError {
    /// 설정 오류
    #[error("백테스트 설정 오류: {0}")]
    ConfigError(String),

    /// 원장 불변식 위반 (오케스트레이션 버그)
    #[error("실행 오류: {0}")]
    Execution(#[from] AccountError),
}

/// 백테스트 결과 타입
pub type BacktestResult<T> = Result<T, BacktestError>;

/// 백테스트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 초기 자본금
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// 거래당 최대 위험 비율 (예: 0.02 = 2%)
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: Decimal,

    /// 최대 동시 포지션 수
    #[serde(default = "default_max_trades")]
    pub max_trades: usize,

    /// 거래 가능한 최소 자산
    #[serde(default = "default_min_equity")]
    pub min_equity: Decimal,

    /// 최소 신호 신뢰도
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// 최소 유효 포지션 크기
    #[serde(default = "default_min_position_size")]
    pub min_position_size: Decimal,

    /// 샤프 비율 연율화 계수
    #[serde(default = "default_annualization_factor")]
    pub annualization_factor: f64,

    /// 무위험 이자율 (연율, 샤프 비율 계산용)
    #[serde(default)]
    pub risk_free_rate: f64,

    /// 진행 상황 알림 최소 간격 (밀리초)
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// 시계열 종료 시 미청산 포지션 청산 여부
    #[serde(default = "default_close_positions_at_end")]
    pub close_positions_at_end: bool,
}

// 설정 기본값 함수들 (serde default용)
fn default_initial_capital() -> Decimal {
    Decimal::new(10_000, 0)
}
fn default_risk_per_trade() -> Decimal {
    Decimal::new(2, 2)
} // 2%
fn default_max_trades() -> usize {
    1
}
fn default_min_equity() -> Decimal {
    Decimal::new(1_000, 0)
}
fn default_min_confidence() -> f64 {
    0.5
}
fn default_min_position_size() -> Decimal {
    Decimal::new(1, 2)
} // 0.01
fn default_annualization_factor() -> f64 {
    DEFAULT_ANNUALIZATION_FACTOR
}
fn default_progress_interval_ms() -> u64 {
    1_000
}
fn default_close_positions_at_end() -> bool {
    true
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            risk_per_trade: default_risk_per_trade(),
            max_trades: default_max_trades(),
            min_equity: default_min_equity(),
            min_confidence: default_min_confidence(),
            min_position_size: default_min_position_size(),
            annualization_factor: default_annualization_factor(),
            risk_free_rate: 0.0,
            progress_interval_ms: default_progress_interval_ms(),
            close_positions_at_end: default_close_positions_at_end(),
        }
    }
}

impl BacktestConfig {
    /// 새로운 백테스트 설정을 생성합니다.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    /// TOML 문자열에서 설정을 읽고 검증합니다.
    ///
    /// 누락된 항목은 기본값을 사용합니다.
    pub fn from_toml_str(source: &str) -> BacktestResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| BacktestError::ConfigError(format!("TOML 파싱 실패: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 거래당 위험 비율 설정
    pub fn with_risk_per_trade(mut self, risk: Decimal) -> Self {
        self.risk_per_trade = risk;
        self
    }

    /// 최대 포지션 수 설정
    pub fn with_max_trades(mut self, max: usize) -> Self {
        self.max_trades = max;
        self
    }

    /// 최소 자산 설정
    pub fn with_min_equity(mut self, min: Decimal) -> Self {
        self.min_equity = min;
        self
    }

    /// 최소 신뢰도 설정
    pub fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = min;
        self
    }

    /// 최소 포지션 크기 설정
    pub fn with_min_position_size(mut self, min: Decimal) -> Self {
        self.min_position_size = min;
        self
    }

    /// 연율화 계수 설정 (예: 일봉 252, 시간봉 252 * 24)
    pub fn with_annualization_factor(mut self, factor: f64) -> Self {
        self.annualization_factor = factor;
        self
    }

    /// 무위험 이자율 설정
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// 진행 상황 알림 간격 설정
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 종료 시 강제 청산 설정
    pub fn with_close_positions_at_end(mut self, enabled: bool) -> Self {
        self.close_positions_at_end = enabled;
        self
    }

    /// 리스크 관리자 설정으로 변환
    pub fn risk_config(&self) -> RiskConfig {
        RiskConfig {
            risk_per_trade: self.risk_per_trade,
            max_trades: self.max_trades,
            min_equity: self.min_equity,
            min_confidence: self.min_confidence,
            min_position_size: self.min_position_size,
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> BacktestResult<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::ConfigError(
                "초기 자본은 0보다 커야 합니다".to_string(),
            ));
        }
        if !self.annualization_factor.is_finite() || self.annualization_factor <= 0.0 {
            return Err(BacktestError::ConfigError(format!(
                "연율화 계수는 0보다 커야 합니다: {}",
                self.annualization_factor
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(BacktestError::ConfigError(format!(
                "무위험 이자율이 유효하지 않습니다: {}",
                self.risk_free_rate
            )));
        }
        self.risk_config()
            .validate()
            .map_err(|e| BacktestError::ConfigError(e.to_string()))
    }
}

/// 백테스트 실행 리포트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// 설정 정보
    pub config: BacktestConfig,

    /// 전략 이름
    pub strategy: String,

    /// 성과 지표
    pub metrics: PerformanceMetrics,

    /// 완료된 거래 (청산 시각 순)
    pub trades: Vec<ClosedTrade>,

    /// 자산 곡선 (스텝당 1개)
    pub equity_curve: Vec<EquityPoint>,

    /// 종료 시점 계좌 상태
    pub account: AccountSnapshot,

    /// 데이터 포인트 수
    pub data_points: usize,

    /// 실행된 스텝 수
    pub steps: usize,

    /// 백테스트 기간 시작
    pub start_time: Option<DateTime<Utc>>,

    /// 백테스트 기간 종료
    pub end_time: Option<DateTime<Utc>>,

    /// 중단 신호로 조기 종료되었는지 여부
    pub cancelled: bool,
}

impl BacktestReport {
    /// 최종 자산
    pub fn final_equity(&self) -> Decimal {
        self.account.equity
    }

    /// 요약 문자열 반환
    pub fn summary(&self) -> String {
        let period = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => format!(
                "{} → {} ({} 일)",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d"),
                (end - start).num_days()
            ),
            _ => "-".to_string(),
        };

        format!(
            "백테스트 결과 요약 [{}]{}\n\
             ═══════════════════════════════════════\n\
             기간: {}\n\
             데이터 포인트: {} (실행 스텝: {})\n\
             ───────────────────────────────────────\n\
             초기 자본: {}\n\
             최종 자산: {:.2}\n\
             순수익: {:.2}\n\
             총 수익률: {:.2}%\n\
             ───────────────────────────────────────\n\
             총 거래: {} (수익 {} / 손실 {})\n\
             승률: {:.1}%\n\
             프로핏 팩터: {:.2}\n\
             기대 손익: {:.2}\n\
             ───────────────────────────────────────\n\
             샤프 비율: {:.2}\n\
             최대 낙폭: {:.2}%\n\
             ═══════════════════════════════════════",
            self.strategy,
            if self.cancelled { " (중단됨)" } else { "" },
            period,
            self.data_points,
            self.steps,
            self.config.initial_capital,
            self.final_equity(),
            self.metrics.net_profit,
            self.metrics.total_return * 100.0,
            self.metrics.total_trades,
            self.metrics.winning_trades,
            self.metrics.losing_trades,
            self.metrics.win_rate * 100.0,
            self.metrics.profit_factor,
            self.metrics.expectancy,
            self.metrics.sharpe_ratio,
            self.metrics.max_drawdown * 100.0,
        )
    }
}

/// 백테스팅 엔진
///
/// 한 인스턴스는 한 번의 백테스트만 수행합니다. 계좌, 데이터 핸들러,
/// 리스크 관리자를 단독으로 소유하므로 여러 백테스트는 인스턴스를 따로 만들어
/// 병렬로 실행할 수 있습니다.
///
/// ```text
/// BacktestEngine ──▶ DataHandler (시계/윈도우)
///        │ ──▶ Strategy (청산 판단, 신호, 크기 비율)
///        │ ──▶ RiskManager (허용, 크기 상한)
///        └ ──▶ Account (체결, 손익 기록)
/// ```
pub struct BacktestEngine {
    /// 설정
    config: BacktestConfig,

    /// 시뮬레이션 시계
    data: DataHandler,

    /// 계좌 원장
    account: Account,

    /// 리스크 정책
    risk: RiskManager,

    /// 진행 상황 콜백
    progress: Option<ProgressCallback>,

    /// 외부 중단 신호
    stop_flag: Option<Arc<AtomicBool>>,
}

impl BacktestEngine {
    /// 새로운 백테스트 엔진을 생성합니다.
    ///
    /// 설정이 잘못되면 실패합니다. 타임스탬프가 엄격히 증가하지 않는 시계열은
    /// 빈 시계열로 취급되어 거래 없는 실행이 됩니다.
    pub fn new(config: BacktestConfig, candles: Vec<Candle>) -> BacktestResult<Self> {
        config.validate()?;
        let risk = RiskManager::new(config.risk_config())
            .map_err(|e| BacktestError::ConfigError(e.to_string()))?;

        let candles = if is_strictly_ascending(&candles) {
            candles
        } else {
            warn!(
                candles = candles.len(),
                "캔들 시계열이 시간순이 아님: 빈 시계열로 처리"
            );
            Vec::new()
        };

        let account = Account::new(config.initial_capital, config.max_trades);

        Ok(Self {
            config,
            data: DataHandler::new(candles),
            account,
            risk,
            progress: None,
            stop_flag: None,
        })
    }

    /// 진행 상황 콜백 설정
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// 외부 중단 신호 설정 (스텝 사이에 확인)
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    /// 설정 조회
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 계좌 조회
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// 데이터 핸들러 조회
    pub fn data(&self) -> &DataHandler {
        &self.data
    }

    /// 백테스트 실행.
    ///
    /// 시계열이 끝나거나 중단 신호를 받을 때까지 스텝을 반복하고 리포트를
    /// 반환합니다. 원장 불변식 위반만 오류로 전파됩니다.
    pub fn run<S>(mut self, strategy: &mut S) -> BacktestResult<BacktestReport>
    where
        S: Strategy + ?Sized,
    {
        let started = Instant::now();
        let mut throttle = ProgressThrottle::new(
            Duration::from_millis(self.config.progress_interval_ms),
            started,
        );

        info!(
            strategy = strategy.name(),
            data_points = self.data.len(),
            initial_capital = %self.config.initial_capital,
            max_trades = self.config.max_trades,
            "백테스트 시작"
        );

        let mut steps = 0usize;
        let mut cancelled = false;

        if !self.data.is_empty() {
            loop {
                if self.is_stopped() {
                    cancelled = true;
                    warn!(steps, "중단 신호 수신: 백테스트 조기 종료");
                    break;
                }

                self.step(strategy)?;
                steps += 1;

                if throttle.ready(Instant::now()) {
                    let fraction = self.data.progress();
                    self.emit_progress(fraction);
                }

                if !self.data.advance() {
                    break;
                }
            }
        }

        if !cancelled {
            if self.config.close_positions_at_end {
                self.close_remaining()?;
            }
            self.emit_progress(1.0);
        }

        let metrics = PerformanceMetrics::calculate(
            self.account.trades(),
            self.account.equity_curve(),
            self.account.initial_balance(),
            self.config.annualization_factor,
            self.config.risk_free_rate,
        );

        let (start_time, end_time) = match self.data.time_range() {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        info!(
            strategy = strategy.name(),
            steps,
            trades = metrics.total_trades,
            final_equity = %self.account.equity(),
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "백테스트 완료"
        );

        Ok(BacktestReport {
            strategy: strategy.name().to_string(),
            metrics,
            trades: self.account.trades().to_vec(),
            equity_curve: self.account.equity_curve().to_vec(),
            account: self.account.snapshot(),
            data_points: self.data.len(),
            steps,
            start_time,
            end_time,
            cancelled,
            config: self.config,
        })
    }

    // === 스텝 처리 ===

    /// 현재 캔들 한 개를 처리합니다 (시계 전진은 호출자 담당).
    fn step<S>(&mut self, strategy: &mut S) -> BacktestResult<()>
    where
        S: Strategy + ?Sized,
    {
        let Self {
            data,
            account,
            risk,
            ..
        } = self;

        let Some(candle) = data.current_candle() else {
            return Ok(());
        };
        let index = data.current_index();
        let window = data.current_window();

        // 1. 평가 후 청산 판단 (ID 스냅샷 기준)
        account.mark_all(candle.close);
        let ids: Vec<Uuid> = account.positions().iter().map(|p| p.id).collect();
        for id in ids {
            let should_exit = match account.position(id) {
                Some(position) => strategy.should_exit(window, index, position),
                None => continue,
            };
            if should_exit {
                let trade = account.close_position(id, candle.close, candle.timestamp)?;
                debug!(
                    position_id = %trade.position_id,
                    direction = %trade.direction,
                    exit_price = %trade.exit_price,
                    pnl = %trade.pnl,
                    "포지션 청산"
                );
            }
        }

        // 2. 신호 생성 → 허용 → 크기 계산 → 체결
        let signals = strategy.generate_signals(window);
        for signal in signals {
            if !risk.admits(account, &signal) {
                continue;
            }

            let fraction = clamp_fraction(strategy.calculate_position_size(window, &signal));
            let equity = account.equity();
            // 오버플로는 크기 0으로 취급
            let proposed = if signal.price > Decimal::ZERO {
                Decimal::from_f64(fraction)
                    .and_then(|f| f.checked_mul(equity))
                    .and_then(|notional| notional.checked_div(signal.price))
                    .unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            };

            let size = risk.size_position(proposed, signal.price, equity);
            if size.is_zero() {
                debug!(
                    signal_id = %signal.id,
                    proposed = %proposed,
                    price = %signal.price,
                    "포지션 크기 0: 신호 무시"
                );
                continue;
            }

            let position = Position::new(signal.direction, signal.price, size, candle.timestamp)
                .with_stops(signal.stop_loss, signal.take_profit)
                .with_pattern(signal.pattern);
            let opened = account.open(position)?;
            debug!(
                position_id = %opened.id,
                direction = %opened.direction,
                entry_price = %opened.entry_price,
                size = %opened.size,
                "포지션 진입"
            );
        }

        // 3. 평가 및 자산 기록
        account.mark_all(candle.close);
        account.record_equity(candle.timestamp);

        Ok(())
    }

    /// 시계열 종료 시 남은 포지션을 마지막 종가로 청산합니다.
    fn close_remaining(&mut self) -> BacktestResult<()> {
        let open = self.account.positions().len();
        if open == 0 {
            return Ok(());
        }
        let Some(last) = self.data.current_candle() else {
            return Ok(());
        };

        warn!(
            positions = open,
            price = %last.close,
            "백테스트 종료: {} 개 포지션 강제 청산",
            open
        );
        self.account
            .close_all(last.close, last.timestamp, ExitReason::EndOfData)?;
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn emit_progress(&mut self, fraction: f64) {
        let Some(callback) = self.progress.as_mut() else {
            return;
        };
        let update = ProgressUpdate {
            fraction,
            timestamp: self.data.current_timestamp(),
            open_positions: self.account.positions().len(),
            trade_count: self.account.trades().len(),
        };
        callback(&update);
    }
}

/// 전략이 제안한 크기 비율을 [0, 1]로 제한합니다 (NaN은 0).
fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

fn is_strictly_ascending(candles: &[Candle]) -> bool {
    candles
        .windows(2)
        .all(|pair| pair[0].timestamp < pair[1].timestamp)
}
