//! 성과 지표 계산.
//!
//! 거래 로그, 자산 곡선, 초기 자산만으로 계산하는 순수 함수입니다.
//! 같은 입력에 대해 항상 같은 결과를 돌려줍니다.

use backtest_core::{ClosedTrade, EquityPoint};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

/// 연율화 기본 계수 (일봉 기준 연간 거래일 수)
pub const DEFAULT_ANNUALIZATION_FACTOR: f64 = 252.0;

/// 백테스트 성과 지표
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// 총 거래 수
    pub total_trades: usize,
    /// 수익 거래 수
    pub winning_trades: usize,
    /// 손실 거래 수
    pub losing_trades: usize,
    /// 승률 (0.0 ~ 1.0)
    pub win_rate: f64,
    /// 프로핏 팩터 (손실이 없고 수익이 있으면 무한대)
    pub profit_factor: f64,
    /// 총 수익 (수익 거래 손익 합)
    pub gross_profit: Decimal,
    /// 총 손실 (손실 거래 손익 합의 절댓값)
    pub gross_loss: Decimal,
    /// 순손익
    pub net_profit: Decimal,
    /// 평균 수익
    pub avg_win: Decimal,
    /// 평균 손실 (음수)
    pub avg_loss: Decimal,
    /// 거래당 기대 손익
    pub expectancy: Decimal,
    /// 손익비 (평균 수익 / 평균 손실 절댓값)
    pub risk_reward_ratio: f64,
    /// 최대 낙폭 (0.0 ~ 1.0)
    pub max_drawdown: f64,
    /// 총 수익률
    pub total_return: f64,
    /// 샤프 비율 (연율화)
    pub sharpe_ratio: f64,
}

impl PerformanceMetrics {
    /// 성과 지표 계산.
    ///
    /// 거래가 없으면 모든 지표가 0인 기본값을 반환합니다.
    pub fn calculate(
        trades: &[ClosedTrade],
        equity_curve: &[EquityPoint],
        initial_equity: Decimal,
        annualization_factor: f64,
        risk_free_rate: f64,
    ) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let total_trades = trades.len();
        let wins: Vec<Decimal> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<Decimal> = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).collect();

        let gross_profit: Decimal = wins.iter().sum();
        let loss_sum: Decimal = losses.iter().sum();
        let gross_loss = loss_sum.abs();
        let net_profit = gross_profit + loss_sum;

        let win_rate = wins.len() as f64 / total_trades as f64;
        let profit_factor = ratio_or_infinity(gross_profit, gross_loss);

        let avg_win = mean(&wins);
        let avg_loss = mean(&losses);
        let win_rate_dec = Decimal::from(wins.len()) / Decimal::from(total_trades);
        let expectancy = win_rate_dec * avg_win + (Decimal::ONE - win_rate_dec) * avg_loss;
        let risk_reward_ratio = ratio_or_infinity(avg_win, avg_loss.abs());

        let equity: Vec<Decimal> = equity_curve.iter().map(|p| p.equity).collect();
        let final_equity = equity
            .last()
            .copied()
            .unwrap_or(initial_equity + net_profit);

        Self {
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate,
            profit_factor,
            gross_profit,
            gross_loss,
            net_profit,
            avg_win,
            avg_loss,
            expectancy,
            risk_reward_ratio,
            max_drawdown: max_drawdown(&equity),
            total_return: total_return(initial_equity, final_equity),
            sharpe_ratio: sharpe_ratio(&equity, annualization_factor, risk_free_rate),
        }
    }
}

/// 최대 낙폭.
///
/// 누적 최고점 대비 하락 비율의 최댓값입니다. 최고점이 0 이하인 구간은 건너뜁니다.
pub fn max_drawdown(equity: &[Decimal]) -> f64 {
    let mut peak: Option<Decimal> = None;
    let mut max_dd = 0.0_f64;

    for value in equity {
        let current_peak = match peak {
            Some(p) if p >= *value => p,
            _ => *value,
        };
        peak = Some(current_peak);

        if current_peak > Decimal::ZERO {
            let dd = to_f64((current_peak - *value) / current_peak);
            max_dd = max_dd.max(dd);
        }
    }

    max_dd
}

/// 샤프 비율.
///
/// 스텝별 초과 수익률(`risk_free_rate / annualization_factor` 차감)의 평균 /
/// 표본 표준편차에 `sqrt(annualization_factor)`를 곱합니다.
/// 수익률이 2개 미만이거나 분산이 0이면 0입니다.
pub fn sharpe_ratio(equity: &[Decimal], annualization_factor: f64, risk_free_rate: f64) -> f64 {
    let step_rate = risk_free_rate / annualization_factor;
    let returns: Vec<f64> = equity
        .windows(2)
        .filter(|w| !w[0].is_zero())
        .map(|w| to_f64((w[1] - w[0]) / w[0]) - step_rate)
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev <= f64::EPSILON {
        return 0.0;
    }

    mean / std_dev * annualization_factor.sqrt()
}

/// 총 수익률 (초기 자산이 0 이하면 0).
pub fn total_return(initial_equity: Decimal, final_equity: Decimal) -> f64 {
    if initial_equity <= Decimal::ZERO {
        return 0.0;
    }
    to_f64((final_equity - initial_equity) / initial_equity)
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

fn ratio_or_infinity(numerator: Decimal, denominator: Decimal) -> f64 {
    if denominator.is_zero() {
        if numerator > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        to_f64(numerator / denominator)
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use backtest_core::{Direction, ExitReason, Position};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn trade(pnl: Decimal, hour: i64) -> ClosedTrade {
        // 수량 1, 진입 100 → 청산 100 + pnl
        Position::new(Direction::Long, dec!(100), dec!(1), ts(hour)).close(
            dec!(100) + pnl,
            ts(hour + 1),
            ExitReason::Strategy,
        )
    }

    fn curve(values: &[Decimal]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| EquityPoint::new(ts(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_zero_trades_yields_defaults() {
        let metrics = PerformanceMetrics::calculate(
            &[],
            &curve(&[dec!(100), dec!(90)]),
            dec!(100),
            DEFAULT_ANNUALIZATION_FACTOR,
            0.0,
        );
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics, PerformanceMetrics::default());
    }

    #[test]
    fn test_drawdown_scenario() {
        let dd = max_drawdown(&[dec!(100), dec!(120), dec!(90), dec!(130)]);
        assert!((dd - 0.25).abs() < 1e-12);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[dec!(100), dec!(110), dec!(120)]), 0.0);
    }

    #[test]
    fn test_trade_statistics() {
        let trades = vec![
            trade(dec!(30), 0),
            trade(dec!(-10), 2),
            trade(dec!(10), 4),
            trade(dec!(-20), 6),
        ];
        let equity = curve(&[dec!(1000), dec!(1030), dec!(1020), dec!(1030), dec!(1010)]);

        let metrics = PerformanceMetrics::calculate(&trades, &equity, dec!(1000), 252.0, 0.0);
        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 2);
        assert_eq!(metrics.win_rate, 0.5);
        assert_eq!(metrics.gross_profit, dec!(40));
        assert_eq!(metrics.gross_loss, dec!(30));
        assert_eq!(metrics.net_profit, dec!(10));
        assert!((metrics.profit_factor - 40.0 / 30.0).abs() < 1e-12);
        assert_eq!(metrics.avg_win, dec!(20));
        assert_eq!(metrics.avg_loss, dec!(-15));
        // 0.5 * 20 + 0.5 * (-15) = 2.5
        assert_eq!(metrics.expectancy, dec!(2.5));
        assert!((metrics.risk_reward_ratio - 20.0 / 15.0).abs() < 1e-12);
        assert!((metrics.total_return - 0.01).abs() < 1e-12);
        assert!(metrics.max_drawdown > 0.0);
    }

    #[test]
    fn test_profit_factor_without_losses() {
        let trades = vec![trade(dec!(5), 0), trade(dec!(0), 2)];
        let metrics = PerformanceMetrics::calculate(&trades, &[], dec!(1000), 252.0, 0.0);

        assert_eq!(metrics.profit_factor, f64::INFINITY);
        assert_eq!(metrics.risk_reward_ratio, f64::INFINITY);
        // 손익 0 거래는 승/패 어느 쪽도 아님
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 0);
        assert_eq!(metrics.avg_loss, Decimal::ZERO);
        // 자산 곡선이 없으면 초기 자산 + 순손익으로 수익률 계산
        assert!((metrics.total_return - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_profit_factor_without_wins() {
        let trades = vec![trade(dec!(-5), 0)];
        let metrics = PerformanceMetrics::calculate(&trades, &[], dec!(1000), 252.0, 0.0);

        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.avg_win, Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_ratio() {
        // 수익률 1개 → 0
        assert_eq!(sharpe_ratio(&[dec!(100), dec!(101)], 252.0, 0.0), 0.0);
        // 분산 0 → 0
        assert_eq!(sharpe_ratio(&[dec!(100), dec!(100), dec!(100)], 252.0, 0.0), 0.0);

        // 수익률: +10%, -10% → 평균 0
        let flat = sharpe_ratio(&[dec!(100), dec!(110), dec!(99)], 252.0, 0.0);
        assert!(flat.abs() < 1e-12);

        // 수익률: +1%, +2% → 평균 0.015, 표본 표준편차 0.00707...
        let up = sharpe_ratio(&[dec!(100), dec!(101), dec!(103.02)], 1.0, 0.0);
        let expected = 0.015 / (0.00005_f64).sqrt();
        assert!((up - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sharpe_ratio_subtracts_risk_free_rate() {
        // 수익률: +1%, +2%, 연 1.0% / 1 스텝 → 초과 평균 0.005, 표준편차는 그대로
        let equity = [dec!(100), dec!(101), dec!(103.02)];
        let excess = sharpe_ratio(&equity, 1.0, 0.01);
        let expected = 0.005 / (0.00005_f64).sqrt();
        assert!((excess - expected).abs() < 1e-9);

        let base = sharpe_ratio(&equity, 252.0, 0.0);
        let with_rf = sharpe_ratio(&equity, 252.0, 0.05);
        assert!(with_rf < base);
    }

    #[test]
    fn test_metrics_are_idempotent() {
        let trades = vec![trade(dec!(12), 0), trade(dec!(-4), 2), trade(dec!(7), 4)];
        let equity = curve(&[dec!(1000), dec!(1012), dec!(1008), dec!(1015)]);

        let first = PerformanceMetrics::calculate(&trades, &equity, dec!(1000), 252.0, 0.0);
        let second = PerformanceMetrics::calculate(&trades, &equity, dec!(1000), 252.0, 0.0);
        assert_eq!(first, second);
    }
}
