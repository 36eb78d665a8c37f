//! 시뮬레이션 시계.
//!
//! 캔들 시계열과 현재 인덱스를 소유합니다. 모든 조회 메서드는 현재 인덱스까지의
//! 캔들만 반환하므로 전략이 미래 데이터를 볼 수 없습니다.

use backtest_core::Candle;
use chrono::{DateTime, Utc};

/// 캔들 시계열 핸들러
#[derive(Debug, Clone)]
pub struct DataHandler {
    /// 시간순 정렬된 캔들 (상위 계층에서 검증됨)
    candles: Vec<Candle>,
    /// 현재 인덱스
    index: usize,
}

impl DataHandler {
    /// 새 핸들러 생성. 시계는 첫 캔들에서 시작합니다.
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles, index: 0 }
    }

    /// 전체 캔들 수
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// 빈 시계열 여부
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 현재 인덱스
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// 현재 시점까지의 캔들 (현재 캔들 포함).
    pub fn current_window(&self) -> &[Candle] {
        if self.candles.is_empty() {
            return &[];
        }
        &self.candles[..=self.index]
    }

    /// 현재 캔들
    pub fn current_candle(&self) -> Option<&Candle> {
        self.candles.get(self.index)
    }

    /// 현재 시각
    pub fn current_timestamp(&self) -> Option<DateTime<Utc>> {
        self.current_candle().map(|c| c.timestamp)
    }

    /// 다음 캔들로 이동. 시계열이 끝나면 false.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.candles.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// 진행률 (0.0 ~ 1.0).
    ///
    /// 빈 시계열은 0.0, 캔들이 하나뿐이면 1.0입니다.
    pub fn progress(&self) -> f64 {
        match self.candles.len() {
            0 => 0.0,
            1 => 1.0,
            n => self.index as f64 / (n - 1) as f64,
        }
    }

    /// 최근 `lookback`개 캔들 (현재 캔들 포함).
    pub fn lookback(&self, lookback: usize) -> &[Candle] {
        let window = self.current_window();
        let start = window.len().saturating_sub(lookback);
        &window[start..]
    }

    /// `timestamp` 이후 현재 시점까지의 캔들.
    pub fn since(&self, timestamp: DateTime<Utc>) -> &[Candle] {
        let window = self.current_window();
        let start = window.partition_point(|c| c.timestamp < timestamp);
        &window[start..]
    }

    /// `[start, end]` 구간의 캔들. 현재 시점 이후는 잘라냅니다.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[Candle] {
        let window = self.current_window();
        let from = window.partition_point(|c| c.timestamp < start);
        let to = window.partition_point(|c| c.timestamp <= end);
        if from >= to {
            return &[];
        }
        &window[from..to]
    }

    /// 처음으로 되돌림
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// 시계열 전체 기간 (리포트용 메타데이터).
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.candles.first(), self.candles.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use super::*;

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn create_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let price = Decimal::from(100 + i as i64);
                Candle::new(ts(i as i64), price, price, price, price, Decimal::ONE)
            })
            .collect()
    }

    #[test]
    fn test_window_never_includes_future() {
        let candles = create_candles(5);
        let mut data = DataHandler::new(candles.clone());

        loop {
            let window = data.current_window();
            let now = data.current_timestamp().unwrap();
            assert_eq!(window.len(), data.current_index() + 1);
            assert!(window.iter().all(|c| c.timestamp <= now));
            assert_eq!(window.last(), Some(&candles[data.current_index()]));
            if !data.advance() {
                break;
            }
        }
        assert_eq!(data.current_index(), 4);
    }

    #[test]
    fn test_empty_series() {
        let mut data = DataHandler::new(Vec::new());
        assert!(data.is_empty());
        assert!(!data.advance());
        assert!(data.current_window().is_empty());
        assert!(data.current_candle().is_none());
        assert!(data.current_timestamp().is_none());
        assert_eq!(data.progress(), 0.0);
        assert!(data.time_range().is_none());
    }

    #[test]
    fn test_progress() {
        let mut data = DataHandler::new(create_candles(5));
        assert_eq!(data.progress(), 0.0);
        data.advance();
        data.advance();
        assert_eq!(data.progress(), 0.5);
        while data.advance() {}
        assert_eq!(data.progress(), 1.0);

        let single = DataHandler::new(create_candles(1));
        assert_eq!(single.progress(), 1.0);
    }

    #[test]
    fn test_lookback_since_between() {
        let mut data = DataHandler::new(create_candles(10));
        for _ in 0..5 {
            data.advance();
        }
        // 현재 인덱스 5

        let last3 = data.lookback(3);
        assert_eq!(last3.len(), 3);
        assert_eq!(last3[0].timestamp, ts(3));
        assert_eq!(data.lookback(100).len(), 6);

        assert_eq!(data.since(ts(4)).len(), 2);
        assert_eq!(data.since(ts(9)).len(), 0);

        // 미래 구간은 잘림
        let range = data.between(ts(2), ts(8));
        assert_eq!(range.len(), 4);
        assert_eq!(range.last().unwrap().timestamp, ts(5));
        assert!(data.between(ts(4), ts(2)).is_empty());
    }

    #[test]
    fn test_reset() {
        let mut data = DataHandler::new(create_candles(3));
        data.advance();
        data.reset();
        assert_eq!(data.current_index(), 0);
        assert_eq!(data.current_window().len(), 1);
        assert_eq!(data.time_range(), Some((ts(0), ts(2))));
    }
}
