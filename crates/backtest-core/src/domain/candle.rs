//! OHLCV 캔들과 자산 곡선 샘플.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 입력 시계열의 캔들 한 개.
///
/// 로드 이후에는 변경되지 않습니다. 시계열은 timestamp 오름차순이며
/// 중복 timestamp가 없다고 가정합니다 (상위 데이터 계층에서 검증).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// 자산 곡선의 한 점 (시뮬레이션 스텝당 하나).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// 기록 시각
    pub timestamp: DateTime<Utc>,
    /// 평가 자산 (현금 + 미실현 손익)
    pub equity: Decimal,
}

impl EquityPoint {
    /// 새 자산 곡선 샘플 생성.
    pub fn new(timestamp: DateTime<Utc>, equity: Decimal) -> Self {
        Self { timestamp, equity }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_candle_serde() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candle = Candle::new(ts, dec!(100), dec!(105), dec!(99), dec!(104), dec!(10));

        let json = serde_json::to_string(&candle).unwrap();
        let parsed: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.timestamp, ts);
        assert_eq!(parsed.close, dec!(104));
    }
}
