//! 진행 상황 알림.
//!
//! 엔진은 콜백으로만 진행 상황을 알립니다. 콜백은 관찰 전용이며
//! 시뮬레이션 결과에 영향을 주지 않습니다.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 진행 상황 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// 진행률 (0.0 ~ 1.0)
    pub fraction: f64,
    /// 현재 시뮬레이션 시각 (빈 시계열이면 None)
    pub timestamp: Option<DateTime<Utc>>,
    /// 보유 포지션 수
    pub open_positions: usize,
    /// 누적 청산 거래 수
    pub trade_count: usize,
}

/// 진행 상황 콜백
pub type ProgressCallback = Box<dyn FnMut(&ProgressUpdate) + Send>;

/// 벽시계 기준 알림 빈도 제한기.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Instant,
}

impl ProgressThrottle {
    /// `start` 시점부터 `interval` 간격으로 알림을 허용합니다.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    /// 직전 알림 이후 간격이 지났으면 true를 반환하고 기준 시각을 갱신합니다.
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}
