//! 백테스팅 모듈
//!
//! 캔들 시계열 위에서 전략을 시뮬레이션하고 성과를 분석합니다.
//!
//! # 주요 구성요소
//!
//! - [`BacktestConfig`]: 백테스트 설정 (초기 자본, 리스크 한도 등)
//! - [`BacktestEngine`]: 스텝 루프 실행 엔진
//! - [`BacktestReport`]: 백테스트 결과 리포트
//! - [`ProgressUpdate`]: 진행 상황 콜백 페이로드

pub mod engine;
pub mod progress;

pub use engine::{BacktestConfig, BacktestEngine, BacktestError, BacktestReport, BacktestResult};
pub use progress::{ProgressCallback, ProgressThrottle, ProgressUpdate};
