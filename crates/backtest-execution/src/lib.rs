//! 시뮬레이션 계좌 및 리스크 관리.
//!
//! 이 crate는 다음을 제공합니다:
//! - 현금/자산/보유 포지션을 관리하는 계좌 원장 (`Account`)
//! - 진입 허용 여부와 포지션 크기를 결정하는 리스크 정책 (`RiskManager`)
//!
//! # 예제
//!
//! ```rust,ignore
//! use backtest_execution::{Account, RiskConfig, RiskManager};
//!
//! let mut account = Account::new(dec!(10_000), 1);
//! let risk = RiskManager::new(RiskConfig::default())?;
//!
//! if risk.admits(&account, &signal) {
//!     let size = risk.size_position(proposed, signal.price, account.equity());
//!     account.open_position(signal.direction, signal.price, size, now)?;
//! }
//! ```

pub mod account;
pub mod error;
pub mod risk;

// 주요 타입 재내보내기
pub use account::{Account, AccountSnapshot};
pub use error::{AccountError, RiskConfigError};
pub use risk::{Rejection, RiskConfig, RiskManager, SIZE_DECIMALS};
