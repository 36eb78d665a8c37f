//! 백테스트 도메인 모델.

mod candle;
mod position;
mod signal;

pub use candle::{Candle, EquityPoint};
pub use position::{calculate_pnl, ClosedTrade, ExitReason, Position};
pub use signal::{Direction, Signal};
