//! Strategy trait 정의.

use backtest_core::{Candle, Position, Signal};

/// 백테스트 엔진이 사용하는 전략 capability trait.
///
/// 세 연산을 구현하는 타입이면 어떤 것이든 엔진에 넣을 수 있습니다.
/// 모든 호출에 전달되는 `window`는 현재 캔들까지의 데이터만 포함합니다.
pub trait Strategy {
    /// 전략 이름 반환 (로그용).
    fn name(&self) -> &str {
        "unnamed"
    }

    /// 현재 시점의 신규 진입 신호 (없으면 빈 벡터).
    fn generate_signals(&mut self, window: &[Candle]) -> Vec<Signal>;

    /// 보유 포지션 청산 여부.
    ///
    /// `index`는 `window` 마지막 캔들의 인덱스입니다.
    fn should_exit(&mut self, window: &[Candle], index: usize, position: &Position) -> bool;

    /// 포지션 크기 비율 (0.0 ~ 1.0).
    ///
    /// 리스크 관리자가 상한을 적용하기 전에 자산에 곱해지는 배수입니다.
    fn calculate_position_size(&mut self, window: &[Candle], signal: &Signal) -> f64;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate_signals(&mut self, window: &[Candle]) -> Vec<Signal> {
        (**self).generate_signals(window)
    }

    fn should_exit(&mut self, window: &[Candle], index: usize, position: &Position) -> bool {
        (**self).should_exit(window, index, position)
    }

    fn calculate_position_size(&mut self, window: &[Candle], signal: &Signal) -> f64 {
        (**self).calculate_position_size(window, signal)
    }
}
