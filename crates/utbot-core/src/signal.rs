//! Edge-triggered signal detection over the trailing stop.
//!
//! A signal is derived from exactly the last two bars of the window: Buy
//! fires only on the bar where the close crosses from at-or-below the
//! stop line to strictly above it, Sell on the mirror crossing. The
//! detector is pure; re-evaluating the same window always yields the
//! same signal, so polling retries are safe.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarSeries};
use crate::indicators::{atr, trailing_stop, StopLine};
use crate::EngineError;

/// Directional trade signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    None,
}

/// Evaluate the last two bars of the window against the stop line.
///
/// The previous index may be the warmup boundary where no stop value is
/// defined yet; an undefined previous point classifies as not-above, so
/// the first evaluable window of an uptrend fires its Buy.
pub fn detect(bars: &[Bar], stops: &StopLine) -> Signal {
    let Some(index) = bars.len().checked_sub(1) else {
        return Signal::None;
    };
    let Some(stop_now) = stops.value(index) else {
        return Signal::None;
    };
    if index == 0 {
        return Signal::None;
    }

    let above_now = bars[index].close > stop_now;
    let above_prev = match stops.value(index - 1) {
        Some(stop_prev) => bars[index - 1].close > stop_prev,
        None => false,
    };

    if above_now && !above_prev {
        Signal::Buy
    } else if !above_now && above_prev {
        Signal::Sell
    } else {
        Signal::None
    }
}

/// Signal computation pipeline with fixed parameters.
///
/// Composes the volatility estimator, the trailing-stop calculator, and
/// the detector. Stateless: every evaluation recomputes from the full
/// window, which is small by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalEngine {
    lookback: usize,
    key_value: f64,
}

impl SignalEngine {
    pub fn new(lookback: usize, key_value: f64) -> Result<Self, EngineError> {
        if lookback == 0 {
            return Err(EngineError::InvalidLookback);
        }
        if !key_value.is_finite() || key_value <= 0.0 {
            return Err(EngineError::InvalidKeyValue { value: key_value });
        }
        Ok(Self {
            lookback,
            key_value,
        })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn key_value(&self) -> f64 {
        self.key_value
    }

    /// Minimum window length before a signal can be computed.
    pub fn min_bars(&self) -> usize {
        self.lookback + 2
    }

    /// Run the full pipeline over the series.
    ///
    /// # Errors
    ///
    /// `EngineError::InsufficientData` when the series is shorter than
    /// [`min_bars`](Self::min_bars); benign, means "no signal yet".
    pub fn evaluate(&self, series: &BarSeries) -> Result<Signal, EngineError> {
        let bars = series.bars();
        let atr = atr(bars, self.lookback)?;
        let stops = trailing_stop(bars, &atr, self.key_value)?;
        Ok(detect(bars, &stops))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Symbol, UtcDateTime};
    use time::Duration;

    fn series_from_closes(closes: &[f64]) -> BarSeries {
        let base = UtcDateTime::parse("2026-03-02T14:00:00Z").expect("base timestamp");
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                Bar::new(
                    base + Duration::minutes(i as i64),
                    close,
                    close + 0.5,
                    close - 0.5,
                    close,
                )
                .expect("valid bar")
            })
            .collect();
        BarSeries::new(Symbol::parse("MESM6").expect("valid symbol"), bars).expect("ordered bars")
    }

    #[test]
    fn short_history_reports_insufficient_data() {
        let engine = SignalEngine::new(10, 1.0).expect("valid params");
        for n in 0..12 {
            let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            let err = engine.evaluate(&series_from_closes(&closes)).expect_err("too short");
            assert!(err.is_insufficient_data(), "n={n} must be insufficient");
        }
    }

    #[test]
    fn first_evaluable_window_of_an_uptrend_buys() {
        let engine = SignalEngine::new(10, 1.0).expect("valid params");
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let signal = engine.evaluate(&series_from_closes(&closes)).expect("enough bars");
        assert_eq!(signal, Signal::Buy);
    }

    #[test]
    fn continued_uptrend_stays_quiet() {
        let engine = SignalEngine::new(10, 1.0).expect("valid params");
        for n in 13..=15 {
            let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            let signal = engine.evaluate(&series_from_closes(&closes)).expect("enough bars");
            assert_eq!(signal, Signal::None, "window of {n} bars must not re-fire");
        }
    }

    #[test]
    fn crossdown_emits_sell() {
        let engine = SignalEngine::new(3, 1.0).expect("valid params");
        let mut closes = vec![100.0; 8];
        closes.push(90.0);
        let signal = engine.evaluate(&series_from_closes(&closes)).expect("enough bars");
        assert_eq!(signal, Signal::Sell);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let engine = SignalEngine::new(10, 1.0).expect("valid params");
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let first = engine.evaluate(&series).expect("enough bars");
        let second = engine.evaluate(&series).expect("enough bars");
        assert_eq!(first, second);
    }

    #[test]
    fn signal_serializes_in_snake_case() {
        let json = serde_json::to_string(&Signal::Buy).expect("serializable");
        assert_eq!(json, "\"buy\"");
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(SignalEngine::new(0, 1.0), Err(EngineError::InvalidLookback));
        assert!(matches!(
            SignalEngine::new(10, -1.0),
            Err(EngineError::InvalidKeyValue { .. })
        ));
    }
}
