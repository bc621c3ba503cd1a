//! UTBot trailing stop.
//!
//! Recursive stop line derived from close price and ATR: the stop
//! ratchets toward price while the close stays on one side of it and
//! flips to the other side of price when the close crosses it.

use crate::domain::Bar;
use crate::indicators::atr::AtrSeries;
use crate::EngineError;

/// Stop-line series aligned with its bar sequence.
///
/// Values are defined for indices >= `lookback + 1` (one bar after the
/// ATR seed) and are strictly derived from the recurrence; the line is
/// never reset mid-sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct StopLine {
    lookback: usize,
    values: Vec<Option<f64>>,
}

impl StopLine {
    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// First index with a defined stop value.
    pub fn first_defined(&self) -> usize {
        self.lookback + 1
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }
}

/// Compute the trailing stop line from bars and their ATR series.
///
/// `key_value` scales the stop distance as a multiple of ATR.
///
/// The first defined point runs the recurrence against a previous stop
/// of 0, so any positive price starts on the "above" side. Signal timing
/// depends on that seed; do not replace it with a price-relative one.
pub fn trailing_stop(
    bars: &[Bar],
    atr: &AtrSeries,
    key_value: f64,
) -> Result<StopLine, EngineError> {
    if !key_value.is_finite() || key_value <= 0.0 {
        return Err(EngineError::InvalidKeyValue { value: key_value });
    }

    let lookback = atr.lookback();
    let mut values = vec![None; bars.len()];
    let mut prev_stop = 0.0;

    for i in (lookback + 1)..bars.len() {
        let Some(atr_i) = atr.value(i) else {
            continue;
        };
        let n_loss = key_value * atr_i;
        let src = bars[i].close;
        let src_prev = bars[i - 1].close;

        let stop = if src > prev_stop && src_prev > prev_stop {
            prev_stop.max(src - n_loss)
        } else if src < prev_stop && src_prev < prev_stop {
            prev_stop.min(src + n_loss)
        } else if src > prev_stop {
            src - n_loss
        } else {
            src + n_loss
        };

        values[i] = Some(stop);
        prev_stop = stop;
    }

    Ok(StopLine { lookback, values })
}
