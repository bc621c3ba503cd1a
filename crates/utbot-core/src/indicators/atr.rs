//! Average True Range (ATR).
//!
//! True range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR uses Wilder smoothing (alpha = 1/lookback), seeded with the
//! arithmetic mean of the first `lookback` true ranges (indices 1..=L).

use crate::domain::Bar;
use crate::EngineError;

/// Compute the true-range series, one value per bar.
///
/// Index 0 has no prior close, so its value duplicates index 1. The
/// duplicate exists only to keep index alignment; the seed window starts
/// at index 1 and never reads it.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![0.0; n];

    for i in 1..n {
        let high = bars[i].high;
        let low = bars[i].low;
        let prev_close = bars[i - 1].close;
        tr[i] = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
    }

    if n >= 2 {
        tr[0] = tr[1];
    } else if n == 1 {
        tr[0] = bars[0].high - bars[0].low;
    }

    tr
}

/// Wilder-smoothed ATR series aligned with its bar sequence.
///
/// Values before index `lookback` are `None`, never zero: a zero here
/// would be silently misread downstream as "no stop distance".
#[derive(Debug, Clone, PartialEq)]
pub struct AtrSeries {
    lookback: usize,
    values: Vec<Option<f64>>,
}

impl AtrSeries {
    pub fn lookback(&self) -> usize {
        self.lookback
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

/// Compute the ATR over `bars` with the given lookback period.
///
/// # Errors
///
/// - `EngineError::InvalidLookback` when `lookback` is zero.
/// - `EngineError::InsufficientData` when fewer than `lookback + 2` bars
///   are available. Callers treat this as "no signal yet".
pub fn atr(bars: &[Bar], lookback: usize) -> Result<AtrSeries, EngineError> {
    if lookback == 0 {
        return Err(EngineError::InvalidLookback);
    }

    let need = lookback + 2;
    if bars.len() < need {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need,
        });
    }

    let tr = true_range(bars);
    let mut values = vec![None; bars.len()];

    let seed = tr[1..=lookback].iter().sum::<f64>() / lookback as f64;
    values[lookback] = Some(seed);

    let alpha = 1.0 / lookback as f64;
    let mut prev = seed;
    for i in (lookback + 1)..bars.len() {
        let smoothed = alpha * tr[i] + (1.0 - alpha) * prev;
        values[i] = Some(smoothed);
        prev = smoothed;
    }

    Ok(AtrSeries { lookback, values })
}
