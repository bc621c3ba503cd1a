//! # UTBot Core
//!
//! Pure signal computation for the UTBot trading engine: OHLC domain
//! types, a Wilder-smoothed ATR, the volatility-adaptive trailing stop,
//! and the edge-triggered signal detector built on it.
//!
//! This crate performs no I/O and holds no mutable state; everything is
//! a function of the bar window and two parameters (lookback period and
//! key-value multiplier). The stateful side — session, position
//! coordination, brokerage calls — lives in `utbot-trading`.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | `Bar`, `BarSeries`, `Symbol`, `UtcDateTime` |
//! | [`indicators`] | True range, ATR, trailing stop |
//! | [`signal`] | `Signal`, detector, `SignalEngine` pipeline |
//! | [`error`] | Validation and engine error types |

pub mod domain;
pub mod error;
pub mod indicators;
pub mod signal;

pub use domain::{Bar, BarSeries, Symbol, UtcDateTime};
pub use error::{EngineError, ValidationError};
pub use indicators::{atr, trailing_stop, true_range, AtrSeries, StopLine};
pub use signal::{detect, Signal, SignalEngine};
