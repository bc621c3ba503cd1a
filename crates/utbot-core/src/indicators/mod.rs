//! Volatility estimation and the trailing stop built on it.

pub mod atr;
pub mod trailing_stop;

pub use atr::{atr, true_range, AtrSeries};
pub use trailing_stop::{trailing_stop, StopLine};
