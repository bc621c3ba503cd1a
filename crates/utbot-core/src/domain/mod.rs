//! Domain types shared across the engine.

mod bar;
mod symbol;
mod timestamp;

pub use bar::{Bar, BarSeries};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
