//! Brokerage adapters.

pub mod tradovate;

pub use tradovate::TradovateBroker;
