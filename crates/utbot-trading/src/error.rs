//! Error type for the execution side of the engine.

use thiserror::Error;

use utbot_core::EngineError;

use crate::broker::{BrokerError, VerificationTicket};

/// Failures surfaced by the session manager, coordinator, and poll loop.
#[derive(Debug, Error)]
pub enum TradingError {
    /// The brokerage wants an out-of-band code before issuing a
    /// credential. Carries the ticket the code must be paired with.
    #[error("verification required before trading can resume (ticket {ticket})")]
    PendingVerification { ticket: VerificationTicket },

    /// A verification code arrived but no verification is pending.
    #[error("no verification is pending")]
    NoPendingVerification,

    /// The brokerage rejected the configured credentials outright.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// An order or liquidation was dispatched and refused, or could not
    /// be dispatched at all.
    #[error("order execution failed: {message}")]
    OrderExecution { message: String },

    /// The brokerage reported no accounts for the credential.
    #[error("no trading account is available")]
    NoAccount,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl TradingError {
    /// True for the routine not-enough-history case, which the poll loop
    /// logs at debug rather than warn.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Engine(engine) if engine.is_insufficient_data())
    }
}
