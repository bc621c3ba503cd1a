//! Brokerage collaborator contract.
//!
//! The coordinator, session manager, and poll loop depend on this trait
//! only; the wire format lives entirely inside the adapter. All
//! operations are fallible remote calls with a bounded timeout.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use utbot_core::{BarSeries, Symbol};

use crate::http_client::{HttpError, HttpErrorKind};

/// Opaque trading credential. Never logged; the Debug form is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Ticket issued when the brokerage demands an out-of-band code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationTicket(String);

impl VerificationTicket {
    pub fn new(ticket: impl Into<String>) -> Self {
        Self(ticket.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VerificationTicket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Brokerage account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire spelling expected by the brokerage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }
}

/// Outcome of an authentication attempt that did not outright fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Credential),
    PendingVerification(VerificationTicket),
}

/// Broker error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    AuthenticationFailed,
    Timeout,
    Unavailable,
    OrderRejected,
    InvalidResponse,
    InvalidRequest,
}

/// Structured broker error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerError {
    kind: BrokerErrorKind,
    message: String,
    retryable: bool,
}

impl BrokerError {
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::AuthenticationFailed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn order_rejected(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::OrderRejected,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> BrokerErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BrokerError {}

impl From<HttpError> for BrokerError {
    fn from(error: HttpError) -> Self {
        match error.kind() {
            HttpErrorKind::Timeout => Self::timeout(error.message().to_owned()),
            HttpErrorKind::Connect | HttpErrorKind::Protocol => {
                Self::unavailable(error.message().to_owned())
            }
        }
    }
}

/// Brokerage operations the engine depends on.
///
/// Implementations must be `Send + Sync`; they are shared across the
/// poll task and the webhook path behind an `Arc`.
pub trait Broker: Send + Sync {
    /// Request a fresh trading credential.
    fn authenticate<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<AuthOutcome, BrokerError>> + Send + 'a>>;

    /// Exchange a pending-verification ticket plus out-of-band code for a
    /// credential.
    fn complete_verification<'a>(
        &'a self,
        ticket: &'a VerificationTicket,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Credential, BrokerError>> + Send + 'a>>;

    /// List account identifiers in brokerage order; callers use the first.
    fn list_accounts<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, BrokerError>> + Send + 'a>>;

    /// Fetch the most recent `count` bars, oldest first.
    fn recent_bars<'a>(
        &'a self,
        credential: &'a Credential,
        symbol: &'a Symbol,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, BrokerError>> + Send + 'a>>;

    /// Dispatch a market order.
    fn place_market_order<'a>(
        &'a self,
        credential: &'a Credential,
        account: AccountId,
        symbol: &'a Symbol,
        side: OrderSide,
        qty: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>>;

    /// Flatten any open position in the symbol. A no-op upstream when the
    /// account is already flat.
    fn liquidate_position<'a>(
        &'a self,
        credential: &'a Credential,
        account: AccountId,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>>;
}
