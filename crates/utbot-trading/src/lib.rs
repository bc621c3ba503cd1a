//! # UTBot Trading
//!
//! Execution side of the UTBot engine: the brokerage contract and its
//! Tradovate adapter, the credential session manager, the position
//! coordinator, and the market poll loop. Signal math lives in
//! `utbot-core`; the HTTP surface lives in `utbot-server`.
//!
//! Everything stateful is shared behind `Arc` and guarded by async
//! locks, so the poll task and the webhook path cooperate on one
//! position and one credential without racing.

pub mod adapters;
pub mod broker;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http_client;
pub mod poller;
pub mod session;

pub use adapters::TradovateBroker;
pub use broker::{
    AccountId, AuthOutcome, Broker, BrokerError, BrokerErrorKind, Credential, OrderSide,
    VerificationTicket,
};
pub use config::{Config, ConfigError};
pub use coordinator::{Coordinator, ExecutionReport, Instruction, PositionState};
pub use error::TradingError;
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use poller::Poller;
pub use session::SessionManager;
