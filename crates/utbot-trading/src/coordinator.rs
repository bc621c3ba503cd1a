//! Position coordinator.
//!
//! Owns the single-symbol position state machine and serializes every
//! transition behind one async lock, so a webhook instruction and a poll
//! tick can never interleave order dispatch. A reversal is liquidate,
//! settle, then open; a failed dispatch leaves the recorded state
//! matching what actually reached the brokerage.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use utbot_core::{Signal, Symbol};

use crate::broker::{AccountId, Broker, BrokerError, Credential, OrderSide};
use crate::error::TradingError;
use crate::session::SessionManager;

/// Pause between flattening and opening the reversal order, giving the
/// brokerage time to settle the liquidation.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Net position in the traded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl From<OrderSide> for PositionState {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Long,
            OrderSide::Sell => Self::Short,
        }
    }
}

/// Normalized trading instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Buy,
    Sell,
    Close,
}

impl Instruction {
    /// Parse an action word, accepting the common TradingView synonyms.
    /// Matching is case-insensitive; unknown words are `None`.
    pub fn parse(action: &str) -> Option<Self> {
        match action.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Some(Self::Buy),
            "sell" | "short" => Some(Self::Sell),
            "exit" | "exitlong" | "exitshort" | "close" | "flat" | "liquidate" => {
                Some(Self::Close)
            }
            _ => None,
        }
    }
}

/// What a transition actually did, for callers and the webhook reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub liquidated: bool,
    pub opened: Option<OrderSide>,
    pub state: PositionState,
}

/// Serializes position transitions against the brokerage.
pub struct Coordinator {
    broker: Arc<dyn Broker>,
    session: Arc<SessionManager>,
    symbol: Symbol,
    qty: u32,
    settle_delay: Duration,
    state: Mutex<PositionState>,
}

impl Coordinator {
    pub fn new(
        broker: Arc<dyn Broker>,
        session: Arc<SessionManager>,
        symbol: Symbol,
        qty: u32,
    ) -> Self {
        Self {
            broker,
            session,
            symbol,
            qty,
            settle_delay: DEFAULT_SETTLE_DELAY,
            state: Mutex::new(PositionState::Flat),
        }
    }

    /// Override the liquidate-to-open pause. Tests set this to zero.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub async fn state(&self) -> PositionState {
        *self.state.lock().await
    }

    /// Act on an engine signal. `Signal::None` does nothing.
    pub async fn apply_signal(
        &self,
        signal: Signal,
    ) -> Result<Option<ExecutionReport>, TradingError> {
        match signal {
            Signal::Buy => self.transition(OrderSide::Buy).await.map(Some),
            Signal::Sell => self.transition(OrderSide::Sell).await.map(Some),
            Signal::None => Ok(None),
        }
    }

    /// Act on a webhook instruction.
    pub async fn handle_instruction(
        &self,
        instruction: Instruction,
    ) -> Result<ExecutionReport, TradingError> {
        match instruction {
            Instruction::Buy => self.transition(OrderSide::Buy).await,
            Instruction::Sell => self.transition(OrderSide::Sell).await,
            Instruction::Close => self.close().await,
        }
    }

    /// Move to the target position. A repeat of the current state is a
    /// no-op; an opposing position is flattened and settled first.
    async fn transition(&self, side: OrderSide) -> Result<ExecutionReport, TradingError> {
        let target = PositionState::from(side);
        let mut state = self.state.lock().await;

        if *state == target {
            info!(position = ?*state, "already in target position, skipping");
            return Ok(ExecutionReport {
                liquidated: false,
                opened: None,
                state: *state,
            });
        }

        let credential = self.session.credential().await?;
        let account = self.first_account(&credential).await?;

        let mut liquidated = false;
        if *state != PositionState::Flat {
            self.liquidate(&credential, account).await?;
            *state = PositionState::Flat;
            liquidated = true;
            tokio::time::sleep(self.settle_delay).await;
        }

        self.broker
            .place_market_order(&credential, account, &self.symbol, side, self.qty)
            .await
            .map_err(order_failure)?;

        *state = target;
        info!(symbol = %self.symbol, side = side.as_str(), qty = self.qty, "position opened");

        Ok(ExecutionReport {
            liquidated,
            opened: Some(side),
            state: *state,
        })
    }

    /// Flatten unconditionally. Safe to call while already flat; the
    /// brokerage treats that liquidation as a no-op.
    async fn close(&self) -> Result<ExecutionReport, TradingError> {
        let mut state = self.state.lock().await;

        let credential = self.session.credential().await?;
        let account = self.first_account(&credential).await?;

        self.liquidate(&credential, account).await?;
        let liquidated = *state != PositionState::Flat;
        *state = PositionState::Flat;
        info!(symbol = %self.symbol, "position closed");

        Ok(ExecutionReport {
            liquidated,
            opened: None,
            state: *state,
        })
    }

    async fn first_account(&self, credential: &Credential) -> Result<AccountId, TradingError> {
        let accounts = self.broker.list_accounts(credential).await?;
        accounts.first().copied().ok_or(TradingError::NoAccount)
    }

    async fn liquidate(
        &self,
        credential: &Credential,
        account: AccountId,
    ) -> Result<(), TradingError> {
        self.broker
            .liquidate_position(credential, account, &self.symbol)
            .await
            .map_err(order_failure)
    }
}

fn order_failure(error: BrokerError) -> TradingError {
    TradingError::OrderExecution {
        message: error.message().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_synonyms_are_case_insensitive() {
        assert_eq!(Instruction::parse("BUY"), Some(Instruction::Buy));
        assert_eq!(Instruction::parse("long"), Some(Instruction::Buy));
        assert_eq!(Instruction::parse("Sell"), Some(Instruction::Sell));
        assert_eq!(Instruction::parse("short"), Some(Instruction::Sell));
        for word in ["exit", "exitlong", "exitshort", "close", "flat", "liquidate"] {
            assert_eq!(Instruction::parse(word), Some(Instruction::Close));
        }
        assert_eq!(Instruction::parse("hold"), None);
        assert_eq!(Instruction::parse(""), None);
    }

    #[test]
    fn report_serializes_in_snake_case() {
        let report = ExecutionReport {
            liquidated: true,
            opened: Some(OrderSide::Sell),
            state: PositionState::Short,
        };
        let json = serde_json::to_value(&report).expect("serializable");
        assert_eq!(json["liquidated"], true);
        assert_eq!(json["opened"], "sell");
        assert_eq!(json["state"], "short");
    }
}
