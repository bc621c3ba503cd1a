//! Market poll loop.
//!
//! On a fixed cadence: fetch recent bars, evaluate the signal engine,
//! and hand any Buy/Sell signal to the coordinator. A tick that fails is
//! logged and dropped; the next tick starts from scratch with no retry
//! in between.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use utbot_core::SignalEngine;

use crate::broker::Broker;
use crate::coordinator::{Coordinator, ExecutionReport};
use crate::error::TradingError;
use crate::session::SessionManager;

/// Bars requested per tick. More history than the engine minimum keeps
/// the trailing stop identical across ticks as the window slides.
pub const DEFAULT_BAR_COUNT: usize = 100;

/// Drives the signal engine against live market data.
pub struct Poller {
    broker: Arc<dyn Broker>,
    session: Arc<SessionManager>,
    coordinator: Arc<Coordinator>,
    engine: SignalEngine,
    bar_count: usize,
    interval: Duration,
}

impl Poller {
    pub fn new(
        broker: Arc<dyn Broker>,
        session: Arc<SessionManager>,
        coordinator: Arc<Coordinator>,
        engine: SignalEngine,
        interval: Duration,
    ) -> Self {
        let bar_count = DEFAULT_BAR_COUNT.max(engine.min_bars());
        Self {
            broker,
            session,
            coordinator,
            engine,
            bar_count,
            interval,
        }
    }

    pub fn with_bar_count(mut self, bar_count: usize) -> Self {
        self.bar_count = bar_count.max(self.engine.min_bars());
        self
    }

    /// One poll cycle: fetch, evaluate, act. `Ok(None)` means no signal
    /// fired this tick.
    pub async fn tick(&self) -> Result<Option<ExecutionReport>, TradingError> {
        let credential = self.session.credential().await?;
        let series = self
            .broker
            .recent_bars(&credential, self.coordinator.symbol(), self.bar_count)
            .await?;
        let signal = self.engine.evaluate(&series)?;
        self.coordinator.apply_signal(signal).await
    }

    /// Poll forever. Ticks that overrun the interval are not bunched up
    /// afterwards.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(Some(report)) => {
                    info!(state = ?report.state, liquidated = report.liquidated, "signal executed");
                }
                Ok(None) => {
                    debug!("no signal this tick");
                }
                Err(error) if error.is_benign() => {
                    debug!(%error, "skipping tick");
                }
                Err(error) => {
                    warn!(%error, "poll tick failed");
                }
            }
        }
    }
}
