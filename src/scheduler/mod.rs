/// Expiry sweeper
/// Bidding windows close on calendar time. Reads already resolve stale jobs lazily; this tick
/// makes sure jobs nobody looks at still expire (or get auto-awarded) on time.
// region:    --- Imports
use crate::engine::BiddingEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Expiry Sweeper
pub struct ExpirySweeper {
    engine: Arc<BiddingEngine>,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(engine: Arc<BiddingEngine>, period: Duration) -> Self {
        Self { engine, period }
    }

    /// Spawn the sweep loop.
    pub fn start(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let period = self.period;
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                Self::tick(&engine).await;
            }
        })
    }

    /// One sweep; errors are logged and the next tick tries again.
    pub async fn tick(engine: &BiddingEngine) -> usize {
        match engine.sweep_expired().await {
            Ok(resolved) => {
                debug!("{:<12} --> sweep done, {} resolved", "Scheduler", resolved);
                resolved
            }
            Err(e) => {
                error!("{:<12} --> expiry sweep failed: {:?}", "Scheduler", e);
                0
            }
        }
    }
}
// endregion: --- Expiry Sweeper
