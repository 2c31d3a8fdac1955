//! Background overdue sweep

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::lending::LendingService;
use crate::clock::{Clock, ClockExt};

/// Run one sweep pass, logging instead of failing
pub async fn run_once(lending: &LendingService, clock: &dyn Clock) -> usize {
    let today = clock.today();
    match lending.run_overdue_sweep(today).await {
        Ok(marked) => marked.len(),
        Err(e) => {
            tracing::error!("Overdue sweep for {} failed: {}", today, e);
            0
        }
    }
}

/// Spawn the periodic sweep. An interval of zero disables it.
pub fn spawn(lending: LendingService, clock: Arc<dyn Clock>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("Overdue sweep disabled");
        return None;
    }

    tracing::info!("Overdue sweep every {}s", interval_secs);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_once(&lending, clock.as_ref()).await;
        }
    }))
}
