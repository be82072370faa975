//! Hub-wide keepalive: periodic pings and stale-connection sweeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::hub::Hub;

/// Send a `ping` frame to every connection each `period` until cancelled.
pub async fn ping_loop(hub: Arc<Hub>, period: Duration, token: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let reached = hub.ping_all();
                trace!(reached, "Heartbeat ping sent");
            }
        }
    }

    debug!("Ping loop stopped");
}

/// Evict connections with no heartbeat within the configured timeout, every
/// `period`, until cancelled.
pub async fn stale_sweep_loop(hub: Arc<Hub>, period: Duration, token: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = hub.evict_stale(Utc::now());
                if evicted > 0 {
                    info!(evicted, "Evicted stale connections");
                }
            }
        }
    }

    debug!("Stale sweep loop stopped");
}
