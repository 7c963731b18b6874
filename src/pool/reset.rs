//! Daily quota reset task.
//!
//! Calls [`NumberPool::reset_daily_counts`] on a fixed period until
//! shutdown. The pool itself never schedules resets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::bootstrap::{Shutdown, ShutdownState};

use super::NumberPool;

/// Periodic reset of the pool's daily counters.
pub struct DailyReset {
    pool: Arc<NumberPool>,
    shutdown_rx: watch::Receiver<ShutdownState>,
    period: Duration,
}

impl DailyReset {
    pub fn new(pool: Arc<NumberPool>, shutdown: Arc<Shutdown>, period: Duration) -> Self {
        Self {
            pool,
            shutdown_rx: shutdown.subscribe(),
            period,
        }
    }

    /// Run until shutdown. The first reset happens one period after start.
    pub async fn run(mut self) {
        info!(period_secs = self.period.as_secs(), "daily reset task started");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow_and_update() != ShutdownState::Running {
                        info!("daily reset task shutting down");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    self.pool.reset_daily_counts().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::NumberState;

    #[tokio::test(start_paused = true)]
    async fn test_reset_fires_each_period() {
        let pool = Arc::new(NumberPool::new(1));
        pool.add_number("+14377846365", "telnyx").await;
        pool.assign_number("A", None).await;
        pool.release_number("+14377846365", true).await;

        let shutdown = Shutdown::new();
        let task = tokio::spawn(
            DailyReset::new(pool.clone(), shutdown.clone(), Duration::from_secs(60)).run(),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(
            pool.get("+14377846365").await.unwrap().state,
            NumberState::Cooldown
        );

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(
            pool.get("+14377846365").await.unwrap().state,
            NumberState::Available
        );

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let pool = Arc::new(NumberPool::new(1));
        let shutdown = Shutdown::new();
        let task = tokio::spawn(
            DailyReset::new(pool, shutdown.clone(), Duration::from_secs(3600)).run(),
        );

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reset task did not stop")
            .unwrap();
    }
}
