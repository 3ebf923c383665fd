//! Periodic jobs that advance orders without a human actor
//!
//! Each scheduler owns a non-blocking run lock: a tick that fires while the
//! previous run is still going is skipped, never queued.

pub mod auto_cancel;
pub mod review_prompt;

use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub use auto_cancel::{AutoCancelReport, AutoCancelScheduler};
pub use review_prompt::{ReviewPromptReport, ReviewPromptScheduler};

/// Duration as signed millis, saturating
pub(crate) fn as_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Call `tick` every `period` after `initial_delay` until `shutdown` fires
pub(crate) async fn run_every<F, Fut>(
    name: &'static str,
    initial_delay: Duration,
    period: Duration,
    shutdown: CancellationToken,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::info!(
        scheduler = name,
        initial_delay_secs = initial_delay.as_secs(),
        period_secs = period.as_secs(),
        "Scheduler started"
    );

    tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::info!(scheduler = name, "Scheduler stopped before first run");
            return;
        }
        _ = tokio::time::sleep(initial_delay) => {}
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(scheduler = name, "Scheduler stopped");
                break;
            }
            _ = interval.tick() => {
                tick().await;
            }
        }
    }
}
