//! Auto-cancel: reclaim orders the store never accepted
//!
//! Every run cancels PLACED orders older than the grace window and refunds
//! their buyers. Each order is handled in its own write transaction through
//! the same guarded transition an owner uses, so an order the owner accepted
//! or cancelled a moment earlier is skipped instead of refunded twice.

use shared::models::OrderStatus;
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{as_millis, run_every};
use crate::error::ServiceResult;
use crate::events::EventBus;
use crate::orders::status::{AppliedTransition, TransitionOutcome, transition_in_txn};
use crate::storage::Storage;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutoCancelReport {
    pub cancelled: usize,
    /// Already left PLACED by the time we got to it
    pub skipped: usize,
    pub failed: usize,
}

pub struct AutoCancelScheduler {
    storage: Storage,
    events: Arc<EventBus>,
    grace: Duration,
    run_lock: Mutex<()>,
}

impl AutoCancelScheduler {
    pub fn new(storage: Storage, events: Arc<EventBus>, grace: Duration) -> Self {
        Self {
            storage,
            events,
            grace,
            run_lock: Mutex::new(()),
        }
    }

    /// Periodic loop; returns when `shutdown` is cancelled
    pub async fn run(self: Arc<Self>, initial_delay: Duration, period: Duration, shutdown: CancellationToken) {
        run_every("auto_cancel", initial_delay, period, shutdown, || {
            let this = self.clone();
            async move {
                this.run_once(now_millis()).await;
            }
        })
        .await;
    }

    /// One pass; `None` when a previous pass still holds the lock
    pub async fn run_once(&self, now: i64) -> Option<AutoCancelReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::debug!("Auto-cancel run still in progress, skipping tick");
            return None;
        };

        let cutoff = now.saturating_sub(as_millis(self.grace));
        let candidates = match self.storage.placed_orders_created_before(cutoff) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Auto-cancel candidate scan failed");
                return Some(AutoCancelReport {
                    failed: 1,
                    ..Default::default()
                });
            }
        };

        let mut report = AutoCancelReport::default();
        for order_id in candidates {
            match self.cancel_one(order_id, now).await {
                Ok(true) => report.cancelled += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(order_id, error = %e, "Auto-cancel failed");
                    report.failed += 1;
                }
            }
        }

        if report.cancelled + report.skipped + report.failed > 0 {
            tracing::info!(
                cancelled = report.cancelled,
                skipped = report.skipped,
                failed = report.failed,
                "Auto-cancel run finished"
            );
        }
        Some(report)
    }

    /// Cancel one order if it is still PLACED; `Ok(false)` when it was not
    pub async fn cancel_one(&self, order_id: i64, now: i64) -> ServiceResult<bool> {
        match self.cancel_txn(order_id, now)? {
            Some(applied) => {
                tracing::info!(
                    order_id,
                    buyer_id = %applied.order.buyer_id,
                    refund = applied.order.total_price,
                    "Order auto-cancelled"
                );
                self.events.publish_all(applied.events).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn cancel_txn(&self, order_id: i64, now: i64) -> ServiceResult<Option<AppliedTransition>> {
        let txn = self.storage.begin_write()?;
        let outcome = transition_in_txn(&self.storage, &txn, order_id, OrderStatus::Cancelled, now)?;
        match outcome {
            TransitionOutcome::Applied(applied) => {
                Storage::commit(txn)?;
                Ok(Some(applied))
            }
            TransitionOutcome::AlreadyHandled { current } => {
                tracing::info!(order_id, status = %current, "Order no longer PLACED, auto-cancel skipped");
                Ok(None)
            }
        }
    }
}
