//! Review prompts for recently completed orders
//!
//! Looks at orders completed between `delay + window` and `delay` ago and
//! nudges each buyer once per order, but only while they hold a live
//! connection. A buyer who is offline is simply tried again on the next run
//! as long as the order is still inside the window.

use parking_lot::Mutex as SyncMutex;
use shared::util::now_millis;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{as_millis, run_every};
use crate::events::{DomainEvent, EventBus, REVIEW_REQUEST_MESSAGE};
use crate::notify::NotificationRegistry;
use crate::storage::Storage;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReviewPromptReport {
    pub prompted: usize,
    /// Buyer gone, deleted or not connected
    pub skipped: usize,
}

pub struct ReviewPromptScheduler {
    storage: Storage,
    events: Arc<EventBus>,
    registry: NotificationRegistry,
    delay: Duration,
    window: Duration,
    /// order_id -> completion time of orders already prompted
    prompted: SyncMutex<HashMap<i64, i64>>,
    run_lock: Mutex<()>,
}

impl ReviewPromptScheduler {
    pub fn new(
        storage: Storage,
        events: Arc<EventBus>,
        registry: NotificationRegistry,
        delay: Duration,
        window: Duration,
    ) -> Self {
        Self {
            storage,
            events,
            registry,
            delay,
            window,
            prompted: SyncMutex::new(HashMap::new()),
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(self: Arc<Self>, initial_delay: Duration, period: Duration, shutdown: CancellationToken) {
        run_every("review_prompt", initial_delay, period, shutdown, || {
            let this = self.clone();
            async move {
                this.run_once(now_millis()).await;
            }
        })
        .await;
    }

    pub fn prompted_count(&self) -> usize {
        self.prompted.lock().len()
    }

    /// One pass; `None` when a previous pass still holds the lock
    pub async fn run_once(&self, now: i64) -> Option<ReviewPromptReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::debug!("Review prompt run still in progress, skipping tick");
            return None;
        };

        let upper = now.saturating_sub(as_millis(self.delay));
        let lower = upper.saturating_sub(as_millis(self.window));

        let mut report = ReviewPromptReport::default();
        let orders = match self.storage.completed_orders_between(lower, upper) {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "Review prompt scan failed");
                return Some(report);
            }
        };

        for order in orders {
            if self.prompted.lock().contains_key(&order.id) {
                continue;
            }

            let buyer_active = match self.storage.get_account(&order.buyer_id) {
                Ok(account) => account.is_some_and(|a| a.is_active()),
                Err(e) => {
                    tracing::error!(order_id = order.id, error = %e, "Buyer lookup failed");
                    false
                }
            };
            if !buyer_active || !self.registry.is_connected(&order.buyer_id) {
                report.skipped += 1;
                continue;
            }

            self.events
                .publish(DomainEvent::ReviewRequested {
                    order_id: order.id,
                    buyer_id: order.buyer_id.clone(),
                    message: REVIEW_REQUEST_MESSAGE.to_string(),
                })
                .await;
            self.prompted.lock().insert(order.id, order.updated_at);
            report.prompted += 1;
        }

        let purged = {
            let mut prompted = self.prompted.lock();
            let before = prompted.len();
            prompted.retain(|_, completed_at| *completed_at >= lower);
            before - prompted.len()
        };

        if report.prompted > 0 || purged > 0 {
            tracing::info!(
                prompted = report.prompted,
                skipped = report.skipped,
                purged,
                "Review prompt run finished"
            );
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::listeners::LiveNotificationListener;
    use crate::testing::{Fixture, Recorder};
    use futures::StreamExt;
    use shared::models::Notification;

    const MINUTE: i64 = 60_000;
    const HOUR: i64 = 60 * MINUTE;

    fn setup() -> (Fixture, ReviewPromptScheduler, NotificationRegistry, Arc<Recorder>) {
        let fx = Fixture::new();
        let registry = NotificationRegistry::new(Duration::from_secs(3600), 8);
        let recorder = Arc::new(Recorder::default());
        let bus = EventBus::new()
            .with_listener(Arc::new(LiveNotificationListener::new(registry.clone())))
            .with_listener(recorder.clone());
        let scheduler = ReviewPromptScheduler::new(
            fx.storage.clone(),
            Arc::new(bus),
            registry.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        (fx, scheduler, registry, recorder)
    }

    #[tokio::test]
    async fn test_prompts_connected_buyer_once() {
        let (fx, scheduler, registry, recorder) = setup();
        let now = 100 * HOUR;
        fx.completed_order(10_000, now - HOUR - 5 * MINUTE);
        let mut sub = registry.subscribe(Fixture::BUYER);

        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(report.prompted, 1);
        assert_eq!(sub.next().await, Some(Notification::Ping));
        assert_eq!(
            sub.next().await,
            Some(Notification::order_status(REVIEW_REQUEST_MESSAGE))
        );

        let report = scheduler.run_once(now + 10 * MINUTE).await.unwrap();
        assert_eq!(report, ReviewPromptReport::default());
        assert_eq!(recorder.events().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_buyer_is_retried_later() {
        let (fx, scheduler, registry, recorder) = setup();
        let now = 100 * HOUR;
        fx.completed_order(10_000, now - HOUR - 5 * MINUTE);

        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(scheduler.prompted_count(), 0);

        let _sub = registry.subscribe(Fixture::BUYER);
        let report = scheduler.run_once(now + 10 * MINUTE).await.unwrap();
        assert_eq!(report.prompted, 1);
        assert_eq!(recorder.events().len(), 1);
    }

    #[tokio::test]
    async fn test_orders_outside_window_ignored() {
        let (fx, scheduler, registry, _) = setup();
        let now = 100 * HOUR;
        // too fresh
        fx.completed_order(10_000, now - 30 * MINUTE);
        // too old
        fx.completed_order(10_000, now - 3 * HOUR);
        // placed, never completed
        fx.placed_order(10_000, now - 90 * MINUTE);
        let _sub = registry.subscribe(Fixture::BUYER);

        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(report, ReviewPromptReport::default());
    }

    #[tokio::test]
    async fn test_deleted_buyer_skipped() {
        let (fx, scheduler, registry, _) = setup();
        let now = 100 * HOUR;
        fx.completed_order(10_000, now - 90 * MINUTE);
        let mut buyer = fx.storage.get_account(Fixture::BUYER).unwrap().unwrap();
        buyer.deleted = true;
        fx.storage.upsert_account(&buyer).unwrap();
        let _sub = registry.subscribe(Fixture::BUYER);

        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.prompted, 0);
    }

    #[tokio::test]
    async fn test_prompted_entries_purged_after_window() {
        let (fx, scheduler, registry, _) = setup();
        let now = 100 * HOUR;
        fx.completed_order(10_000, now - HOUR - 5 * MINUTE);
        let _sub = registry.subscribe(Fixture::BUYER);

        scheduler.run_once(now).await.unwrap();
        assert_eq!(scheduler.prompted_count(), 1);

        scheduler.run_once(now + 2 * HOUR).await.unwrap();
        assert_eq!(scheduler.prompted_count(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let (_, scheduler, _, _) = setup();
        let _guard = scheduler.run_lock.try_lock().unwrap();
        assert!(scheduler.run_once(0).await.is_none());
    }
}
