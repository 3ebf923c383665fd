//! Order status state machine
//!
//! ```text
//! PLACED ──> COMPLETED   (owner accepts; owner balance += total)
//!    └─────> CANCELLED   (owner or auto-cancel; buyer deposit += total)
//! ```
//!
//! Both terminal states are final. The transition re-reads the order inside
//! the write transaction and only proceeds while it is still PLACED, so when
//! an owner and the auto-cancel job race on one order exactly one of them
//! applies its balance adjustment.

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderStatus};
use shared::util::now_millis;

use super::{OrderService, require_active};
use crate::error::ServiceResult;
use crate::events::DomainEvent;
use crate::storage::Storage;

/// A transition that was written, with the events to publish after commit
#[derive(Debug)]
pub struct AppliedTransition {
    pub order: Order,
    pub events: Vec<DomainEvent>,
}

#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(AppliedTransition),
    /// The order had already left PLACED (zero rows affected)
    AlreadyHandled { current: OrderStatus },
}

/// Move a PLACED order to `target` inside `txn`
///
/// The caller commits. `OrderNotFound` if the order does not exist,
/// `InvalidStatusTransition` if `target` is not terminal.
pub fn transition_in_txn(
    storage: &Storage,
    txn: &redb::WriteTransaction,
    order_id: i64,
    target: OrderStatus,
    now: i64,
) -> ServiceResult<TransitionOutcome> {
    if !target.is_terminal() {
        return Err(AppError::new(ErrorCode::InvalidStatusTransition)
            .with_detail("status", target.as_str())
            .into());
    }

    let mut order = storage.get_order_txn(txn, order_id)?.ok_or_else(|| {
        AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id)
    })?;

    if order.status != OrderStatus::Placed {
        return Ok(TransitionOutcome::AlreadyHandled {
            current: order.status,
        });
    }

    order.status = target;
    order.updated_at = now;
    storage.put_order(txn, &order)?;

    let mut events = Vec::new();
    match target {
        OrderStatus::Cancelled => {
            let buyer = storage
                .get_account_txn(txn, &order.buyer_id)?
                .filter(|a| a.is_active());
            match buyer {
                Some(mut buyer) => {
                    buyer.deposit = buyer.deposit.checked_add(order.total_price).ok_or_else(|| {
                        AppError::with_message(ErrorCode::ValueOutOfRange, "Deposit overflow")
                    })?;
                    storage.put_account(txn, &buyer)?;
                    events.extend(DomainEvent::status_changed(order.id, &order.buyer_id, target));
                }
                None => {
                    tracing::warn!(
                        order_id = order.id,
                        buyer_id = %order.buyer_id,
                        "Buyer missing or deleted, order cancelled without refund"
                    );
                }
            }
        }
        OrderStatus::Completed => {
            match storage.get_store_txn(txn, order.store_id)? {
                Some(store) => match storage.get_account_txn(txn, &store.owner_id)? {
                    Some(mut owner) => {
                        owner.balance = owner.balance.checked_add(order.total_price).ok_or_else(|| {
                            AppError::with_message(ErrorCode::ValueOutOfRange, "Balance overflow")
                        })?;
                        storage.put_account(txn, &owner)?;
                    }
                    None => {
                        tracing::warn!(order_id = order.id, owner_id = %store.owner_id, "Store owner missing, earnings not credited");
                    }
                },
                None => {
                    tracing::warn!(order_id = order.id, store_id = order.store_id, "Store missing, earnings not credited");
                }
            }
            events.extend(DomainEvent::status_changed(order.id, &order.buyer_id, target));
        }
        OrderStatus::Placed => {}
    }

    Ok(TransitionOutcome::Applied(AppliedTransition { order, events }))
}

impl OrderService {
    /// Owner-driven accept / cancel
    pub async fn change_status(
        &self,
        actor_id: &str,
        order_id: i64,
        target: OrderStatus,
    ) -> ServiceResult<Order> {
        let applied = self.change_status_txn(actor_id, order_id, target, now_millis())?;
        tracing::info!(
            order_id,
            actor_id = %actor_id,
            status = %applied.order.status,
            "Order status changed"
        );
        self.events.publish_all(applied.events).await;
        Ok(applied.order)
    }

    fn change_status_txn(
        &self,
        actor_id: &str,
        order_id: i64,
        target: OrderStatus,
        now: i64,
    ) -> ServiceResult<AppliedTransition> {
        if !target.is_terminal() {
            return Err(AppError::new(ErrorCode::InvalidStatusTransition)
                .with_detail("status", target.as_str())
                .into());
        }

        let txn = self.storage.begin_write()?;
        require_active(self.storage.get_account_txn(&txn, actor_id), actor_id)?;

        let order = self.storage.get_order_txn(&txn, order_id)?.ok_or_else(|| {
            AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id)
        })?;
        let owns_store = self
            .storage
            .get_store_txn(&txn, order.store_id)?
            .is_some_and(|s| s.owner_id == actor_id);
        if !owns_store {
            return Err(AppError::permission_denied("Order belongs to another store").into());
        }

        match transition_in_txn(&self.storage, &txn, order_id, target, now)? {
            TransitionOutcome::Applied(applied) => {
                Storage::commit(txn)?;
                Ok(applied)
            }
            TransitionOutcome::AlreadyHandled { current } => {
                tracing::info!(order_id, current = %current, "Order already handled");
                Err(AppError::new(ErrorCode::OrderNotPlaced)
                    .with_detail("status", current.as_str())
                    .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::testing::{Fixture, Recorder};
    use std::sync::Arc;

    fn setup() -> (Fixture, OrderService, Arc<Recorder>) {
        let fx = Fixture::new();
        let recorder = Arc::new(Recorder::default());
        let bus = EventBus::new().with_listener(recorder.clone());
        let svc = OrderService::new(fx.storage.clone(), Arc::new(bus));
        (fx, svc, recorder)
    }

    #[tokio::test]
    async fn test_cancel_refunds_buyer_once() {
        let (fx, svc, recorder) = setup();
        let order_id = fx.placed_order(10_000, 0);

        let order = svc
            .change_status(Fixture::OWNER, order_id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(fx.deposit(Fixture::BUYER), 15_000 + 10_000);

        let err = svc
            .change_status(Fixture::OWNER, order_id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OrderNotPlaced));
        assert_eq!(fx.deposit(Fixture::BUYER), 25_000);

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            DomainEvent::OrderStatusChanged { message, .. } if message == "Your order has been cancelled."
        ));
    }

    #[tokio::test]
    async fn test_complete_credits_owner() {
        let (fx, svc, recorder) = setup();
        let order_id = fx.placed_order(12_000, 0);

        svc.change_status(Fixture::OWNER, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        assert_eq!(fx.balance(Fixture::OWNER), 12_000);
        assert_eq!(fx.deposit(Fixture::BUYER), 15_000);
        assert_eq!(recorder.events().len(), 1);

        // accepted orders cannot be cancelled afterwards
        let err = svc
            .change_status(Fixture::OWNER, order_id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::OrderNotPlaced));
        assert_eq!(fx.balance(Fixture::OWNER), 12_000);
    }

    #[tokio::test]
    async fn test_guards() {
        let (fx, svc, _) = setup();
        let order_id = fx.placed_order(10_000, 0);

        let code = |r: ServiceResult<Order>| r.unwrap_err().code();
        assert_eq!(
            code(svc.change_status(Fixture::OWNER, order_id, OrderStatus::Placed).await),
            Some(ErrorCode::InvalidStatusTransition)
        );
        assert_eq!(
            code(svc.change_status("ghost", order_id, OrderStatus::Cancelled).await),
            Some(ErrorCode::UserNotFound)
        );
        assert_eq!(
            code(svc.change_status(Fixture::OWNER, 9_999, OrderStatus::Cancelled).await),
            Some(ErrorCode::OrderNotFound)
        );
        assert_eq!(
            code(svc.change_status(Fixture::OTHER_OWNER, order_id, OrderStatus::Cancelled).await),
            Some(ErrorCode::PermissionDenied)
        );
        assert_eq!(fx.deposit(Fixture::BUYER), 15_000);
    }

    #[test]
    fn test_cancel_without_active_buyer_changes_status_only() {
        let fx = Fixture::new();
        let order_id = fx.placed_order(10_000, 0);
        let mut buyer = fx.storage.get_account(Fixture::BUYER).unwrap().unwrap();
        buyer.deleted = true;
        fx.storage.upsert_account(&buyer).unwrap();

        let txn = fx.storage.begin_write().unwrap();
        let outcome =
            transition_in_txn(&fx.storage, &txn, order_id, OrderStatus::Cancelled, 1).unwrap();
        Storage::commit(txn).unwrap();

        let TransitionOutcome::Applied(applied) = outcome else {
            panic!("expected applied transition");
        };
        assert!(applied.events.is_empty());
        assert_eq!(applied.order.updated_at, 1);
        assert_eq!(fx.deposit(Fixture::BUYER), 15_000);
        assert_eq!(
            fx.storage.get_order(order_id).unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn test_uncommitted_transition_is_not_visible() {
        let fx = Fixture::new();
        let order_id = fx.placed_order(10_000, 0);
        {
            let txn = fx.storage.begin_write().unwrap();
            transition_in_txn(&fx.storage, &txn, order_id, OrderStatus::Cancelled, 1).unwrap();
        }
        assert_eq!(
            fx.storage.get_order(order_id).unwrap().unwrap().status,
            OrderStatus::Placed
        );
        assert_eq!(fx.deposit(Fixture::BUYER), 15_000);
    }
}
