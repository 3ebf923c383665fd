//! Read models for buyers and store owners

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderStatus, Role, Store, StoreSalesStats};
use shared::util::start_of_day_millis;

use super::{OrderService, pricing};
use crate::error::ServiceResult;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const STATS_DAYS: i64 = 30;

impl OrderService {
    /// Buyer's orders, newest first
    pub fn my_orders(&self, buyer_id: &str) -> ServiceResult<Vec<Order>> {
        Ok(self.storage.orders_by_buyer(buyer_id)?)
    }

    pub fn my_order(&self, buyer_id: &str, order_id: i64) -> ServiceResult<Order> {
        let order = self.storage.get_order(order_id)?.ok_or_else(|| {
            AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", order_id)
        })?;
        if order.buyer_id != buyer_id {
            return Err(AppError::permission_denied("Order belongs to another buyer").into());
        }
        Ok(order)
    }

    /// The store owned by `actor_id`
    pub fn owned_store(&self, actor_id: &str) -> ServiceResult<Store> {
        let account = self
            .storage
            .get_account(actor_id)?
            .filter(|a| a.is_active())
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound).with_detail("user_id", actor_id))?;

        let store_id = match (account.role, account.store_id) {
            (Role::Owner, Some(store_id)) => store_id,
            _ => return Err(AppError::permission_denied("No store owned by this account").into()),
        };

        match self.storage.get_store(store_id)? {
            Some(store) if store.owner_id == actor_id => Ok(store),
            _ => Err(AppError::permission_denied("No store owned by this account").into()),
        }
    }

    /// Orders received by the actor's store, newest first
    pub fn store_orders(&self, actor_id: &str) -> ServiceResult<Vec<Order>> {
        let store = self.owned_store(actor_id)?;
        Ok(self.storage.orders_by_store(store.store_id)?)
    }

    /// Completed sales today (since 00:00 UTC) and over the last 30 days
    pub fn store_stats(&self, actor_id: &str, now: i64) -> ServiceResult<StoreSalesStats> {
        let store = self.owned_store(actor_id)?;
        let today_start = start_of_day_millis(now);
        let window_start = now.saturating_sub(STATS_DAYS * DAY_MS);

        let completed: Vec<Order> = self
            .storage
            .orders_by_store(store.store_id)?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Completed && o.updated_at <= now)
            .collect();

        let today: Vec<i64> = completed
            .iter()
            .filter(|o| o.updated_at >= today_start)
            .map(|o| o.total_price)
            .collect();
        let last_30_days: Vec<i64> = completed
            .iter()
            .filter(|o| o.updated_at >= window_start)
            .map(|o| o.total_price)
            .collect();

        let stats = StoreSalesStats {
            store_id: store.store_id,
            today_total: pricing::sum(today.iter().copied())?,
            today_count: today.len() as u32,
            last_30_days_total: pricing::sum(last_30_days.iter().copied())?,
            last_30_days_count: last_30_days.len() as u32,
        };
        Ok(stats)
    }
}
