//! Checkout: ad-hoc item lists and baskets become persisted orders

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Basket, BasketCheckoutRequest, CheckoutRequest, Order, OrderItem, OrderItemOption,
    OrderStatus, Store,
};
use shared::util::{now_millis, snowflake_id};
use std::collections::{BTreeSet, HashSet};

use super::{OrderService, pricing, require_active};
use crate::error::ServiceResult;
use crate::events::DomainEvent;
use crate::storage::Storage;

/// Everything needed to persist a new order, after validation
struct PricedOrder {
    buyer_id: String,
    store: Store,
    items: Vec<OrderItem>,
    total: i64,
    address: String,
    address_detail: String,
}

impl OrderService {
    /// Validate, price, debit and persist an order from an explicit item list
    pub async fn checkout(&self, buyer_id: &str, request: CheckoutRequest) -> ServiceResult<Order> {
        let (order, events) = self.checkout_txn(buyer_id, request, now_millis())?;
        tracing::info!(
            order_id = order.id,
            buyer_id = %buyer_id,
            store_id = order.store_id,
            total = order.total_price,
            "Order placed"
        );
        self.events.publish_all(events).await;
        Ok(order)
    }

    /// Same as [`checkout`](Self::checkout) but against the buyer's basket,
    /// which is emptied in the same transaction
    pub async fn checkout_basket(
        &self,
        buyer_id: &str,
        request: BasketCheckoutRequest,
    ) -> ServiceResult<Order> {
        let (order, events) = self.checkout_basket_txn(buyer_id, request, now_millis())?;
        tracing::info!(
            order_id = order.id,
            buyer_id = %buyer_id,
            store_id = order.store_id,
            total = order.total_price,
            "Basket order placed"
        );
        self.events.publish_all(events).await;
        Ok(order)
    }

    fn checkout_txn(
        &self,
        buyer_id: &str,
        request: CheckoutRequest,
        now: i64,
    ) -> ServiceResult<(Order, Vec<DomainEvent>)> {
        if request.items.is_empty() {
            return Err(ErrorCode::OrderEmpty.into());
        }

        let txn = self.storage.begin_write()?;

        require_active(self.storage.get_account_txn(&txn, buyer_id), buyer_id)?;

        // one batched catalog lookup for every distinct menu id
        let menu_ids: Vec<i64> = request
            .items
            .iter()
            .map(|l| l.menu_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let menus = self.storage.get_menus_txn(&txn, &menu_ids)?;
        if let Some(missing) = menu_ids.iter().find(|id| !menus.contains_key(id)) {
            return Err(AppError::new(ErrorCode::MenuNotFound)
                .with_detail("menu_id", *missing)
                .into());
        }

        for menu_id in &menu_ids {
            let menu = &menus[menu_id];
            if menu.deleted {
                return Err(AppError::with_message(
                    ErrorCode::MenuDeleted,
                    format!("'{}' is no longer available", menu.name),
                )
                .with_detail("menu_id", menu.menu_id)
                .into());
            }
            if menu.sold_out {
                return Err(AppError::with_message(
                    ErrorCode::MenuSoldOut,
                    format!("'{}' is sold out", menu.name),
                )
                .with_detail("menu_id", menu.menu_id)
                .into());
            }
        }

        let store_ids: HashSet<i64> = menus.values().map(|m| m.store_id).collect();
        if store_ids.len() != 1 {
            return Err(ErrorCode::MixedStoreOrder.into());
        }
        let store_id = menus[&menu_ids[0]].store_id;
        let store = self.active_store(&txn, store_id, ErrorCode::StoreNotFound)?;

        let option_ids: Vec<i64> = request
            .items
            .iter()
            .flat_map(|l| l.options.iter().map(|o| o.option_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let options = self.storage.get_menu_options_txn(&txn, &option_ids)?;
        if let Some(missing) = option_ids.iter().find(|id| !options.contains_key(id)) {
            return Err(AppError::new(ErrorCode::OptionNotFound)
                .with_detail("option_id", *missing)
                .into());
        }

        let (items, total) = pricing::price_lines(&request.items, &menus, &options)?;

        let priced = PricedOrder {
            buyer_id: buyer_id.to_string(),
            store,
            items,
            total,
            address: request.address,
            address_detail: request.address_detail,
        };
        let order = self.persist_order(&txn, priced, now)?;
        Storage::commit(txn)?;

        let event = DomainEvent::OrderCreated {
            order_id: order.id,
            store_id: order.store_id,
            buyer_id: order.buyer_id.clone(),
        };
        Ok((order, vec![event]))
    }

    fn checkout_basket_txn(
        &self,
        buyer_id: &str,
        request: BasketCheckoutRequest,
        now: i64,
    ) -> ServiceResult<(Order, Vec<DomainEvent>)> {
        let txn = self.storage.begin_write()?;

        let mut basket: Basket = self
            .storage
            .get_basket_txn(&txn, buyer_id)?
            .ok_or(ErrorCode::BasketNotFound)?;

        // an unbound basket has never held an item
        let store_id = basket.store_id.ok_or(ErrorCode::BasketEmpty)?;
        let store = self.active_store(&txn, store_id, ErrorCode::StoreDeleted)?;

        if basket.is_empty() {
            return Err(ErrorCode::BasketEmpty.into());
        }

        let menu_ids: Vec<i64> = basket.items.iter().map(|i| i.menu_id).collect();
        let menus = self.storage.get_menus_txn(&txn, &menu_ids)?;
        for item in &basket.items {
            match menus.get(&item.menu_id) {
                Some(menu) if !menu.deleted => {
                    if menu.sold_out {
                        return Err(AppError::with_message(
                            ErrorCode::MenuSoldOut,
                            format!("'{}' is sold out", item.menu_name),
                        )
                        .with_detail("menu_id", item.menu_id)
                        .into());
                    }
                }
                _ => {
                    return Err(AppError::with_message(
                        ErrorCode::MenuDeleted,
                        format!("'{}' is no longer available", item.menu_name),
                    )
                    .with_detail("menu_id", item.menu_id)
                    .into());
                }
            }
        }

        // prices come from the basket snapshots, not the current catalog
        let mut items = Vec::with_capacity(basket.items.len());
        for item in &basket.items {
            let mut options = Vec::with_capacity(item.options.len());
            for o in &item.options {
                options.push(OrderItemOption {
                    option_id: o.option_id,
                    option_name: o.option_name.clone(),
                    unit_price: o.unit_price,
                    quantity: o.quantity,
                    total_price: pricing::extend(o.unit_price, o.quantity)?,
                });
            }
            items.push(OrderItem {
                menu_id: item.menu_id,
                menu_name: item.menu_name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                total_price: item.total_price,
                options,
            });
        }
        let total = pricing::sum(items.iter().map(|i| i.total_price))?;
        if total != basket.total_price {
            tracing::warn!(
                buyer_id = %buyer_id,
                basket_total = basket.total_price,
                line_total = total,
                "Basket running total out of step with its lines"
            );
        }

        let priced = PricedOrder {
            buyer_id: buyer_id.to_string(),
            store,
            items,
            total,
            address: request.address,
            address_detail: request.address_detail,
        };
        let order = self.persist_order(&txn, priced, now)?;

        basket.items.clear();
        basket.total_price = 0;
        self.storage.put_basket(&txn, &basket)?;

        Storage::commit(txn)?;

        let event = DomainEvent::OrderCreated {
            order_id: order.id,
            store_id: order.store_id,
            buyer_id: order.buyer_id.clone(),
        };
        Ok((order, vec![event]))
    }

    fn active_store(
        &self,
        txn: &redb::WriteTransaction,
        store_id: i64,
        missing: ErrorCode,
    ) -> ServiceResult<Store> {
        match self.storage.get_store_txn(txn, store_id)? {
            Some(store) if !store.deleted => Ok(store),
            Some(_) => Err(AppError::new(ErrorCode::StoreDeleted)
                .with_detail("store_id", store_id)
                .into()),
            None => Err(AppError::new(missing).with_detail("store_id", store_id).into()),
        }
    }

    /// Snowflake id no stored order uses yet; held free by the write lock
    fn unused_order_id(&self, txn: &redb::WriteTransaction) -> ServiceResult<i64> {
        loop {
            let id = snowflake_id();
            if self.storage.get_order_txn(txn, id)?.is_none() {
                return Ok(id);
            }
            tracing::debug!(order_id = id, "Order id already taken, drawing another");
        }
    }

    /// Minimum order and balance checks, debit, insert
    fn persist_order(
        &self,
        txn: &redb::WriteTransaction,
        priced: PricedOrder,
        now: i64,
    ) -> ServiceResult<Order> {
        let store = &priced.store;
        if store.min_order_price > 0 && priced.total < store.min_order_price {
            return Err(AppError::new(ErrorCode::BelowMinimumOrder)
                .with_detail("min_order_price", store.min_order_price)
                .with_detail("total_price", priced.total)
                .into());
        }

        let mut buyer = require_active(
            self.storage.get_account_txn(txn, &priced.buyer_id),
            &priced.buyer_id,
        )?;
        if buyer.deposit < priced.total {
            return Err(AppError::new(ErrorCode::InsufficientBalance)
                .with_detail("deposit", buyer.deposit)
                .with_detail("total_price", priced.total)
                .into());
        }
        buyer.deposit -= priced.total;
        self.storage.put_account(txn, &buyer)?;

        let order = Order {
            id: self.unused_order_id(txn)?,
            created_at: now,
            updated_at: now,
            status: OrderStatus::Placed,
            total_price: priced.total,
            address: priced.address,
            address_detail: priced.address_detail,
            buyer_id: priced.buyer_id,
            store_id: store.store_id,
            items: priced.items,
        };
        self.storage.put_order(txn, &order)?;
        Ok(order)
    }
}
