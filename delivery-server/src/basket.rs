//! Per-buyer basket
//!
//! A basket is bound to the store of its first item. Adding an item from a
//! different store starts the basket over. Lines keep the name and price
//! captured when they were added; checkout charges those snapshots.

use shared::error::{AppError, ErrorCode};
use shared::models::{AddBasketItemRequest, Basket, BasketItem, BasketItemOption};
use std::collections::BTreeSet;

use crate::error::ServiceResult;
use crate::orders::pricing;
use crate::storage::{BASKET_ITEM_SEQUENCE, Storage};

#[derive(Clone)]
pub struct BasketService {
    storage: Storage,
}

/// Option selections compare as a set of (option_id, quantity)
fn option_key(options: &[BasketItemOption]) -> BTreeSet<(i64, i32)> {
    options.iter().map(|o| (o.option_id, o.quantity)).collect()
}

fn recompute_total(basket: &mut Basket) -> ServiceResult<()> {
    basket.total_price = pricing::sum(basket.items.iter().map(|i| i.total_price))?;
    Ok(())
}

impl BasketService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// The buyer's basket, created empty on first access
    pub fn get_basket(&self, user_id: &str) -> ServiceResult<Basket> {
        if let Some(basket) = self.storage.get_basket(user_id)? {
            return Ok(basket);
        }
        let txn = self.storage.begin_write()?;
        let basket = match self.storage.get_basket_txn(&txn, user_id)? {
            Some(existing) => existing,
            None => {
                let basket = Basket::empty(user_id);
                self.storage.put_basket(&txn, &basket)?;
                basket
            }
        };
        Storage::commit(txn)?;
        Ok(basket)
    }

    pub fn add_to_basket(&self, user_id: &str, request: AddBasketItemRequest) -> ServiceResult<Basket> {
        pricing::validate_quantity(request.quantity)?;
        for selection in &request.options {
            pricing::validate_quantity(selection.quantity)?;
        }

        let txn = self.storage.begin_write()?;

        let menu = self
            .storage
            .get_menus_txn(&txn, &[request.menu_id])?
            .remove(&request.menu_id)
            .ok_or_else(|| {
                AppError::new(ErrorCode::MenuNotFound).with_detail("menu_id", request.menu_id)
            })?;
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

        match self.storage.get_store_txn(&txn, menu.store_id)? {
            Some(store) if !store.deleted => {}
            _ => {
                return Err(AppError::new(ErrorCode::StoreDeleted)
                    .with_detail("store_id", menu.store_id)
                    .into());
            }
        }

        let option_ids: Vec<i64> = request.options.iter().map(|o| o.option_id).collect();
        let catalog_options = self.storage.get_menu_options_txn(&txn, &option_ids)?;
        let mut options = Vec::with_capacity(request.options.len());
        for selection in &request.options {
            let option = catalog_options
                .get(&selection.option_id)
                .filter(|o| o.menu_id == menu.menu_id)
                .ok_or_else(|| {
                    AppError::new(ErrorCode::OptionNotFound)
                        .with_detail("option_id", selection.option_id)
                        .with_detail("menu_id", menu.menu_id)
                })?;
            options.push(BasketItemOption {
                option_id: option.option_id,
                option_name: option.name.clone(),
                unit_price: option.price,
                quantity: selection.quantity,
            });
        }

        let mut basket = self
            .storage
            .get_basket_txn(&txn, user_id)?
            .unwrap_or_else(|| Basket::empty(user_id));

        if basket.store_id.is_some_and(|id| id != menu.store_id) {
            tracing::info!(
                user_id = %user_id,
                from_store = ?basket.store_id,
                to_store = menu.store_id,
                "Basket switched store, previous items cleared"
            );
            basket.items.clear();
        }
        basket.store_id = Some(menu.store_id);

        let key = option_key(&options);
        let existing = basket
            .items
            .iter_mut()
            .find(|i| i.menu_id == menu.menu_id && option_key(&i.options) == key);

        match existing {
            Some(item) => {
                item.quantity = item.quantity.checked_add(request.quantity).ok_or_else(|| {
                    AppError::with_message(ErrorCode::ValueOutOfRange, "Quantity is too large")
                })?;
                item.total_price = pricing::line_total(
                    item.unit_price,
                    item.quantity,
                    item.options.iter().map(|o| (o.unit_price, o.quantity)),
                )?;
            }
            None => {
                let total_price = pricing::line_total(
                    menu.price,
                    request.quantity,
                    options.iter().map(|o| (o.unit_price, o.quantity)),
                )?;
                let basket_item_id = self.storage.next_sequence(&txn, BASKET_ITEM_SEQUENCE)? as i64;
                basket.items.push(BasketItem {
                    basket_item_id,
                    menu_id: menu.menu_id,
                    menu_name: menu.name.clone(),
                    unit_price: menu.price,
                    quantity: request.quantity,
                    options,
                    total_price,
                });
            }
        }

        recompute_total(&mut basket)?;
        self.storage.put_basket(&txn, &basket)?;
        Storage::commit(txn)?;

        tracing::debug!(user_id = %user_id, menu_id = menu.menu_id, total = basket.total_price, "Basket item added");
        Ok(basket)
    }

    pub fn remove_basket_item(&self, user_id: &str, basket_item_id: i64) -> ServiceResult<Basket> {
        let txn = self.storage.begin_write()?;
        let mut basket = self
            .storage
            .get_basket_txn(&txn, user_id)?
            .ok_or(ErrorCode::BasketNotFound)?;

        let before = basket.items.len();
        basket.items.retain(|i| i.basket_item_id != basket_item_id);
        if basket.items.len() == before {
            return Err(AppError::new(ErrorCode::BasketItemNotFound)
                .with_detail("basket_item_id", basket_item_id)
                .into());
        }

        recompute_total(&mut basket)?;
        self.storage.put_basket(&txn, &basket)?;
        Storage::commit(txn)?;
        Ok(basket)
    }

    pub fn clear_basket(&self, user_id: &str) -> ServiceResult<Basket> {
        let txn = self.storage.begin_write()?;
        let mut basket = self
            .storage
            .get_basket_txn(&txn, user_id)?
            .unwrap_or_else(|| Basket::empty(user_id));
        basket.items.clear();
        basket.total_price = 0;
        self.storage.put_basket(&txn, &basket)?;
        Storage::commit(txn)?;
        Ok(basket)
    }
}
