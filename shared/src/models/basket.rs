//! Basket Model

use super::order::OptionSelection;
use serde::{Deserialize, Serialize};

/// Per-buyer basket, bound to at most one store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basket {
    pub user_id: String,
    pub store_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<BasketItem>,
    /// Running total, kept equal to the sum of line totals
    #[serde(default)]
    pub total_price: i64,
}

impl Basket {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            store_id: None,
            items: Vec::new(),
            total_price: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Basket line with snapshots captured when the item was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub basket_item_id: i64,
    pub menu_id: i64,
    pub menu_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    #[serde(default)]
    pub options: Vec<BasketItemOption>,
    pub total_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItemOption {
    pub option_id: i64,
    pub option_name: String,
    pub unit_price: i64,
    pub quantity: i32,
}

/// Add-to-basket payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBasketItemRequest {
    pub menu_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub options: Vec<OptionSelection>,
}
