//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status. `Placed` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Placed)
    }

    /// Message pushed to the buyer when an order enters this status
    pub fn buyer_message(&self) -> Option<&'static str> {
        match self {
            Self::Placed => None,
            Self::Completed => Some("Your order has been accepted."),
            Self::Cancelled => Some("Your order has been cancelled."),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted order (immutable except for `status` / `updated_at`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub created_at: i64,
    /// Last status change; completion time for COMPLETED orders
    pub updated_at: i64,
    pub status: OrderStatus,
    pub total_price: i64,
    pub address: String,
    pub address_detail: String,
    pub buyer_id: String,
    pub store_id: i64,
    pub items: Vec<OrderItem>,
}

/// Line item snapshot taken at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_id: i64,
    pub menu_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    /// unit_price * quantity + sum of option totals
    pub total_price: i64,
    #[serde(default)]
    pub options: Vec<OrderItemOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemOption {
    pub option_id: i64,
    pub option_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub total_price: i64,
}

/// Requested option on an order line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionSelection {
    pub option_id: i64,
    pub quantity: i32,
}

/// Requested order line (menu + quantity + options)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub menu_id: i64,
    pub quantity: i32,
    #[serde(default)]
    pub options: Vec<OptionSelection>,
}

/// Ad-hoc checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub address: String,
    #[serde(default)]
    pub address_detail: String,
    pub items: Vec<OrderLineRequest>,
}

/// Basket checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketCheckoutRequest {
    pub address: String,
    #[serde(default)]
    pub address_detail: String,
}

/// Owner status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Completed-order sales for a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSalesStats {
    pub store_id: i64,
    pub today_total: i64,
    pub today_count: u32,
    pub last_30_days_total: i64,
    pub last_30_days_count: u32,
}
