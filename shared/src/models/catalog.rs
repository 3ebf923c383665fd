//! Store and menu catalog models

use serde::{Deserialize, Serialize};

/// Store entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub store_id: i64,
    pub name: String,
    pub owner_id: String,
    /// 0 = no minimum
    #[serde(default)]
    pub min_order_price: i64,
    #[serde(default)]
    pub deleted: bool,
}

/// Menu item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub menu_id: i64,
    pub store_id: i64,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub sold_out: bool,
    #[serde(default)]
    pub deleted: bool,
}

/// Priced add-on belonging to a single menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOption {
    pub option_id: i64,
    pub menu_id: i64,
    pub name: String,
    pub price: i64,
}
