//! Account Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Owner,
    Admin,
}

/// Account entity (buyers and store owners)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    /// Prepaid buyer balance, debited at checkout
    #[serde(default)]
    pub deposit: i64,
    /// Owner earnings, credited on completion
    #[serde(default)]
    pub balance: i64,
    /// Owned store (owners only)
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub deleted: bool,
}

impl Account {
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}
