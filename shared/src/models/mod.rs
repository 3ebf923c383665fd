//! Data models
//!
//! Shared between delivery-server and clients (via API).
//! Persisted records are stored as JSON; numeric ids are snowflake `i64`,
//! user ids are login strings, money is `i64` in the minor unit.

pub mod account;
pub mod basket;
pub mod catalog;
pub mod notification;
pub mod order;

// Re-exports
pub use account::*;
pub use basket::*;
pub use catalog::*;
pub use notification::*;
pub use order::*;
