//! Delivery server - order lifecycle and live notification core
//!
//! # Module layout
//!
//! ```text
//! delivery-server/src/
//! ├── storage.rs     # redb tables (orders, accounts, catalog, baskets)
//! ├── orders/        # checkout, pricing, status state machine, queries
//! ├── basket.rs      # per-buyer basket
//! ├── events/        # post-commit event bus + SMS / live listeners
//! ├── notify/        # live connection registry (SSE)
//! ├── scheduler/     # auto-cancel and review-prompt jobs
//! ├── sms.rs         # SMS gateway client
//! ├── auth.rs        # JWT identity
//! ├── api/           # HTTP routes and handlers
//! └── core/          # background task manager
//! ```

pub mod api;
pub mod auth;
pub mod basket;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod notify;
pub mod orders;
pub mod scheduler;
pub mod sms;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::AppState;
pub use storage::{Storage, StorageError};
