//! Shared types for the delivery platform
//!
//! Domain models, the unified error system and small utilities used by
//! the server and its clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
