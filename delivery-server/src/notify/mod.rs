//! Live notifications pushed to connected buyers

pub mod registry;

pub use registry::{NotificationRegistry, Subscription};
