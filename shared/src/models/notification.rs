//! Live notification payloads pushed over SSE

use serde::{Deserialize, Serialize};

/// SSE event name for order status messages
pub const ORDER_STATUS_EVENT: &str = "order-status";
/// SSE event name for liveness pings
pub const PING_EVENT: &str = "ping";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Human-readable message about one of the buyer's orders
    OrderStatus { message: String },
    /// Zero-payload liveness check
    Ping,
}

impl Notification {
    pub fn order_status(message: impl Into<String>) -> Self {
        Self::OrderStatus {
            message: message.into(),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::OrderStatus { .. } => ORDER_STATUS_EVENT,
            Self::Ping => PING_EVENT,
        }
    }

    pub fn data(&self) -> &str {
        match self {
            Self::OrderStatus { message } => message,
            Self::Ping => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let n = Notification::order_status("Your order has been cancelled.");
        assert_eq!(n.event_name(), "order-status");
        assert_eq!(n.data(), "Your order has been cancelled.");
        assert_eq!(Notification::Ping.event_name(), "ping");
        assert_eq!(Notification::Ping.data(), "");
    }
}
