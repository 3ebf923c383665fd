//! In-process domain events
//!
//! Services collect events while their write transaction is open and hand
//! them to [`EventBus::publish`] only after `commit()` succeeded. Every
//! listener that accepts an event is awaited in turn; an error or panic in
//! one listener is logged and never reaches the others or the caller.

pub mod listeners;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use shared::models::OrderStatus;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::core::tasks::panic_message;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Review nudge sent to buyers
pub const REVIEW_REQUEST_MESSAGE: &str = "How was your meal?\nPlease leave a review.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: i64,
        store_id: i64,
        buyer_id: String,
    },
    OrderStatusChanged {
        order_id: i64,
        buyer_id: String,
        status: OrderStatus,
        message: String,
    },
    ReviewRequested {
        order_id: i64,
        buyer_id: String,
        message: String,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::ReviewRequested { .. } => "review_requested",
        }
    }

    pub fn order_id(&self) -> i64 {
        match self {
            Self::OrderCreated { order_id, .. }
            | Self::OrderStatusChanged { order_id, .. }
            | Self::ReviewRequested { order_id, .. } => *order_id,
        }
    }

    /// Status-change event for the buyer, if the status has a buyer message
    pub fn status_changed(order_id: i64, buyer_id: &str, status: OrderStatus) -> Option<Self> {
        status.buyer_message().map(|message| Self::OrderStatusChanged {
            order_id,
            buyer_id: buyer_id.to_string(),
            status,
            message: message.to_string(),
        })
    }
}

#[async_trait]
pub trait EventListener: Send + Sync {
    fn name(&self) -> &'static str;

    fn accepts(&self, event: &DomainEvent) -> bool;

    async fn handle(&self, event: &DomainEvent) -> Result<(), BoxError>;
}

/// Post-commit event dispatcher
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver one event to every accepting listener
    pub async fn publish(&self, event: DomainEvent) {
        for listener in &self.listeners {
            if !listener.accepts(&event) {
                continue;
            }
            let outcome = AssertUnwindSafe(listener.handle(&event)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(
                        listener = listener.name(),
                        event = event.name(),
                        order_id = event.order_id(),
                        "Event handled"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        listener = listener.name(),
                        event = event.name(),
                        order_id = event.order_id(),
                        error = %e,
                        "Event listener failed"
                    );
                }
                Err(panic_info) => {
                    tracing::error!(
                        listener = listener.name(),
                        event = event.name(),
                        order_id = event.order_id(),
                        panic = %panic_message(&*panic_info),
                        "Event listener panicked"
                    );
                }
            }
        }
    }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}
