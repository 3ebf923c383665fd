//! Event listeners: SMS to store owners, live push to buyers

use async_trait::async_trait;
use shared::models::{Notification, Order};
use std::sync::Arc;

use super::{DomainEvent, EventListener};
use crate::notify::NotificationRegistry;
use crate::sms::{SmsSender, normalize_phone};
use crate::storage::Storage;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One ` - <name> x<qty>` line per order item
pub fn order_summary(order: &Order) -> String {
    let mut summary = String::new();
    for item in &order.items {
        summary.push_str(" - ");
        summary.push_str(&item.menu_name);
        summary.push_str(&format!(" x{}\n", item.quantity));
    }
    summary
}

/// `OrderCreated` -> SMS with the order summary to the store owner
pub struct SmsOrderListener {
    storage: Storage,
    sender: Arc<dyn SmsSender>,
}

impl SmsOrderListener {
    pub fn new(storage: Storage, sender: Arc<dyn SmsSender>) -> Self {
        Self { storage, sender }
    }
}

#[async_trait]
impl EventListener for SmsOrderListener {
    fn name(&self) -> &'static str {
        "sms_order"
    }

    fn accepts(&self, event: &DomainEvent) -> bool {
        matches!(event, DomainEvent::OrderCreated { .. })
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), BoxError> {
        let DomainEvent::OrderCreated {
            order_id, store_id, ..
        } = event
        else {
            return Ok(());
        };

        let order = self
            .storage
            .get_order(*order_id)?
            .ok_or_else(|| format!("order {order_id} not found"))?;
        let store = self
            .storage
            .get_store(*store_id)?
            .ok_or_else(|| format!("store {store_id} not found"))?;
        let owner = self
            .storage
            .get_account(&store.owner_id)?
            .ok_or_else(|| format!("owner {} not found", store.owner_id))?;

        // the gateway call runs detached; checkout never waits on it
        let sender = self.sender.clone();
        let to = normalize_phone(&owner.phone);
        let summary = order_summary(&order);
        let (order_id, store_id) = (*order_id, *store_id);
        tokio::spawn(async move {
            match sender.send(&to, &summary).await {
                Ok(()) => tracing::info!(order_id, store_id, "Order SMS sent to owner"),
                Err(e) => tracing::warn!(order_id, store_id, error = %e, "Order SMS failed"),
            }
        });
        Ok(())
    }
}

/// Status changes and review requests -> `order-status` push to the buyer
pub struct LiveNotificationListener {
    registry: NotificationRegistry,
}

impl LiveNotificationListener {
    pub fn new(registry: NotificationRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl EventListener for LiveNotificationListener {
    fn name(&self) -> &'static str {
        "live_notification"
    }

    fn accepts(&self, event: &DomainEvent) -> bool {
        matches!(
            event,
            DomainEvent::OrderStatusChanged { .. } | DomainEvent::ReviewRequested { .. }
        )
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), BoxError> {
        let (order_id, buyer_id, message) = match event {
            DomainEvent::OrderStatusChanged {
                order_id,
                buyer_id,
                message,
                ..
            }
            | DomainEvent::ReviewRequested {
                order_id,
                buyer_id,
                message,
            } => (order_id, buyer_id, message),
            DomainEvent::OrderCreated { .. } => return Ok(()),
        };

        let delivered = self
            .registry
            .publish(buyer_id, Notification::order_status(message.clone()));
        if delivered {
            tracing::info!(order_id, buyer_id = %buyer_id, "Live notification sent");
        } else {
            tracing::debug!(order_id, buyer_id = %buyer_id, "Buyer not connected, notification dropped");
        }
        Ok(())
    }
}
