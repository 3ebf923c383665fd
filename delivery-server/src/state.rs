//! Application state shared by all handlers

use std::sync::Arc;

use crate::basket::BasketService;
use crate::config::Config;
use crate::events::EventBus;
use crate::events::listeners::{LiveNotificationListener, SmsOrderListener};
use crate::notify::NotificationRegistry;
use crate::orders::OrderService;
use crate::sms::SmsSender;
use crate::storage::Storage;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Storage,
    /// Live push connections
    pub registry: NotificationRegistry,
    /// Post-commit event dispatch (SMS + live push listeners)
    pub events: Arc<EventBus>,
    pub orders: OrderService,
    pub baskets: BasketService,
    /// JWT secret for bearer tokens
    pub jwt_secret: String,
}

impl AppState {
    /// Wire services and listeners over an opened storage
    pub fn new(config: Config, storage: Storage, sms: Arc<dyn SmsSender>) -> Self {
        let registry =
            NotificationRegistry::new(config.sse_max_lifetime, config.sse_channel_capacity);

        let events = Arc::new(
            EventBus::new()
                .with_listener(Arc::new(SmsOrderListener::new(storage.clone(), sms)))
                .with_listener(Arc::new(LiveNotificationListener::new(registry.clone()))),
        );

        Self {
            orders: OrderService::new(storage.clone(), events.clone()),
            baskets: BasketService::new(storage.clone()),
            jwt_secret: config.jwt_secret.clone(),
            config: Arc::new(config),
            storage,
            registry,
            events,
        }
    }
}
