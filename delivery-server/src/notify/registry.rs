//! NotificationRegistry: one live push connection per user
//!
//! ```text
//! subscribe(user) ──► DashMap<user_id, Connection{conn_id, Sender, expires_at}>
//!                              │ try_send
//!                              ▼
//!                     Subscription (Stream) ──► SSE response
//! ```
//!
//! Delivery is best effort. A failed `try_send` (receiver gone, buffer
//! full) or an expired connection removes the handle on the spot. Removal is
//! always conditional on the connection id, so a stream that is replaced by
//! a newer subscription can never evict its successor.

use dashmap::DashMap;
use futures::Stream;
use shared::models::Notification;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep};

struct Connection {
    conn_id: u64,
    sender: mpsc::Sender<Notification>,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct NotificationRegistry {
    connections: Arc<DashMap<String, Connection>>,
    next_conn_id: Arc<AtomicU64>,
    max_lifetime: Duration,
    capacity: usize,
}

impl NotificationRegistry {
    pub fn new(max_lifetime: Duration, capacity: usize) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_conn_id: Arc::new(AtomicU64::new(1)),
            max_lifetime,
            capacity: capacity.max(1),
        }
    }

    /// Register a connection for `user_id`, replacing any previous one
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let (sender, rx) = mpsc::channel(self.capacity);
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let expires_at = Instant::now() + self.max_lifetime;

        let previous = self.connections.insert(
            user_id.to_string(),
            Connection {
                conn_id,
                sender,
                expires_at,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(
                user_id = %user_id,
                old_conn = previous.conn_id,
                new_conn = conn_id,
                "Replacing live connection"
            );
        }
        tracing::info!(user_id = %user_id, conn_id, "Live connection opened");

        Subscription {
            registry: self.clone(),
            user_id: user_id.to_string(),
            conn_id,
            rx,
            deadline: Box::pin(tokio::time::sleep_until(expires_at)),
            finished: false,
        }
    }

    /// Push a notification to the user's connection, if any
    ///
    /// Returns `false` when the user has no usable connection. A stale
    /// handle found on the way is removed.
    pub fn publish(&self, user_id: &str, notification: Notification) -> bool {
        // copy out what we need so no map guard is held while removing
        let (conn_id, sender, expired) = match self.connections.get(user_id) {
            Some(conn) => (
                conn.conn_id,
                conn.sender.clone(),
                conn.expires_at <= Instant::now(),
            ),
            None => return false,
        };

        if expired {
            tracing::debug!(user_id = %user_id, conn_id, "Live connection expired");
            self.remove_if_current(user_id, conn_id);
            return false;
        }

        match sender.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(user_id = %user_id, conn_id, error = %e, "Dropping stale live connection");
                self.remove_if_current(user_id, conn_id);
                false
            }
        }
    }

    /// Probe the connection with a zero-payload ping
    pub fn is_connected(&self, user_id: &str) -> bool {
        self.publish(user_id, Notification::Ping)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn remove_if_current(&self, user_id: &str, conn_id: u64) {
        if self
            .connections
            .remove_if(user_id, |_, conn| conn.conn_id == conn_id)
            .is_some()
        {
            tracing::info!(user_id = %user_id, conn_id, "Live connection closed");
        }
    }
}

/// Stream of notifications for one connection
///
/// Ends when the ceiling lifetime elapses or the registry drops the sender.
/// Dropping it unregisters the connection unless it was already replaced.
pub struct Subscription {
    registry: NotificationRegistry,
    user_id: String,
    conn_id: u64,
    rx: mpsc::Receiver<Notification>,
    deadline: Pin<Box<Sleep>>,
    finished: bool,
}

impl Subscription {
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    fn finish(&mut self) {
        self.finished = true;
        self.rx.close();
        self.registry.remove_if_current(&self.user_id, self.conn_id);
    }
}

impl Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        if self.deadline.as_mut().poll(cx).is_ready() {
            self.finish();
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(notification)) => Poll::Ready(Some(notification)),
            Poll::Ready(None) => {
                self.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove_if_current(&self.user_id, self.conn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn registry() -> NotificationRegistry {
        NotificationRegistry::new(Duration::from_secs(30 * 60), 4)
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_reaches_subscriber() {
        let registry = registry();
        let mut sub = registry.subscribe("kim");

        assert!(registry.publish("kim", Notification::order_status("hello")));
        assert_eq!(sub.next().await, Some(Notification::order_status("hello")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_without_connection_is_false() {
        let registry = registry();
        assert!(!registry.publish("nobody", Notification::order_status("hi")));
        assert!(!registry.is_connected("nobody"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_unregisters() {
        let registry = registry();
        let sub = registry.subscribe("kim");
        assert_eq!(registry.connection_count(), 1);
        drop(sub);
        assert_eq!(registry.connection_count(), 0);
        assert!(!registry.is_connected("kim"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_stream_does_not_evict_successor() {
        let registry = registry();
        let mut old = registry.subscribe("kim");
        let mut new = registry.subscribe("kim");
        assert_ne!(old.conn_id(), new.conn_id());

        // old sender was dropped on replacement
        assert_eq!(old.next().await, None);
        drop(old);

        assert!(registry.publish("kim", Notification::order_status("for new")));
        assert_eq!(new.next().await, Some(Notification::order_status("for new")));
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_lifetime_ends_stream() {
        let registry = NotificationRegistry::new(Duration::from_secs(60), 4);
        let mut sub = registry.subscribe("kim");
        assert!(registry.is_connected("kim"));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!registry.is_connected("kim"));
        assert_eq!(sub.next().await, None);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buffer_removes_handle() {
        let registry = NotificationRegistry::new(Duration::from_secs(60), 1);
        let _sub = registry.subscribe("kim");

        assert!(registry.publish("kim", Notification::order_status("one")));
        assert!(!registry.publish("kim", Notification::order_status("two")));
        assert_eq!(registry.connection_count(), 0);
        assert!(!registry.is_connected("kim"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_is_delivered_as_notification() {
        let registry = registry();
        let mut sub = registry.subscribe("kim");
        assert!(registry.is_connected("kim"));
        assert_eq!(sub.next().await, Some(Notification::Ping));
    }
}
