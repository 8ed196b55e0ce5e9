//! In-process fan-out of stored notifications to connected clients.
//!
//! ```text
//! NotificationService::notify
//!       │ (after the row is stored)
//!       ▼
//! NotificationHub ── broadcast::Sender<NotificationView>
//!       │
//!       ▼
//! Subscription (one per SSE connection, filtered by recipient)
//! ```

use std::sync::Mutex;

use futures::Stream;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::domain::notification::{NotificationView, Recipient};
use crate::domain::ports::NotificationPublisher;

const BROADCAST_CAPACITY: usize = 256;

pub struct NotificationHub {
    tx: broadcast::Sender<NotificationView>,
    /// `Some` while the hub is running.
    running: Mutex<Option<CancellationToken>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    /// Creates a stopped hub. Call [`NotificationHub::start`] before serving.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            running: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_none() {
            *running = Some(CancellationToken::new());
            log::info!("Notification hub started");
        }
    }

    /// Ends every open subscription and drops further publishes.
    pub fn stop(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = running.take() {
            token.cancel();
            log::info!("Notification hub stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.current_token().is_some()
    }

    /// Returns `None` when the hub is stopped.
    pub fn subscribe(&self, recipient: Recipient) -> Option<Subscription> {
        let shutdown = self.current_token()?;
        Some(Subscription {
            rx: self.tx.subscribe(),
            recipient,
            shutdown,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn current_token(&self) -> Option<CancellationToken> {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl NotificationPublisher for NotificationHub {
    fn publish(&self, notification: &NotificationView) {
        if !self.is_running() {
            return;
        }
        // No subscribers is not an error.
        let _ = self.tx.send(notification.clone());
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<NotificationView>,
    recipient: Recipient,
    shutdown: CancellationToken,
}

impl Subscription {
    /// Next notification for this subscriber, or `None` once the hub stops.
    pub async fn next(&mut self) -> Option<NotificationView> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                msg = self.rx.recv() => match msg {
                    Ok(n) if n.recipient == self.recipient => return Some(n),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Notification subscriber lagged, skipped {skipped} events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = NotificationView> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|n| (n, sub))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::domain::notification::NotificationMetadata;

    fn notification(recipient: Recipient, title: &str) -> NotificationView {
        NotificationView {
            id: Uuid::new_v4(),
            recipient,
            title: title.to_string(),
            message: String::new(),
            metadata: NotificationMetadata::Opaque(json!({})),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_only_see_their_own_notifications() {
        let hub = NotificationHub::new();
        hub.start();
        let alice = Uuid::new_v4();
        let mut sub = hub.subscribe(Recipient::Customer(alice)).expect("running");

        hub.publish(&notification(Recipient::Customer(Uuid::new_v4()), "someone else"));
        hub.publish(&notification(Recipient::Staff, "staff only"));
        hub.publish(&notification(Recipient::Customer(alice), "yours"));

        let got = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .expect("should not time out")
            .expect("hub is running");
        assert_eq!(got.title, "yours");
    }

    #[tokio::test]
    async fn stop_ends_open_subscriptions() {
        let hub = NotificationHub::new();
        hub.start();
        let mut sub = hub.subscribe(Recipient::Staff).expect("running");

        hub.stop();

        let got = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .expect("should not time out");
        assert!(got.is_none());
        assert!(!hub.is_running());
    }

    #[test]
    fn stopped_hub_refuses_subscribers() {
        let hub = NotificationHub::new();
        assert!(hub.subscribe(Recipient::Staff).is_none());

        hub.start();
        hub.stop();
        assert!(hub.subscribe(Recipient::Staff).is_none());
        // publishing while stopped is a no-op
        hub.publish(&notification(Recipient::Staff, "dropped"));
    }

    #[test]
    fn hub_can_be_restarted() {
        let hub = NotificationHub::new();
        hub.start();
        hub.stop();
        hub.start();
        assert!(hub.subscribe(Recipient::Staff).is_some());
        assert_eq!(hub.subscriber_count(), 0);
    }
}
