//! In-process notification channel.

use std::sync::{Mutex, mpsc};

use crate::channel::{ChannelError, NotificationChannel, Subscription};
use crate::notification::Notification;

/// In-memory fan-out channel.
///
/// - No IO / no async
/// - Dead subscribers are dropped on the next publish
#[derive(Debug, Default)]
pub struct InMemoryNotificationChannel {
    subscribers: Mutex<Vec<mpsc::Sender<Notification>>>,
}

impl InMemoryNotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl NotificationChannel for InMemoryNotificationChannel {
    fn publish(&self, notification: Notification) -> Result<(), ChannelError> {
        let mut subs = self.subscribers.lock().map_err(|_| ChannelError::Poisoned)?;
        subs.retain(|tx| tx.send(notification.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just stays silent.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}
