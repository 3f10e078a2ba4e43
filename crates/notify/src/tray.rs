//! Active toast bookkeeping for whatever renders notifications.

use chrono::{DateTime, Utc};

use assist_core::NotificationId;

use crate::channel::Subscription;
use crate::notification::Notification;

/// Keeps the notifications that are still on screen.
#[derive(Debug)]
pub struct ToastTray {
    subscription: Subscription,
    active: Vec<Notification>,
}

impl ToastTray {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            active: Vec::new(),
        }
    }

    /// Pull newly published notifications and drop the expired ones.
    pub fn pump(&mut self, now: DateTime<Utc>) -> &[Notification] {
        self.active.extend(self.subscription.drain());
        self.active.retain(|n| !n.is_expired(now));
        &self.active
    }

    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }
}
