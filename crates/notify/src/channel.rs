//! Notification publishing/subscription abstraction.
//!
//! Broadcast semantics: every subscription receives its own copy of every
//! notification published after it subscribed. Delivery is best-effort;
//! producers never block on consumers.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::notification::Notification;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Publish failed due to internal lock poisoning.
    #[error("notification channel lock poisoned")]
    Poisoned,
}

/// A subscription to the notification stream.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<Notification>,
}

impl Subscription {
    pub fn new(receiver: Receiver<Notification>) -> Self {
        Self { receiver }
    }

    /// Try to receive a notification without blocking.
    pub fn try_recv(&self) -> Result<Notification, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a notification.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Notification, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything queued right now.
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }
}

pub trait NotificationChannel: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), ChannelError>;

    fn subscribe(&self) -> Subscription;
}

impl<C> NotificationChannel for Arc<C>
where
    C: NotificationChannel + ?Sized,
{
    fn publish(&self, notification: Notification) -> Result<(), ChannelError> {
        (**self).publish(notification)
    }

    fn subscribe(&self) -> Subscription {
        (**self).subscribe()
    }
}
