use std::sync::Arc;
use std::time::Duration;

use assist_core::NotificationId;

use crate::channel::NotificationChannel;
use crate::notification::{DEFAULT_DURATION, Notification, Severity};

/// Fire-and-forget producer handle.
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn NotificationChannel>,
    default_duration: Duration,
}

impl Notifier {
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            channel,
            default_duration: DEFAULT_DURATION,
        }
    }

    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    /// Publish a toast. Delivery problems are logged, never returned.
    pub fn show(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Option<Duration>,
    ) -> NotificationId {
        let notification = Notification::new(
            message,
            severity,
            duration.unwrap_or(self.default_duration),
        );
        let id = notification.id;

        tracing::debug!(%severity, message = %notification.message, "notification");
        if let Err(err) = self.channel.publish(notification) {
            tracing::warn!(%err, "failed to publish notification");
        }
        id
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Info, None)
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Success, None)
    }

    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Warning, None)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Error, None)
    }
}

impl core::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Notifier")
            .field("default_duration", &self.default_duration)
            .finish_non_exhaustive()
    }
}
