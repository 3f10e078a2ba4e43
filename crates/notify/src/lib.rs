//! `assist-notify`: user-visible notifications (toasts).
//!
//! Producers call [`Notifier::show`] and forget about it. Whatever renders
//! toasts subscribes to the [`NotificationChannel`] and typically keeps a
//! [`ToastTray`] of the ones that have not expired yet.

pub mod channel;
pub mod in_memory;
pub mod notification;
pub mod notifier;
pub mod tray;

pub use channel::{ChannelError, NotificationChannel, Subscription};
pub use in_memory::InMemoryNotificationChannel;
pub use notification::{DEFAULT_DURATION, Notification, Severity};
pub use notifier::Notifier;
pub use tray::ToastTray;
