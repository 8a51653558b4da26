//! User-visible transient notifications.
//!
//! Failed remote operations are reported to the user through a [`Notifier`].
//! UI surfaces either poll a [`NotificationLog`] or install their own sink.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    #[must_use]
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Records notifications in memory until drained.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the pending notifications, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Take the pending notifications, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(notification);
        }
    }
}

/// Emits notifications as `info` tracing events.
///
/// The failure behind an error notification has already been logged by the
/// store at `warn`, so notifications stay below that level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            id = %notification.id,
            level = ?notification.level,
            "{}",
            notification.message
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::Level;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::{Context, Layered, SubscriberExt};

    use super::*;

    /// Records the level of every event it sees.
    #[derive(Clone, Default)]
    pub(crate) struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

    impl LevelRecorder {
        /// Events at `warn` or `error`.
        pub(crate) fn alerts(&self) -> usize {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|l| matches!(**l, Level::WARN | Level::ERROR))
                .count()
        }

        pub(crate) fn subscriber(&self) -> Layered<Self, Registry> {
            tracing_subscriber::registry().with(self.clone())
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LevelRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    #[test]
    fn test_tracing_notifier_logs_errors_below_warn() {
        let recorder = LevelRecorder::default();
        tracing::subscriber::with_default(recorder.subscriber(), || {
            TracingNotifier.notify(Notification::error("Could not add to cart"));
        });
        assert_eq!(*recorder.0.lock().unwrap(), vec![Level::INFO]);
        assert_eq!(recorder.alerts(), 0);
    }

    #[test]
    fn test_log_records_and_drains() {
        let log = NotificationLog::new();
        assert!(log.is_empty());

        log.notify(Notification::error("Could not add to cart"));
        log.notify(Notification::info("Cart synced"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot()[0].level, NotificationLevel::Error);

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].message, "Cart synced");
        assert!(log.is_empty());
    }
}
