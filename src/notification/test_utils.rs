//! Test doubles for subscriber handlers.

use crate::core::{Notification, NotificationHandler};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Something a subscriber observed, in the order it observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Received {
        subscriber: String,
        notification: Notification,
    },
    ShutDown {
        subscriber: String,
    },
}

/// A handler that records every event it sees. One recorder may be shared by
/// several subscribers, which makes cross-subscriber ordering observable.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
    notifier: Notify,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Notifications received by `subscriber`, in arrival order.
    pub fn received_by(&self, subscriber: &str) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Received {
                    subscriber: name,
                    notification,
                } if name == subscriber => Some(notification),
                _ => None,
            })
            .collect()
    }

    /// All received notifications as `(subscriber, notification)` pairs.
    pub fn received(&self) -> Vec<(String, Notification)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Received {
                    subscriber,
                    notification,
                } => Some((subscriber, notification)),
                Event::ShutDown { .. } => None,
            })
            .collect()
    }

    /// Waits until at least `count` events have been recorded.
    ///
    /// # Panics
    /// Panics if `limit` elapses first.
    pub async fn wait_for(&self, count: usize, limit: Duration) {
        let wait = async {
            loop {
                let notified = self.notifier.notified();
                if self.events.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(limit, wait)
            .await
            .expect("Timed out waiting for subscriber events");
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
        self.notifier.notify_waiters();
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    async fn on_notification(&self, subscriber: &str, notification: &Notification) {
        self.record(Event::Received {
            subscriber: subscriber.to_string(),
            notification: notification.clone(),
        });
    }

    async fn on_shutdown(&self, subscriber: &str) {
        self.record(Event::ShutDown {
            subscriber: subscriber.to_string(),
        });
    }
}
