//! A handler that writes what a subscriber receives to the console.

use crate::core::{Notification, NotificationHandler};
use crate::formatting::TextFormatter;
use async_trait::async_trait;
use tracing::debug;

/// Prints one line per received notification and one on shutdown.
pub struct ConsoleHandler {
    formatter: Box<dyn TextFormatter>,
}

impl ConsoleHandler {
    pub fn new(formatter: Box<dyn TextFormatter>) -> Self {
        Self { formatter }
    }
}

#[async_trait]
impl NotificationHandler for ConsoleHandler {
    async fn on_notification(&self, subscriber: &str, notification: &Notification) {
        debug!(subscriber, ?notification, "Writing notification to console");
        println!("{}", self.formatter.format_update(subscriber, notification));
    }

    async fn on_shutdown(&self, subscriber: &str) {
        println!("{}", self.formatter.format_shutdown(subscriber));
    }
}
