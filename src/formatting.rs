// src/formatting.rs

use crate::config::OutputFormat;
use crate::core::Notification;
use serde_json::json;

/// Renders the lines a subscriber writes when it reacts to an event.
pub trait TextFormatter: Send + Sync {
    fn format_update(&self, subscriber: &str, notification: &Notification) -> String;
    fn format_shutdown(&self, subscriber: &str) -> String;
}

/// Human-readable lines.
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format_update(&self, subscriber: &str, notification: &Notification) -> String {
        format!(
            "{} received update: Order {} is now '{}'",
            subscriber, notification.order_id, notification.status
        )
    }

    fn format_shutdown(&self, subscriber: &str) -> String {
        format!("{} shutting down...", subscriber)
    }
}

/// One JSON object per line.
pub struct JsonFormatter;

impl TextFormatter for JsonFormatter {
    fn format_update(&self, subscriber: &str, notification: &Notification) -> String {
        json!({
            "subscriber": subscriber,
            "event": "update",
            "order_id": notification.order_id,
            "status": notification.status,
        })
        .to_string()
    }

    fn format_shutdown(&self, subscriber: &str) -> String {
        json!({
            "subscriber": subscriber,
            "event": "shutdown",
        })
        .to_string()
    }
}

/// Picks the formatter for a configured output format.
pub fn formatter_for(format: &OutputFormat) -> Box<dyn TextFormatter> {
    match format {
        OutputFormat::PlainText => Box::new(PlainTextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}
