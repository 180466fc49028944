//! Core domain types and service traits for OrderWatch
//!
//! This module defines the notification payload that flows from a publisher
//! to its subscribers and the trait contract a subscriber uses to react to it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An order status change, as delivered to a single subscriber.
///
/// A fresh value is built for every delivery and moved into the receiving
/// subscriber, so nothing is shared between publisher and subscriber once
/// it has been handed over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Notification {
    /// Opaque identifier of the order.
    pub order_id: String,
    /// Opaque status value, exactly as it was published.
    pub status: String,
}

impl Notification {
    pub fn new(order_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: status.into(),
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Reacts to the events observed by a subscriber's execution loop.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Called once for every notification the subscriber receives.
    ///
    /// # Arguments
    /// * `subscriber` - The diagnostic name of the receiving subscriber
    /// * `notification` - The received notification
    async fn on_notification(&self, subscriber: &str, notification: &Notification);

    /// Called once, after the subscriber observed its shutdown signal and
    /// before its loop exits.
    async fn on_shutdown(&self, subscriber: &str);
}
