//! The publisher side of the channel-based notification pipeline.

use crate::core::Notification;
use crate::delivery::{Delivery, DeliveryReport, SubscriberOutcome};
use crate::notification::subscriber::SubscriberHandle;
use tracing::{debug, info, instrument, warn};

/// Holds the current status of one order and fans every change out to the
/// registered subscribers, in registration order.
///
/// All mutation goes through `&mut self`. A publisher shared between tasks
/// has to be wrapped in a lock by its owner.
#[derive(Debug)]
pub struct Publisher {
    order_id: String,
    status: String,
    subscribers: Vec<SubscriberHandle>,
}

impl Publisher {
    /// Creates a publisher for `order_id` with an empty status.
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: String::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Appends a subscriber to the notification sequence.
    ///
    /// Registering the same subscriber twice makes it receive every
    /// notification twice.
    pub fn register(&mut self, subscriber: SubscriberHandle) {
        debug!(subscriber = %subscriber.name(), "Registering subscriber");
        self.subscribers.push(subscriber);
    }

    /// Removes the first registration of `subscriber`.
    ///
    /// Returns false if it was not registered.
    pub fn deregister(&mut self, subscriber: &SubscriberHandle) -> bool {
        match self.subscribers.iter().position(|s| s == subscriber) {
            Some(index) => {
                self.subscribers.remove(index);
                debug!(subscriber = %subscriber.name(), "Deregistered subscriber");
                true
            }
            None => false,
        }
    }

    /// Sets the status and notifies every subscriber, even if the status did
    /// not change.
    pub async fn update_status(&mut self, status: impl Into<String>) -> DeliveryReport {
        self.status = status.into();
        info!(order_id = %self.order_id, "Order status updated to: {}", self.status);
        self.notify_all().await
    }

    /// Delivers the current status to every subscriber.
    ///
    /// Deliveries happen one after another: a subscriber is only contacted
    /// once the delivery to the one registered before it has completed. With
    /// `Rendezvous` mailboxes this means a subscriber that is alive but not
    /// receiving stalls this call indefinitely.
    #[instrument(skip(self), fields(order_id = %self.order_id, status = %self.status))]
    pub async fn notify_all(&self) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for subscriber in &self.subscribers {
            let notification = Notification::new(self.order_id.as_str(), self.status.as_str());
            let result = subscriber.deliver(notification).await;
            match &result {
                Ok(Delivery::QueuedEvictingOldest) => {
                    metrics::counter!("notifications_delivered").increment(1);
                    metrics::counter!("notifications_evicted").increment(1);
                    debug!(subscriber = %subscriber.name(), "Evicted oldest pending notification");
                }
                Ok(_) => {
                    metrics::counter!("notifications_delivered").increment(1);
                }
                Err(e) => {
                    metrics::counter!("notifications_failed").increment(1);
                    warn!(subscriber = %subscriber.name(), error = %e, "Failed to notify subscriber");
                }
            }
            report.outcomes.push(SubscriberOutcome {
                subscriber: subscriber.name().to_string(),
                result,
            });
        }
        report
    }

    /// Signals shutdown to every registered subscriber and returns how many
    /// were still listening.
    ///
    /// Subscribers stay registered; deregister them before the next update.
    pub fn shutdown_all(&self) -> usize {
        self.subscribers.iter().filter(|s| s.shutdown()).count()
    }
}
