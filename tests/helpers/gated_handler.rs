use async_trait::async_trait;
use orderwatch::core::{Notification, NotificationHandler};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// A handler that holds the subscriber inside `on_notification` until a
/// permit is released, simulating a slow consumer.
pub struct GatedHandler {
    gate: Semaphore,
    pub handled: AtomicUsize,
}

impl GatedHandler {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            handled: AtomicUsize::new(0),
        }
    }

    /// Lets `n` more notifications through.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl NotificationHandler for GatedHandler {
    async fn on_notification(&self, _subscriber: &str, _notification: &Notification) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.handled.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_shutdown(&self, _subscriber: &str) {}
}
