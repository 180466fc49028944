//! Callback-based observers.
//!
//! The synchronous counterpart of [`crate::notification`]: observers are
//! trait objects called in place by the subject, in registration order.

use std::sync::Arc;
use tracing::info;

/// Receives order status changes.
pub trait Observer: Send + Sync {
    fn update(&self, order_id: &str, status: &str);
}

/// Manages a list of observers and notifies them.
pub trait Subject {
    fn register(&mut self, observer: Arc<dyn Observer>);
    /// Removes the first registration of `observer`. Returns false if it
    /// was not registered.
    fn deregister(&mut self, observer: &Arc<dyn Observer>) -> bool;
    fn notify_all(&self);
}

/// Holds the status of one order and notifies observers when it changes.
pub struct OrderService {
    order_id: String,
    status: String,
    observers: Vec<Arc<dyn Observer>>,
}

impl OrderService {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: String::new(),
            observers: Vec::new(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Sets a new status and notifies every observer, even if it is unchanged.
    pub fn update_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        info!(order_id = %self.order_id, "Order status updated to: {}", self.status);
        self.notify_all();
    }
}

impl Subject for OrderService {
    fn register(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    fn deregister(&mut self, observer: &Arc<dyn Observer>) -> bool {
        // Compare data pointers only; vtable pointers for the same type may differ
        // between codegen units.
        let target = Arc::as_ptr(observer) as *const ();
        match self
            .observers
            .iter()
            .position(|o| Arc::as_ptr(o) as *const () == target)
        {
            Some(index) => {
                self.observers.remove(index);
                true
            }
            None => false,
        }
    }

    fn notify_all(&self) {
        for observer in &self.observers {
            observer.update(&self.order_id, &self.status);
        }
    }
}

/// Simulates sending an email.
pub struct EmailNotifier {
    email: String,
}

impl EmailNotifier {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    pub fn render(&self, order_id: &str, status: &str) -> String {
        format!("📧 Email to {}: Order {} is now '{}'", self.email, order_id, status)
    }
}

impl Observer for EmailNotifier {
    fn update(&self, order_id: &str, status: &str) {
        println!("{}", self.render(order_id, status));
    }
}

/// Simulates sending an SMS.
pub struct SmsNotifier {
    phone: String,
}

impl SmsNotifier {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
        }
    }

    pub fn render(&self, order_id: &str, status: &str) -> String {
        format!("📱 SMS to {}: Order {} is now '{}'", self.phone, order_id, status)
    }
}

impl Observer for SmsNotifier {
    fn update(&self, order_id: &str, status: &str) {
        println!("{}", self.render(order_id, status));
    }
}
