/// OrderWatch - order status fan-out with the observer pattern
///
/// This library provides a channel-based publisher whose subscribers run as
/// independent tasks, and a callback-based subject/observer pair.
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod delivery;
pub mod formatting;
pub mod notification;
pub mod observer;
pub mod task_manager;
pub mod types;

// Re-export core types for convenience
pub use crate::core::*;
pub use delivery::{Delivery, DeliveryError, DeliveryMode, DeliveryReport, OverflowPolicy};
