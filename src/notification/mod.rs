//! Channel-based fan-out of order status changes.
//!
//! A [`Publisher`] pushes every status change into the mailbox of each
//! registered subscriber. Every subscriber runs as its own task and shuts
//! down when signalled on its control channel.
pub mod console;
pub mod publisher;
pub mod subscriber;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use console::ConsoleHandler;
pub use publisher::Publisher;
pub use subscriber::{Subscriber, SubscriberHandle};
