//! Common type aliases used throughout the application.

use crate::core::Notification;
use tokio::sync::{oneshot, watch};

/// Acknowledges that a subscriber has taken a notification into its receive.
pub type AckSender = oneshot::Sender<()>;

/// A notification travelling through a subscriber's mailbox, with the
/// acknowledgement the publisher waits on for a synchronous hand-off.
pub type Envelope = (Notification, Option<AckSender>);

pub type MailboxSender = async_channel::Sender<Envelope>;
pub type MailboxReceiver = async_channel::Receiver<Envelope>;

/// The control channel of a subscriber. Flipping it to `true` asks the
/// subscriber to shut down.
pub type ControlSender = watch::Sender<bool>;
pub type ControlReceiver = watch::Receiver<bool>;
