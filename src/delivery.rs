//! Per-subscriber delivery: how a notification travels from the publisher
//! into a subscriber's mailbox, and what happens when the subscriber is slow.

use crate::core::Notification;
use crate::types::{MailboxReceiver, MailboxSender};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;

/// Selects how the publisher hands notifications to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Synchronous hand-off. A delivery completes only once the subscriber
    /// has taken the notification into its receive, so a subscriber that
    /// stops receiving while its task is still alive blocks the publisher,
    /// and every subscriber registered after it, indefinitely.
    #[default]
    Rendezvous,
    /// A mailbox holding up to `capacity` pending notifications. The
    /// publisher never waits on the subscriber beyond what `overflow` allows.
    ///
    /// A `capacity` of 0 is treated as 1, since a mailbox must hold at least
    /// one notification. Configuration loading rejects 0 outright.
    Bounded {
        capacity: usize,
        overflow: OverflowPolicy,
    },
}

/// What a bounded mailbox does when a notification arrives and it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Reject the incoming notification.
    DropNewest,
    /// Evict the oldest pending notification to make room.
    DropOldest,
    /// Wait for room, giving up after the timeout.
    BlockWithTimeout(Duration),
}

/// A successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The subscriber accepted the notification into its receive.
    Accepted,
    /// The notification is waiting in the subscriber's mailbox.
    Queued,
    /// The notification is waiting in the subscriber's mailbox after the
    /// oldest pending one was evicted.
    QueuedEvictingOldest,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber is no longer listening")]
    Disconnected,

    #[error("subscriber mailbox is full")]
    MailboxFull,

    #[error("timed out after {0:?} waiting for room in the subscriber mailbox")]
    Timeout(Duration),
}

/// The result of delivering one notification to one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberOutcome {
    pub subscriber: String,
    pub result: Result<Delivery, DeliveryError>,
}

/// The outcome of a whole fan-out, one entry per registration, in
/// registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcomes: Vec<SubscriberOutcome>,
}

impl DeliveryReport {
    /// Number of registrations the notification reached.
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Registrations the notification did not reach, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&str, DeliveryError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.err().map(|e| (o.subscriber.as_str(), e)))
    }

    /// Returns true if every registration was reached.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// The publisher-facing end of a subscriber's mailbox.
#[derive(Debug, Clone)]
pub(crate) struct Mailbox {
    tx: MailboxSender,
    // Only kept for `DropOldest`, so the publisher can evict from its side.
    evict_rx: Option<MailboxReceiver>,
    mode: DeliveryMode,
}

impl Mailbox {
    /// Creates a mailbox for `mode`, returning the subscriber's receiving end.
    pub(crate) fn new(mode: DeliveryMode) -> (Self, MailboxReceiver) {
        let (tx, rx) = match mode {
            // A slot of one: the real synchronisation point is the ack.
            DeliveryMode::Rendezvous => async_channel::bounded(1),
            DeliveryMode::Bounded { capacity, .. } => async_channel::bounded(capacity.max(1)),
        };
        let evict_rx = match mode {
            DeliveryMode::Bounded {
                overflow: OverflowPolicy::DropOldest,
                ..
            } => Some(rx.clone()),
            _ => None,
        };
        (Self { tx, evict_rx, mode }, rx)
    }

    pub(crate) fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Number of notifications waiting to be received.
    pub(crate) fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Delivers one notification according to the mailbox's mode.
    pub(crate) async fn deliver(&self, notification: Notification) -> Result<Delivery, DeliveryError> {
        match self.mode {
            DeliveryMode::Rendezvous => {
                let (ack_tx, ack_rx) = oneshot::channel();
                self.tx
                    .send((notification, Some(ack_tx)))
                    .await
                    .map_err(|_| DeliveryError::Disconnected)?;
                // An exiting subscriber drains its mailbox, dropping this ack
                // unanswered if the envelope was never received.
                ack_rx.await.map_err(|_| DeliveryError::Disconnected)?;
                Ok(Delivery::Accepted)
            }
            DeliveryMode::Bounded { overflow, .. } => match overflow {
                OverflowPolicy::DropNewest => match self.tx.try_send((notification, None)) {
                    Ok(()) => Ok(Delivery::Queued),
                    Err(async_channel::TrySendError::Full(_)) => Err(DeliveryError::MailboxFull),
                    Err(async_channel::TrySendError::Closed(_)) => Err(DeliveryError::Disconnected),
                },
                OverflowPolicy::DropOldest => self.deliver_evicting(notification),
                OverflowPolicy::BlockWithTimeout(limit) => {
                    match timeout(limit, self.tx.send((notification, None))).await {
                        Ok(Ok(())) => Ok(Delivery::Queued),
                        Ok(Err(_)) => Err(DeliveryError::Disconnected),
                        Err(_) => Err(DeliveryError::Timeout(limit)),
                    }
                }
            },
        }
    }

    fn deliver_evicting(&self, notification: Notification) -> Result<Delivery, DeliveryError> {
        let mut envelope = (notification, None);
        let mut evicted = false;
        loop {
            match self.tx.try_send(envelope) {
                Ok(()) if evicted => return Ok(Delivery::QueuedEvictingOldest),
                Ok(()) => return Ok(Delivery::Queued),
                Err(async_channel::TrySendError::Full(rejected)) => {
                    envelope = rejected;
                    if let Some(rx) = &self.evict_rx {
                        // The subscriber may have drained the slot meanwhile,
                        // in which case there is nothing to evict.
                        evicted |= rx.try_recv().is_ok();
                    } else {
                        return Err(DeliveryError::MailboxFull);
                    }
                }
                Err(async_channel::TrySendError::Closed(_)) => {
                    return Err(DeliveryError::Disconnected)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(capacity: usize, overflow: OverflowPolicy) -> DeliveryMode {
        DeliveryMode::Bounded { capacity, overflow }
    }

    #[tokio::test]
    async fn test_drop_newest_rejects_when_full() {
        let (mailbox, rx) = Mailbox::new(bounded(1, OverflowPolicy::DropNewest));

        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Placed")).await,
            Ok(Delivery::Queued)
        );
        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Shipped")).await,
            Err(DeliveryError::MailboxFull)
        );

        let (kept, ack) = rx.recv().await.unwrap();
        assert_eq!(kept.status, "Placed");
        assert!(ack.is_none());
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_drop_oldest_evicts_head() {
        let (mailbox, rx) = Mailbox::new(bounded(2, OverflowPolicy::DropOldest));

        for status in ["Placed", "Shipped"] {
            assert_eq!(
                mailbox.deliver(Notification::new("ORD1", status)).await,
                Ok(Delivery::Queued)
            );
        }
        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Delivered")).await,
            Ok(Delivery::QueuedEvictingOldest)
        );

        assert_eq!(mailbox.pending(), 2);
        assert_eq!(rx.recv().await.unwrap().0.status, "Shipped");
        assert_eq!(rx.recv().await.unwrap().0.status, "Delivered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_with_timeout_gives_up() {
        let limit = Duration::from_millis(250);
        let (mailbox, _rx) = Mailbox::new(bounded(1, OverflowPolicy::BlockWithTimeout(limit)));

        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Placed")).await,
            Ok(Delivery::Queued)
        );
        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Shipped")).await,
            Err(DeliveryError::Timeout(limit))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_with_timeout_succeeds_when_room_frees_up() {
        let limit = Duration::from_secs(1);
        let (mailbox, rx) = Mailbox::new(bounded(1, OverflowPolicy::BlockWithTimeout(limit)));
        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Placed")).await,
            Ok(Delivery::Queued)
        );

        let blocked = tokio::spawn({
            let mailbox = mailbox.clone();
            async move { mailbox.deliver(Notification::new("ORD1", "Shipped")).await }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!blocked.is_finished());

        assert_eq!(rx.recv().await.unwrap().0.status, "Placed");

        assert_eq!(blocked.await.unwrap(), Ok(Delivery::Queued));
        assert_eq!(rx.recv().await.unwrap().0.status, "Shipped");
    }

    #[tokio::test]
    async fn test_zero_capacity_holds_one_notification() {
        let (mailbox, _rx) = Mailbox::new(bounded(0, OverflowPolicy::DropNewest));

        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Placed")).await,
            Ok(Delivery::Queued)
        );
        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Shipped")).await,
            Err(DeliveryError::MailboxFull)
        );
    }

    #[tokio::test]
    async fn test_rendezvous_reports_disconnected_receiver() {
        let (mailbox, rx) = Mailbox::new(DeliveryMode::Rendezvous);
        drop(rx);

        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Placed")).await,
            Err(DeliveryError::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_rendezvous_completes_on_ack() {
        let (mailbox, rx) = Mailbox::new(DeliveryMode::Rendezvous);
        let receiver = tokio::spawn(async move {
            let (notification, ack) = rx.recv().await.unwrap();
            ack.unwrap().send(()).unwrap();
            notification
        });

        assert_eq!(
            mailbox.deliver(Notification::new("ORD1", "Placed")).await,
            Ok(Delivery::Accepted)
        );
        assert_eq!(receiver.await.unwrap(), Notification::new("ORD1", "Placed"));
    }

    #[test]
    fn test_report_counts() {
        let report = DeliveryReport {
            outcomes: vec![
                SubscriberOutcome {
                    subscriber: "Email".into(),
                    result: Ok(Delivery::Accepted),
                },
                SubscriberOutcome {
                    subscriber: "SMS".into(),
                    result: Err(DeliveryError::Disconnected),
                },
            ],
        };

        assert_eq!(report.delivered(), 1);
        assert!(!report.is_complete());
        assert_eq!(
            report.failures().collect::<Vec<_>>(),
            vec![("SMS", DeliveryError::Disconnected)]
        );
    }
}
