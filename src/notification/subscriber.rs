//! Channel-based subscribers.
//!
//! Each subscriber runs as its own task, draining a dedicated mailbox and
//! watching a dedicated control channel. The publisher only ever sees the
//! [`SubscriberHandle`].

use crate::core::{Notification, NotificationHandler};
use crate::delivery::{Delivery, DeliveryError, DeliveryMode, Mailbox};
use crate::task_manager::TaskManager;
use crate::types::{ControlReceiver, ControlSender, MailboxReceiver};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, instrument, warn};

/// The registration record of a subscriber: its name plus the sending ends
/// of its mailbox and control channel.
///
/// Clones refer to the same subscriber and compare equal.
#[derive(Clone)]
pub struct SubscriberHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: String,
    mailbox: Mailbox,
    control: ControlSender,
}

impl SubscriberHandle {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.inner.mailbox.mode()
    }

    /// Returns true while the subscriber's loop has not exited.
    pub fn is_listening(&self) -> bool {
        !self.inner.control.is_closed()
    }

    /// Number of notifications sitting in the mailbox, not yet received.
    pub fn pending(&self) -> usize {
        self.inner.mailbox.pending()
    }

    /// Signals the subscriber to shut down.
    ///
    /// Returns false if the subscriber had already exited.
    pub fn shutdown(&self) -> bool {
        debug!(subscriber = %self.inner.name, "Sending shutdown signal");
        self.inner.control.send(true).is_ok()
    }

    pub(crate) async fn deliver(&self, notification: Notification) -> Result<Delivery, DeliveryError> {
        if !self.is_listening() {
            return Err(DeliveryError::Disconnected);
        }
        self.inner.mailbox.deliver(notification).await
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SubscriberHandle {}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("name", &self.inner.name)
            .field("mode", &self.inner.mailbox.mode())
            .field("listening", &self.is_listening())
            .finish()
    }
}

/// The receiving side of a subscriber, consumed by its execution loop.
pub struct Subscriber {
    name: String,
    inbox: MailboxReceiver,
    control: ControlReceiver,
    handler: Arc<dyn NotificationHandler>,
}

impl Subscriber {
    /// Creates a subscriber and its handle without starting its loop.
    ///
    /// Until [`Subscriber::listen`] is polled, deliveries to the handle in
    /// `Rendezvous` mode will not complete.
    pub fn new(
        name: impl Into<String>,
        mode: DeliveryMode,
        handler: Arc<dyn NotificationHandler>,
    ) -> (Self, SubscriberHandle) {
        let name = name.into();
        let (mailbox, inbox) = Mailbox::new(mode);
        let (control_tx, control_rx) = watch::channel(false);
        let handle = SubscriberHandle {
            inner: Arc::new(HandleInner {
                name: name.clone(),
                mailbox,
                control: control_tx,
            }),
        };
        let subscriber = Self {
            name,
            inbox,
            control: control_rx,
            handler,
        };
        (subscriber, handle)
    }

    /// Spawns a subscriber on `tasks` and returns its handle once the task
    /// has started running.
    pub async fn spawn(
        name: impl Into<String>,
        mode: DeliveryMode,
        handler: Arc<dyn NotificationHandler>,
        tasks: &TaskManager,
    ) -> SubscriberHandle {
        let (subscriber, handle) = Self::new(name, mode, handler);
        let (ready_tx, ready_rx) = oneshot::channel();
        tasks.spawn(handle.name(), async move {
            let _ = ready_tx.send(());
            subscriber.listen().await;
        });
        if ready_rx.await.is_err() {
            warn!(subscriber = %handle.name(), "Subscriber task exited before signalling readiness");
        }
        handle
    }

    /// Runs the subscriber loop until a shutdown signal is observed.
    ///
    /// The loop also stops if every handle has been dropped, since nothing
    /// can reach it anymore.
    #[instrument(skip_all, fields(subscriber = %self.name))]
    pub async fn listen(self) {
        let Subscriber {
            name,
            inbox,
            mut control,
            handler,
        } = self;
        info!("Subscriber listening.");

        loop {
            tokio::select! {
                received = inbox.recv() => match received {
                    Ok((notification, ack)) => {
                        if let Some(ack) = ack {
                            let _ = ack.send(());
                        }
                        debug!(order_id = %notification.order_id, status = %notification.status, "Notification received");
                        handler.on_notification(&name, &notification).await;
                    }
                    Err(_) => {
                        debug!("Mailbox closed. Subscriber stopping.");
                        break;
                    }
                },
                changed = control.changed() => {
                    if changed.is_ok() && !*control.borrow_and_update() {
                        continue;
                    }
                    handler.on_shutdown(&name).await;
                    info!("Subscriber shut down.");
                    break;
                }
            }
        }

        // Envelopes still queued would otherwise keep their acks alive and
        // leave a rendezvous delivery waiting forever.
        inbox.close();
        let mut stranded = 0usize;
        while let Ok((_, ack)) = inbox.try_recv() {
            drop(ack);
            stranded += 1;
        }
        if stranded > 0 {
            debug!(stranded, "Dropped undelivered notifications on exit.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::test_utils::{Event, RecordingHandler};
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_subscriber_handles_then_shuts_down() {
        let recorder = Arc::new(RecordingHandler::new());
        let tasks = TaskManager::new();
        let handle = Subscriber::spawn("Email", DeliveryMode::Rendezvous, recorder.clone(), &tasks).await;

        assert_eq!(
            handle.deliver(Notification::new("ORD1", "Placed")).await,
            Ok(Delivery::Accepted)
        );
        assert!(handle.shutdown());
        timeout(Duration::from_secs(1), tasks.join()).await.unwrap();

        recorder.wait_for(2, Duration::from_secs(1)).await;
        assert_eq!(
            recorder.events(),
            vec![
                Event::Received {
                    subscriber: "Email".into(),
                    notification: Notification::new("ORD1", "Placed"),
                },
                Event::ShutDown {
                    subscriber: "Email".into()
                },
            ]
        );
        assert!(!handle.is_listening());
    }

    #[tokio::test]
    async fn test_delivery_after_exit_is_disconnected() {
        let recorder = Arc::new(RecordingHandler::new());
        let tasks = TaskManager::new();
        let handle = Subscriber::spawn("SMS", DeliveryMode::Rendezvous, recorder.clone(), &tasks).await;

        handle.shutdown();
        tasks.join().await;

        assert_eq!(
            handle.deliver(Notification::new("ORD1", "Shipped")).await,
            Err(DeliveryError::Disconnected)
        );
        assert!(!handle.shutdown());
        assert_eq!(recorder.received().len(), 0);
    }

    #[tokio::test]
    async fn test_exit_releases_queued_rendezvous_delivery() {
        let recorder = Arc::new(RecordingHandler::new());
        let (subscriber, handle) = Subscriber::new("A", DeliveryMode::Rendezvous, recorder.clone());

        // The envelope sits in the mailbox while the loop is not running yet.
        let delivery = tokio::spawn({
            let handle = handle.clone();
            async move { handle.deliver(Notification::new("ORD1", "Shipped")).await }
        });
        while handle.pending() == 0 {
            tokio::task::yield_now().await;
        }
        handle.shutdown();
        // Both branches are ready; whichever wins, the delivery must finish.
        subscriber.listen().await;

        let result = timeout(Duration::from_secs(1), delivery).await.unwrap().unwrap();
        assert!(matches!(
            result,
            Ok(Delivery::Accepted) | Err(DeliveryError::Disconnected)
        ));
        assert!(!handle.is_listening());
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_clones_compare_equal() {
        let recorder = Arc::new(RecordingHandler::new());
        let (_a, first) = Subscriber::new("A", DeliveryMode::Rendezvous, recorder.clone());
        let (_b, second) = Subscriber::new("A", DeliveryMode::Rendezvous, recorder);

        assert_eq!(first, first.clone());
        assert_ne!(first, second);
    }
}
