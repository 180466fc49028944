#![allow(dead_code)]
pub mod gated_handler;

use orderwatch::notification::test_utils::RecordingHandler;
use orderwatch::notification::{Subscriber, SubscriberHandle};
use orderwatch::task_manager::TaskManager;
use orderwatch::DeliveryMode;
use std::sync::Arc;

/// Spawns one rendezvous subscriber per name, all recording into `recorder`.
pub async fn spawn_recorded(
    names: &[&str],
    recorder: &Arc<RecordingHandler>,
    tasks: &TaskManager,
) -> Vec<SubscriberHandle> {
    let mut handles = Vec::with_capacity(names.len());
    for name in names {
        handles.push(Subscriber::spawn(*name, DeliveryMode::Rendezvous, recorder.clone(), tasks).await);
    }
    handles
}

/// Waits until the subscriber behind `handle` has exited its loop.
pub async fn wait_until_stopped(handle: &SubscriberHandle, limit: std::time::Duration) {
    tokio::time::timeout(limit, async {
        while handle.is_listening() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("Timed out waiting for subscriber to stop");
}
