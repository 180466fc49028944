//! Manages the lifecycle of spawned subscriber tasks.
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A centralized owner for spawned tasks.
///
/// Tasks are spawned through the manager so that the driver can await all of
/// them once it has signalled shutdown, and learn which ones panicked.
#[derive(Clone, Debug, Default)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
}

impl TaskManager {
    /// Creates a new `TaskManager`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a new task and adds its handle to the manager.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(task_name = %name, "Spawning task");
        let handle = tokio::spawn(future);
        self.lock_handles().push((name, handle));
    }

    /// Number of tasks spawned and not yet joined.
    pub fn len(&self) -> usize {
        self.lock_handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for all managed tasks to complete and returns the names of the
    /// ones that panicked.
    ///
    /// This does not signal anything: tasks must already have been asked to
    /// stop, otherwise this waits for as long as they keep running.
    pub async fn join(&self) -> Vec<String> {
        let handles = self.lock_handles().drain(..).collect::<Vec<_>>();
        info!(
            "TaskManager waiting for {} tasks to complete...",
            handles.len()
        );

        let (task_names, handles): (Vec<String>, Vec<JoinHandle<()>>) = handles.into_iter().unzip();
        debug!(tasks = ?task_names, "Awaiting all tasks.");

        let results = join_all(handles).await;

        let mut panicked = Vec::new();
        for (task_name, result) in task_names.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    debug!(task_name = %task_name, "Task shut down gracefully.");
                }
                Err(e) => {
                    error!(task_name = %task_name, error = %e, "Task panicked during shutdown.");
                    panicked.push(task_name);
                }
            }
        }

        if !panicked.is_empty() {
            error!("{} tasks panicked during shutdown: {:?}", panicked.len(), panicked);
        } else {
            info!("All tasks shut down gracefully.");
        }
        panicked
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        // A poisoned lock only means another thread panicked mid-push; the
        // handle list itself is still usable.
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
