//! Reverse-ordered cleanup actions registered while a session comes up.

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

type Cleanup = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A stack of cleanup actions run last-in, first-out, exactly once.
///
/// Each step of bringing a session up registers the action that undoes
/// it, so a failure partway through only undoes what was done. If the
/// stack is dropped without [`run`](Self::run) having been called, the
/// remaining actions are spawned onto the current runtime.
#[derive(Default)]
pub struct Teardown {
    actions: Vec<(&'static str, Cleanup)>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` to run before every action registered earlier.
    pub fn push<F, Fut>(&mut self, name: &'static str, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.actions
            .push((name, Box::new(move || action().boxed())));
    }

    /// Runs every registered action, newest first. Later calls do nothing.
    pub async fn run(&mut self) {
        if self.is_empty() {
            return;
        }
        tracing::debug!(actions = self.len(), "running teardown");
        for (name, action) in drain_reversed(&mut self.actions) {
            tracing::debug!(action = name, "running cleanup");
            action().await;
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        let actions = drain_reversed(&mut self.actions);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for (name, action) in actions {
                        tracing::debug!(action = name, "running cleanup after drop");
                        action().await;
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    pending = actions.len(),
                    "teardown dropped outside a runtime, cleanup skipped"
                );
            }
        }
    }
}

fn drain_reversed(
    actions: &mut Vec<(&'static str, Cleanup)>,
) -> Vec<(&'static str, Cleanup)> {
    actions.drain(..).rev().collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, Teardown) {
        (Arc::new(Mutex::new(Vec::new())), Teardown::new())
    }

    fn record(
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let log = Arc::clone(log);
        move || {
            log.lock().unwrap().push(name);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_runs_in_reverse_order() {
        let (log, mut teardown) = recorder();
        teardown.push("process", record(&log, "process"));
        teardown.push("quit", record(&log, "quit"));
        teardown.push("transport", record(&log, "transport"));

        teardown.run().await;
        assert_eq!(*log.lock().unwrap(), vec!["transport", "quit", "process"]);
    }

    #[tokio::test]
    async fn test_runs_exactly_once() {
        let (log, mut teardown) = recorder();
        teardown.push("a", record(&log, "a"));

        teardown.run().await;
        assert!(teardown.is_empty());
        teardown.run().await;
        drop(teardown);
        tokio::task::yield_now().await;

        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_drop_spawns_remaining_actions() {
        let (log, mut teardown) = recorder();
        teardown.push("a", record(&log, "a"));
        teardown.push("b", record(&log, "b"));
        assert_eq!(teardown.len(), 2);

        drop(teardown);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
    }
}
