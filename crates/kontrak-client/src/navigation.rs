//! Navigation requests issued by the client.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
struct NavigatorInner {
    history: Mutex<Vec<String>>,
    tx: watch::Sender<Option<String>>,
}

/// Records where the client asked to go. The host application performs the
/// actual routing by observing [`Navigator::subscribe`].
#[derive(Debug, Clone)]
pub struct Navigator {
    inner: Arc<NavigatorInner>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(NavigatorInner {
                history: Mutex::new(Vec::new()),
                tx,
            }),
        }
    }

    pub fn navigate(&self, path: impl Into<String>) {
        let path = path.into();
        debug!(path = %path, "navigate");
        self.inner.history.lock().push(path.clone());
        self.inner.tx.send_replace(Some(path));
    }

    /// Last requested path.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.inner.history.lock().last().cloned()
    }

    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.inner.history.lock().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_history_in_order() {
        let navigator = Navigator::new();
        let mut rx = navigator.subscribe();
        assert!(navigator.current().is_none());

        navigator.navigate("/kontrak");
        navigator.navigate("/logout");

        assert_eq!(navigator.current().as_deref(), Some("/logout"));
        assert_eq!(navigator.history(), vec!["/kontrak", "/logout"]);
        assert_eq!(rx.borrow_and_update().as_deref(), Some("/logout"));
    }
}
