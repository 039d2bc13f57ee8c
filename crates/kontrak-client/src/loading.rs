//! Reentrant global loading indicator with a debounced hide.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Observable indicator state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingState {
    /// Whether the indicator is shown.
    pub visible: bool,
    /// Last non-empty message passed to `start`.
    pub message: String,
    /// Outstanding `start` calls.
    pub pending: usize,
}

#[derive(Debug, Default)]
struct Counter {
    state: LoadingState,
    generation: u64,
    hide_timer: Option<JoinHandle<()>>,
}

impl Counter {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.hide_timer.take() {
            timer.abort();
        }
    }

    fn hide(&mut self) {
        self.state.visible = false;
        self.state.message.clear();
    }
}

#[derive(Debug)]
struct LoadingInner {
    hide_delay: Duration,
    counter: Mutex<Counter>,
    tx: watch::Sender<LoadingState>,
}

impl LoadingInner {
    fn publish(&self, counter: &Counter) {
        self.tx.send_replace(counter.state.clone());
    }
}

/// Process-wide loading counter.
///
/// `visible` is true whenever at least one `start` is outstanding. Once the
/// count drops to zero the indicator stays up for the hide delay; a `start`
/// within that window keeps it visible without flicker.
#[derive(Debug, Clone)]
pub struct LoadingIndicator {
    inner: Arc<LoadingInner>,
}

impl LoadingIndicator {
    #[must_use]
    pub fn new(hide_delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(LoadingState::default());
        Self {
            inner: Arc::new(LoadingInner {
                hide_delay,
                counter: Mutex::new(Counter::default()),
                tx,
            }),
        }
    }

    /// Register an outstanding operation.
    pub fn start(&self, message: Option<&str>) {
        let mut counter = self.inner.counter.lock();
        counter.cancel_timer();
        counter.generation += 1;
        counter.state.pending += 1;
        counter.state.visible = true;
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            counter.state.message = message.to_string();
        }
        self.inner.publish(&counter);
    }

    /// Release an outstanding operation. Extra calls are ignored.
    pub fn stop(&self) {
        let mut counter = self.inner.counter.lock();
        counter.state.pending = counter.state.pending.saturating_sub(1);
        counter.generation += 1;
        if counter.state.pending == 0 && counter.state.visible {
            counter.cancel_timer();
            self.schedule_hide(&mut counter);
        }
        self.inner.publish(&counter);
    }

    /// Drop all outstanding operations and hide immediately.
    pub fn reset(&self) {
        let mut counter = self.inner.counter.lock();
        counter.cancel_timer();
        counter.generation += 1;
        counter.state.pending = 0;
        counter.hide();
        self.inner.publish(&counter);
    }

    /// `start` now and `stop` when the guard drops.
    #[must_use = "the indicator stops as soon as the guard is dropped"]
    pub fn begin(&self, message: Option<&str>) -> LoadingGuard {
        self.start(message);
        LoadingGuard {
            indicator: self.clone(),
        }
    }

    /// Cancel a pending hide timer.
    pub fn shutdown(&self) {
        let mut counter = self.inner.counter.lock();
        counter.cancel_timer();
        counter.generation += 1;
    }

    #[must_use]
    pub fn state(&self) -> LoadingState {
        self.inner.counter.lock().state.clone()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.counter.lock().state.visible
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
        self.inner.tx.subscribe()
    }

    fn schedule_hide(&self, counter: &mut Counter) {
        let generation = counter.generation;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) if !self.inner.hide_delay.is_zero() => handle,
            _ => {
                counter.hide();
                return;
            }
        };

        let weak: Weak<LoadingInner> = Arc::downgrade(&self.inner);
        let delay = self.inner.hide_delay;
        counter.hide_timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut counter = inner.counter.lock();
            if counter.generation != generation {
                trace!(generation, "stale loading hide timer");
                return;
            }
            counter.hide();
            counter.hide_timer = None;
            inner.publish(&counter);
        }));
    }
}

/// Pairs one `start` with exactly one `stop`.
#[derive(Debug)]
pub struct LoadingGuard {
    indicator: LoadingIndicator,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.indicator.stop();
    }
}
