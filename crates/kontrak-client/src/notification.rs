//! Single-slot transient notifications.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

/// Notification color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Primary,
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "primary",
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A notification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    /// Auto-dismiss delay; ignored when `closable`.
    pub duration: Duration,
    /// Stays until `close` when set.
    pub closable: bool,
}

/// What is currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationState {
    pub message: String,
    pub severity: Severity,
    pub visible: bool,
    pub closable: bool,
}

#[derive(Debug, Default)]
struct Slot {
    state: NotificationState,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl Slot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn clear(&mut self) {
        self.state.visible = false;
        self.state.message.clear();
    }
}

#[derive(Debug)]
struct NotifierInner {
    default_duration: Duration,
    slot: Mutex<Slot>,
    state_tx: watch::Sender<NotificationState>,
    events: broadcast::Sender<Notification>,
    shown: AtomicU64,
}

impl NotifierInner {
    fn publish(&self, slot: &Slot) {
        self.state_tx.send_replace(slot.state.clone());
    }
}

/// Process-wide notification slot. A new notification replaces the current one.
#[derive(Debug, Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        let (state_tx, _state_rx) = watch::channel(NotificationState::default());
        let (events, _events_rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(NotifierInner {
                default_duration,
                slot: Mutex::new(Slot::default()),
                state_tx,
                events,
                shown: AtomicU64::new(0),
            }),
        }
    }

    /// Show `message` with the default duration.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.show(message, severity, self.inner.default_duration, false);
    }

    /// Show `message`, replacing whatever is on screen.
    pub fn show(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
        closable: bool,
    ) {
        self.show_notification(Notification {
            message: message.into(),
            severity,
            duration,
            closable,
        });
    }

    pub fn show_notification(&self, notification: Notification) {
        debug!(severity = %notification.severity, message = %notification.message, "notification");
        {
            let mut slot = self.inner.slot.lock();
            slot.cancel_timer();
            slot.generation += 1;
            slot.state = NotificationState {
                message: notification.message.clone(),
                severity: notification.severity,
                visible: true,
                closable: notification.closable,
            };
            if !notification.closable {
                self.schedule_dismiss(&mut slot, notification.duration);
            }
            self.inner.publish(&slot);
        }
        self.inner.shown.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine.
        let _ = self.inner.events.send(notification);
    }

    /// Hide the current notification now.
    pub fn close(&self) {
        let mut slot = self.inner.slot.lock();
        slot.cancel_timer();
        slot.generation += 1;
        slot.clear();
        self.inner.publish(&slot);
    }

    /// Cancel a pending auto-dismiss.
    pub fn shutdown(&self) {
        let mut slot = self.inner.slot.lock();
        slot.cancel_timer();
        slot.generation += 1;
    }

    #[must_use]
    pub fn state(&self) -> NotificationState {
        self.inner.slot.lock().state.clone()
    }

    /// Every notification shown from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.events.subscribe()
    }

    /// Slot changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<NotificationState> {
        self.inner.state_tx.subscribe()
    }

    #[must_use]
    pub fn shown_count(&self) -> u64 {
        self.inner.shown.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn default_duration(&self) -> Duration {
        self.inner.default_duration
    }

    fn schedule_dismiss(&self, slot: &mut Slot, duration: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime; notification stays until closed");
            return;
        };
        let generation = slot.generation;
        let weak: Weak<NotifierInner> = Arc::downgrade(&self.inner);
        slot.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut slot = inner.slot.lock();
            if slot.generation != generation {
                return;
            }
            slot.clear();
            slot.timer = None;
            inner.publish(&slot);
        }));
    }
}
