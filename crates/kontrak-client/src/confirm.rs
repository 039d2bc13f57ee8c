//! Confirmation dialog state.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

type ConfirmAction = Box<dyn FnOnce() + Send + 'static>;

/// Dialog contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmState {
    pub visible: bool,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
struct DialogSlot {
    state: ConfirmState,
    action: Option<ConfirmAction>,
}

struct ConfirmInner {
    slot: Mutex<DialogSlot>,
    tx: watch::Sender<ConfirmState>,
}

/// Single confirmation dialog holding one pending action.
#[derive(Clone)]
pub struct ConfirmDialog {
    inner: Arc<ConfirmInner>,
}

impl fmt::Debug for ConfirmDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("ConfirmDialog")
            .field("state", &slot.state)
            .field("has_action", &slot.action.is_some())
            .finish()
    }
}

impl Default for ConfirmDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmDialog {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConfirmState::default());
        Self {
            inner: Arc::new(ConfirmInner {
                slot: Mutex::new(DialogSlot::default()),
                tx,
            }),
        }
    }

    /// Show the dialog. Replaces any pending action.
    pub fn open(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        on_confirm: impl FnOnce() + Send + 'static,
    ) {
        let mut slot = self.inner.slot.lock();
        slot.state = ConfirmState {
            visible: true,
            title: title.into(),
            message: message.into(),
        };
        slot.action = Some(Box::new(on_confirm));
        self.inner.tx.send_replace(slot.state.clone());
    }

    /// Run the pending action, then close. Returns whether an action ran.
    pub fn confirm(&self) -> bool {
        let action = self.inner.slot.lock().action.take();
        let ran = action.is_some();
        if let Some(action) = action {
            action();
        }
        self.close();
        ran
    }

    /// Hide the dialog and discard the pending action.
    pub fn close(&self) {
        let mut slot = self.inner.slot.lock();
        slot.action = None;
        slot.state.visible = false;
        self.inner.tx.send_replace(slot.state.clone());
    }

    #[must_use]
    pub fn state(&self) -> ConfirmState {
        self.inner.slot.lock().state.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConfirmState> {
        self.inner.tx.subscribe()
    }
}
