#![allow(dead_code)]

use std::sync::Arc;

use kontrak_client::{AppContext, ClientConfig, Notification, SessionStore};
use kontrak_testkit::{MockTransport, init_test_tracing};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Context wired to a scripted transport.
pub struct Harness {
    pub ctx: AppContext,
    pub transport: Arc<MockTransport>,
    pub notifications: broadcast::Receiver<Notification>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::build(config, SessionStore::in_memory())
    }

    pub fn with_session(session: SessionStore) -> Self {
        Self::build(ClientConfig::default(), session)
    }

    fn build(config: ClientConfig, session: SessionStore) -> Self {
        init_test_tracing();
        let transport = Arc::new(MockTransport::new());
        let ctx = AppContext::builder(config)
            .with_transport(transport.clone())
            .with_session(session)
            .build()
            .expect("context");
        let notifications = ctx.notifier().subscribe();
        Self {
            ctx,
            transport,
            notifications,
        }
    }

    /// Notifications shown since the last call.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut shown = Vec::new();
        loop {
            match self.notifications.try_recv() {
                Ok(notification) => shown.push(notification),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        shown
    }

    pub fn drain_messages(&mut self) -> Vec<String> {
        self.drain_notifications()
            .into_iter()
            .map(|notification| notification.message)
            .collect()
    }
}
