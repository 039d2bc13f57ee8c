//! Mutation executor.

use std::fmt;
use std::sync::Arc;

use kontrak_graphql::{CachePolicy, OperationKind, TransportRequest};
use kontrak_telemetry::redact_default;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::classify::ClassifiedError;
use crate::context::AppContext;
use crate::executor::{self, HasLoading, LocalLoading};
use crate::notification::Severity;
use crate::registry::{OperationDescriptor, OperationTarget};

/// Shown after a successful mutation unless overridden.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Data saved successfully.";

const MUTATION_FALLBACK_MESSAGE: &str = "An error occurred while running the mutation.";
const PROCESSING_MESSAGE: &str = "Processing...";

/// Mutation executor options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOptions {
    pub cache_policy: CachePolicy,
    pub show_success_message: bool,
    /// Replaces [`DEFAULT_SUCCESS_MESSAGE`].
    pub custom_success_message: Option<String>,
    pub use_global_loading: bool,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::NoCache,
            show_success_message: true,
            custom_success_message: None,
            use_global_loading: true,
        }
    }
}

impl MutationOptions {
    #[must_use]
    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.custom_success_message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.show_success_message = false;
        self
    }

    #[must_use]
    pub const fn without_global_loading(mut self) -> Self {
        self.use_global_loading = false;
        self
    }

    fn success_message(&self) -> &str {
        self.custom_success_message
            .as_deref()
            .unwrap_or(DEFAULT_SUCCESS_MESSAGE)
    }
}

/// Observable mutation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MutationState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: Option<ClassifiedError>,
}

impl HasLoading for MutationState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

struct MutationInner {
    ctx: AppContext,
    target: OperationTarget,
    resolved: Result<OperationDescriptor, ClassifiedError>,
    options: MutationOptions,
    state: watch::Sender<MutationState>,
}

/// Runs one mutation operation on demand.
#[derive(Clone)]
pub struct MutationExecutor {
    inner: Arc<MutationInner>,
}

impl fmt::Debug for MutationExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationExecutor")
            .field("target", &self.inner.target)
            .field("inert", &self.is_inert())
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl MutationExecutor {
    /// Resolve `target`. Nothing runs until [`execute`](Self::execute).
    ///
    /// An unresolvable target yields an inert executor and one
    /// `Mutation error: ...` notification.
    #[must_use]
    pub fn new(ctx: &AppContext, target: OperationTarget, options: MutationOptions) -> Self {
        let resolved = executor::resolve_or_report(ctx, &target, OperationKind::Mutation);
        let initial = MutationState {
            error: resolved.as_ref().err().cloned(),
            ..MutationState::default()
        };
        let (state, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(MutationInner {
                ctx: ctx.clone(),
                target,
                resolved,
                options,
                state,
            }),
        }
    }

    /// Run the mutation with exactly `variables`.
    #[instrument(skip_all, fields(operation = %self.inner.target))]
    pub async fn execute(&self, variables: Value) -> Result<Option<Value>, ClassifiedError> {
        let inner = &*self.inner;
        let descriptor = match &inner.resolved {
            Ok(descriptor) => descriptor,
            Err(err) => return Err(err.clone()),
        };

        let _global = inner
            .options
            .use_global_loading
            .then(|| inner.ctx.loading().begin(Some(PROCESSING_MESSAGE)));
        let _local = LocalLoading::begin(&inner.state);

        debug!(variables = %redact_default(&variables), "running mutation");
        let request = TransportRequest::new(descriptor.document.clone(), variables)
            .with_cache_policy(inner.options.cache_policy);
        let outcome = inner
            .ctx
            .transport()
            .mutate(request)
            .await
            .and_then(|response| executor::unwrap_field(response, &descriptor.top_level_field));

        match outcome {
            Ok(value) => {
                let data = executor::non_null(value);
                inner.state.send_modify(|state| {
                    state.data.clone_from(&data);
                    state.error = None;
                });
                if inner.options.show_success_message {
                    inner
                        .ctx
                        .notifier()
                        .notify(inner.options.success_message(), Severity::Success);
                }
                debug!("mutation succeeded");
                Ok(data)
            }
            Err(failure) => {
                let classified = executor::report_failure(
                    &inner.ctx,
                    &inner.target,
                    &failure,
                    MUTATION_FALLBACK_MESSAGE,
                );
                inner
                    .state
                    .send_modify(|state| state.error = Some(classified.clone()));
                Err(classified)
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> MutationState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn data(&self) -> Option<Value> {
        self.inner.state.borrow().data.clone()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    #[must_use]
    pub fn error(&self) -> Option<ClassifiedError> {
        self.inner.state.borrow().error.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.inner.resolved.is_err()
    }

    #[must_use]
    pub fn target(&self) -> &OperationTarget {
        &self.inner.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_message_defaults_and_overrides() {
        assert_eq!(
            MutationOptions::default().success_message(),
            DEFAULT_SUCCESS_MESSAGE
        );
        let custom = MutationOptions::default().with_success_message("Termin dihapus");
        assert_eq!(custom.success_message(), "Termin dihapus");
        assert!(!custom.silent().show_success_message);
    }
}
