//! Query executor.
//!
//! A [`QueryExecutor`] resolves its operation once, at construction, and
//! then runs it on demand. Unless disabled, the first execution starts
//! immediately in the background; [`QueryExecutor::settled`] waits for it.
//!
//! Results are shaped by mode:
//! - `first`: `data` is the unwrapped value and `total` is 0;
//! - `get` and raw documents: `data` is the nested `data` list when present,
//!   `total` the nested numeric `total`.

use std::fmt;
use std::sync::Arc;

use kontrak_graphql::{CachePolicy, OperationKind, TransportRequest};
use kontrak_telemetry::redact_default;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::classify::ClassifiedError;
use crate::context::AppContext;
use crate::executor::{self, HasLoading, LocalLoading};
use crate::registry::{OperationDescriptor, OperationMode, OperationTarget};

const QUERY_FALLBACK_MESSAGE: &str = "Unknown error";

/// Query executor options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub cache_policy: CachePolicy,
    /// Drive the global loading indicator.
    pub use_global_loading: bool,
    /// Run once right after construction.
    pub first_execution: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::NoCache,
            use_global_loading: true,
            first_execution: true,
        }
    }
}

impl QueryOptions {
    #[must_use]
    pub const fn lazy(mut self) -> Self {
        self.first_execution = false;
        self
    }

    #[must_use]
    pub const fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    #[must_use]
    pub const fn without_global_loading(mut self) -> Self {
        self.use_global_loading = false;
        self
    }
}

/// Observable query state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryState {
    pub data: Option<Value>,
    pub total: u64,
    pub loading: bool,
    pub error: Option<ClassifiedError>,
}

impl HasLoading for QueryState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

struct QueryInner {
    ctx: AppContext,
    target: OperationTarget,
    resolved: Result<OperationDescriptor, ClassifiedError>,
    variables: Value,
    options: QueryOptions,
    state: watch::Sender<QueryState>,
    first_run: Mutex<Option<JoinHandle<()>>>,
}

/// Runs one query operation and publishes `{data, total, loading, error}`.
#[derive(Clone)]
pub struct QueryExecutor {
    inner: Arc<QueryInner>,
}

impl fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("target", &self.inner.target)
            .field("inert", &self.is_inert())
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl QueryExecutor {
    /// Resolve `target` and, unless `options.first_execution` is off, start
    /// the first execution.
    ///
    /// Never fails: a target that cannot be resolved yields an inert executor
    /// whose error state holds the reason, and one error notification fires.
    #[must_use]
    pub fn new(
        ctx: &AppContext,
        target: OperationTarget,
        variables: Value,
        options: QueryOptions,
    ) -> Self {
        let resolved = executor::resolve_or_report(ctx, &target, OperationKind::Query);
        let initial = QueryState {
            error: resolved.as_ref().err().cloned(),
            ..QueryState::default()
        };
        let (state, _rx) = watch::channel(initial);
        let executor = Self {
            inner: Arc::new(QueryInner {
                ctx: ctx.clone(),
                target,
                resolved,
                variables,
                options,
                state,
                first_run: Mutex::new(None),
            }),
        };

        if options.first_execution && !executor.is_inert() {
            executor.spawn_first_run();
        }
        executor
    }

    fn spawn_first_run(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(operation = %self.inner.target, "no runtime; first execution skipped");
            return;
        };
        let inner = Arc::clone(&self.inner);
        let handle = runtime.spawn(async move {
            let variables = inner.variables.clone();
            // The outcome is mirrored in the state.
            let _ = inner.fetch(variables).await;
        });
        *self.inner.first_run.lock() = Some(handle);
    }

    /// Wait for the first execution started by [`new`](Self::new).
    pub async fn settled(&self) {
        let handle = self.inner.first_run.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(operation = %self.inner.target, error = %err, "first execution aborted");
            }
        }
    }

    /// Run again with `extra` merged over the construction-time variables.
    pub async fn refetch(&self, extra: Option<Value>) -> Result<Option<Value>, ClassifiedError> {
        let variables = merge_variables(&self.inner.variables, extra);
        self.inner.fetch(variables).await
    }

    #[must_use]
    pub fn state(&self) -> QueryState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn data(&self) -> Option<Value> {
        self.inner.state.borrow().data.clone()
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner.state.borrow().total
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
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.inner.state.subscribe()
    }

    /// The operation could not be resolved; every run is a no-op.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.inner.resolved.is_err()
    }

    #[must_use]
    pub fn target(&self) -> &OperationTarget {
        &self.inner.target
    }
}

impl QueryInner {
    #[instrument(skip_all, fields(operation = %self.target))]
    async fn fetch(&self, variables: Value) -> Result<Option<Value>, ClassifiedError> {
        let descriptor = match &self.resolved {
            Ok(descriptor) => descriptor,
            Err(err) => return Err(err.clone()),
        };

        let _global = self
            .options
            .use_global_loading
            .then(|| self.ctx.loading().begin(None));
        let _local = LocalLoading::begin(&self.state);

        debug!(
            variables = %redact_default(&variables),
            cache_policy = ?self.options.cache_policy,
            "running query"
        );
        let request = TransportRequest::new(descriptor.document.clone(), variables)
            .with_cache_policy(self.options.cache_policy);
        let outcome = self
            .ctx
            .transport()
            .query(request)
            .await
            .and_then(|response| executor::unwrap_field(response, &descriptor.top_level_field));

        match outcome {
            Ok(value) => {
                let (data, total) = shape(descriptor.mode, value);
                debug!(total, has_data = data.is_some(), "query succeeded");
                self.state.send_modify(|state| {
                    state.data.clone_from(&data);
                    state.total = total;
                    state.error = None;
                });
                Ok(data)
            }
            Err(failure) => {
                let classified =
                    executor::report_failure(&self.ctx, &self.target, &failure, QUERY_FALLBACK_MESSAGE);
                self.state
                    .send_modify(|state| state.error = Some(classified.clone()));
                Err(classified)
            }
        }
    }
}

/// Split an unwrapped value into `(data, total)`.
fn shape(mode: Option<OperationMode>, value: Value) -> (Option<Value>, u64) {
    if mode == Some(OperationMode::First) {
        return (executor::non_null(value), 0);
    }
    let total = total_of(&value);
    let data = match value.get("data") {
        Some(nested) if !nested.is_null() => Some(nested.clone()),
        _ => executor::non_null(value),
    };
    (data, total)
}

/// `value.total` as a count. Integral floats such as `42.0` are accepted;
/// anything else counts as 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::float_cmp)]
fn total_of(value: &Value) -> u64 {
    let Some(total) = value.get("total").filter(|total| !total.is_null()) else {
        return 0;
    };
    total
        .as_u64()
        .or_else(|| {
            total
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as u64)
        })
        .unwrap_or_else(|| {
            debug!(%total, "total is not a non-negative integer; using 0");
            0
        })
}

/// Shallow merge of `extra` over `base`.
fn merge_variables(base: &Value, extra: Option<Value>) -> Value {
    match (base, extra) {
        (_, None) => base.clone(),
        (Value::Object(base), Some(Value::Object(extra))) => {
            let mut merged: Map<String, Value> = base.clone();
            merged.extend(extra);
            Value::Object(merged)
        }
        (_, Some(extra)) => extra,
    }
}
