//! Pieces shared by the query and mutation executors.

use kontrak_graphql::{GraphqlClientError, GraphqlResponse, OperationKind};
use serde_json::Value;
use tokio::sync::watch;
use tracing::error;

use crate::classify::ClassifiedError;
use crate::context::AppContext;
use crate::notification::Severity;
use crate::registry::{OperationDescriptor, OperationTarget, ResolveError};

/// State types with a local `loading` flag.
pub(crate) trait HasLoading {
    fn set_loading(&mut self, loading: bool);
}

/// Sets `loading = true` and clears it on drop, so a cancelled call still
/// leaves the executor idle.
pub(crate) struct LocalLoading<'a, S: HasLoading> {
    tx: &'a watch::Sender<S>,
}

impl<'a, S: HasLoading> LocalLoading<'a, S> {
    pub(crate) fn begin(tx: &'a watch::Sender<S>) -> Self {
        tx.send_modify(|state| state.set_loading(true));
        Self { tx }
    }
}

impl<S: HasLoading> Drop for LocalLoading<'_, S> {
    fn drop(&mut self) {
        self.tx.send_modify(|state| state.set_loading(false));
    }
}

/// Resolve `target`, or report the failure once and return it as the
/// executor's permanent error.
pub(crate) fn resolve_or_report(
    ctx: &AppContext,
    target: &OperationTarget,
    kind: OperationKind,
) -> Result<OperationDescriptor, ClassifiedError> {
    ctx.registry().resolve(target, kind).map_err(|err| {
        report_resolve_error(ctx, target, kind, &err);
        ClassifiedError::new(err.to_string())
    })
}

fn report_resolve_error(
    ctx: &AppContext,
    target: &OperationTarget,
    kind: OperationKind,
    err: &ResolveError,
) {
    error!(operation = %target, kind = %kind, error = %err, "operation resolution failed");
    let prefix = match kind {
        OperationKind::Mutation => "Mutation error",
        OperationKind::Query | OperationKind::Subscription => "Query error",
    };
    ctx.notifier().show(
        format!("{prefix}: {err}"),
        Severity::Error,
        ctx.config().error_notification_duration(),
        false,
    );
}

/// `data[field]` of a successful envelope. GraphQL errors become a failure; a
/// missing key unwraps to `null`.
pub(crate) fn unwrap_field(
    response: GraphqlResponse<Value>,
    field: &str,
) -> Result<Value, GraphqlClientError> {
    if !response.errors.is_empty() {
        return Err(GraphqlClientError::GraphqlErrors {
            errors: response.errors,
        });
    }
    match response.data {
        Some(Value::Object(mut data)) => Ok(data.remove(field).unwrap_or(Value::Null)),
        Some(_) | None => Err(GraphqlClientError::Protocol {
            message: "response carries neither data nor errors".to_string(),
        }),
    }
}

/// Classify a failed exchange. Authorization failures tear the session down;
/// everything else is shown as `Error: <message>`.
pub(crate) fn report_failure(
    ctx: &AppContext,
    target: &OperationTarget,
    failure: &GraphqlClientError,
    fallback: &str,
) -> ClassifiedError {
    let classified = ClassifiedError::from_failure(failure, fallback);
    error!(
        operation = %target,
        error = %classified.message,
        code = ?classified.code,
        "operation failed"
    );
    if !ctx.classifier().handle(failure) {
        ctx.notifier().show(
            format!("Error: {}", classified.message),
            Severity::Error,
            ctx.config().error_notification_duration(),
            false,
        );
    }
    classified
}

/// `Null` reads as no data.
pub(crate) fn non_null(value: Value) -> Option<Value> {
    (!value.is_null()).then_some(value)
}
