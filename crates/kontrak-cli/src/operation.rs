//! `kontrak query`, `query-raw` and `mutate`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use kontrak_client::{
    AppContext, ClassifiedError, MutationOptions, OperationMode, OperationTarget, QueryOptions,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::field::read_source;
use crate::output::print_json;

/// Arguments for `kontrak query`.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Registry entity, e.g. `termin`.
    pub entity: String,

    /// Query mode.
    #[arg(long, default_value = "get", value_parser = parse_query_mode)]
    pub mode: OperationMode,

    /// Operation variables as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub vars: Option<String>,
}

/// Arguments for `kontrak query-raw`.
#[derive(Args, Debug)]
pub struct QueryRawArgs {
    /// Query document file, or `-` for stdin.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Operation variables as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub vars: Option<String>,
}

/// Arguments for `kontrak mutate`.
#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Registry entity, e.g. `kontrak`.
    pub entity: String,

    /// Mutation mode.
    #[arg(long, value_parser = parse_mutation_mode)]
    pub mode: OperationMode,

    /// Operation variables as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub vars: Option<String>,

    /// Do not emit the success notification.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Serialize)]
struct Outcome<'a, S: Serialize> {
    target: String,
    #[serde(flatten)]
    state: &'a S,
}

pub async fn run_query(ctx: &AppContext, args: QueryArgs) -> anyhow::Result<()> {
    let variables = parse_vars(args.vars.as_deref())?;
    execute_query(ctx, OperationTarget::registry(args.entity, args.mode), variables).await
}

pub async fn run_query_raw(ctx: &AppContext, args: &QueryRawArgs) -> anyhow::Result<()> {
    let variables = parse_vars(args.vars.as_deref())?;
    let source = read_source(&args.path)?;
    execute_query(ctx, OperationTarget::raw(source), variables).await
}

pub async fn run_mutate(ctx: &AppContext, args: MutateArgs) -> anyhow::Result<()> {
    let variables = parse_vars(args.vars.as_deref())?;
    let options = if args.quiet {
        MutationOptions::default().silent()
    } else {
        MutationOptions::default()
    };
    let mutation = ctx.mutation(OperationTarget::registry(args.entity, args.mode), options);
    let result = mutation.execute(variables).await;

    log_notification(ctx);
    print_json(&Outcome {
        target: mutation.target().to_string(),
        state: &mutation.state(),
    })?;
    finish(result)
}

async fn execute_query(
    ctx: &AppContext,
    target: OperationTarget,
    variables: Value,
) -> anyhow::Result<()> {
    let query = ctx.query(target, variables, QueryOptions::default().lazy());
    let result = query.refetch(None).await;

    log_notification(ctx);
    print_json(&Outcome {
        target: query.target().to_string(),
        state: &query.state(),
    })?;
    finish(result)
}

fn finish(result: Result<Option<Value>, ClassifiedError>) -> anyhow::Result<()> {
    result.map(|_| ()).map_err(anyhow::Error::from)
}

/// Surface the last notification on stderr, since there is no toast to show.
pub fn log_notification(ctx: &AppContext) {
    let shown = ctx.notifier().state();
    if shown.visible {
        tracing::info!(severity = %shown.severity, "{}", shown.message);
    }
}

/// Parse `--vars`; absent means `{}`.
pub fn parse_vars(raw: Option<&str>) -> anyhow::Result<Value> {
    let Some(raw) = raw else {
        return Ok(json!({}));
    };
    let value: Value = serde_json::from_str(raw).context("--vars is not valid JSON")?;
    anyhow::ensure!(value.is_object(), "--vars must be a JSON object");
    Ok(value)
}

fn parse_query_mode(raw: &str) -> Result<OperationMode, String> {
    let mode: OperationMode = raw.parse().map_err(|e| format!("{e}"))?;
    if mode.is_query() {
        Ok(mode)
    } else {
        Err(format!("`{mode}` is not a query mode (expected get or first)"))
    }
}

fn parse_mutation_mode(raw: &str) -> Result<OperationMode, String> {
    let mode: OperationMode = raw.parse().map_err(|e| format!("{e}"))?;
    if mode.is_mutation() {
        Ok(mode)
    } else {
        Err(format!("`{mode}` is not a mutation mode"))
    }
}
