//! `kontrak login`, `logout` and `whoami`.

use clap::Args;
use kontrak_client::AppContext;
use kontrak_telemetry::redact_default;
use serde_json::json;

use crate::output::print_json;

/// Arguments for `kontrak login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Bearer token issued by the kontrak API.
    #[arg(long)]
    pub token: String,
}

pub fn login(ctx: &AppContext, args: &LoginArgs) -> anyhow::Result<()> {
    warn_if_ephemeral(ctx);
    ctx.session().set_token(args.token.as_str())?;
    tracing::info!("session token stored");
    whoami(ctx)
}

pub fn logout(ctx: &AppContext) -> anyhow::Result<()> {
    warn_if_ephemeral(ctx);
    ctx.session().logout();
    whoami(ctx)
}

pub fn whoami(ctx: &AppContext) -> anyhow::Result<()> {
    let session = ctx.session();
    let snapshot = serde_json::to_value(session.snapshot())?;
    print_json(&json!({
        "authenticated": session.is_authenticated(),
        "roleAssigned": session.is_role_assigned(),
        "session": redact_default(&snapshot),
    }))
}

fn warn_if_ephemeral(ctx: &AppContext) {
    if ctx.config().session.storage_path.is_none() {
        tracing::warn!("session.storage_path is not configured; the session is not persisted");
    }
}
