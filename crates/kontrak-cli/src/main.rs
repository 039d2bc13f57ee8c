//! `kontrak` command-line client.
//!
//! - `kontrak field` - inspect a GraphQL document
//! - `kontrak query` / `query-raw` / `mutate` - run operations
//! - `kontrak upload` - attach a document to a record
//! - `kontrak login` / `logout` / `whoami` - manage the persisted session
//! - `kontrak registry` - list the operation catalog

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod field;
mod operation;
mod output;
mod registry;
mod session;
mod upload;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kontrak_client::{AppContext, ClientConfig};

/// Command-line client for the kontrak GraphQL API.
#[derive(Parser)]
#[command(name = "kontrak")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Client configuration file (TOML).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// GraphQL endpoint, overriding the configuration file.
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,
}

impl GlobalArgs {
    /// Load the configuration file (or defaults) and apply overrides.
    pub fn load_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the operation kind, name and response field of a document.
    ///
    /// Reads the document from a file, or from stdin when the path is `-`.
    Field(field::FieldArgs),

    /// Run a registry query.
    ///
    /// Example: kontrak query termin --mode first --vars '{"getTerminId": 7}'
    Query(operation::QueryArgs),

    /// Run a query document read from a file.
    QueryRaw(operation::QueryRawArgs),

    /// Run a registry mutation.
    ///
    /// Example: kontrak mutate termin --mode delete --vars '{"deleteTerminId": 7}'
    Mutate(operation::MutateArgs),

    /// Upload a file as a document attached to a record.
    Upload(upload::UploadArgs),

    /// Store a bearer token in the session file.
    Login(session::LoginArgs),

    /// Clear the persisted session.
    Logout,

    /// Print the persisted session with secrets redacted.
    Whoami,

    /// List registry entities and their operation modes.
    Registry,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.global.load_config()?;
    kontrak_telemetry::init_telemetry(&config.telemetry_config())?;

    let build = kontrak_client::build_info();
    tracing::debug!(commit = build.commit, built = build.build_date, "kontrak cli");

    let ctx = AppContext::from_config(config)?;
    let result = match cli.command {
        Commands::Field(args) => field::run(&args),
        Commands::Query(args) => operation::run_query(&ctx, args).await,
        Commands::QueryRaw(args) => operation::run_query_raw(&ctx, &args).await,
        Commands::Mutate(args) => operation::run_mutate(&ctx, args).await,
        Commands::Upload(args) => upload::run(&ctx, &args).await,
        Commands::Login(args) => session::login(&ctx, &args),
        Commands::Logout => session::logout(&ctx),
        Commands::Whoami => session::whoami(&ctx),
        Commands::Registry => registry::run(ctx.registry()),
    };
    ctx.shutdown();
    result
}
