//! `kontrak upload`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use kontrak_client::{AppContext, FileUploadResponse, FileUploader, UploaderState, read_upload_file};
use serde::Serialize;

use crate::operation::log_notification;
use crate::output::print_json;

/// Arguments for `kontrak upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// File to upload (JPG, PNG or PDF).
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Variable naming the owning record, e.g. `kontrakId`.
    #[arg(long)]
    pub id_key: String,

    /// Owning record id.
    #[arg(long)]
    pub id: i64,

    /// Document type id.
    #[arg(long)]
    pub document_type: i64,

    /// Display name of the document.
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Serialize)]
struct UploadOutcome {
    record: Option<FileUploadResponse>,
    #[serde(flatten)]
    state: UploaderState,
}

pub async fn run(ctx: &AppContext, args: &UploadArgs) -> anyhow::Result<()> {
    let file = read_upload_file(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;

    let uploader = FileUploader::new(ctx);
    let record = uploader
        .upload(Some(&file), &args.id_key, args.id, args.document_type, &args.name)
        .await;

    log_notification(ctx);
    let outcome = UploadOutcome {
        record,
        state: uploader.state(),
    };
    print_json(&outcome)?;

    match (&outcome.record, outcome.state.last_error) {
        (Some(_), _) => Ok(()),
        (None, Some(error)) => Err(error.into()),
        (None, None) => anyhow::bail!("upload failed"),
    }
}
