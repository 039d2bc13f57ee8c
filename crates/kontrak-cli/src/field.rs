//! `kontrak field` - document inspection.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use kontrak_graphql::{GraphqlDocument, OperationKind, top_level_field};
use serde::Serialize;

use crate::output::print_json;

/// Arguments for `kontrak field`.
#[derive(Args, Debug)]
pub struct FieldArgs {
    /// Document file, or `-` for stdin.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
struct FieldReport {
    kind: Option<OperationKind>,
    operation_name: Option<String>,
    top_level_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: &FieldArgs) -> anyhow::Result<()> {
    let source = read_source(&args.path)?;
    let report = inspect(&source);
    print_json(&report)?;
    match report.error {
        Some(error) => anyhow::bail!("invalid document: {error}"),
        None => Ok(()),
    }
}

/// Read a document from `path`, treating `-` as stdin.
pub fn read_source(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading document from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn inspect(source: &str) -> FieldReport {
    match GraphqlDocument::parse(source) {
        Ok(document) => FieldReport {
            kind: Some(document.kind()),
            operation_name: document.operation_name().map(str::to_string),
            top_level_field: document.top_level_field().map(str::to_string),
            error: None,
        },
        // The extractor works on raw text, so report it even for invalid input.
        Err(err) => FieldReport {
            kind: None,
            operation_name: None,
            top_level_field: top_level_field(source),
            error: Some(err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_document_reports_kind_and_field() {
        let report = inspect("mutation DeleteTermin($id: Int!) { deleteTermin(id: $id) }");
        assert_eq!(report.kind, Some(OperationKind::Mutation));
        assert_eq!(report.operation_name.as_deref(), Some("DeleteTermin"));
        assert_eq!(report.top_level_field.as_deref(), Some("deleteTermin"));
        assert!(report.error.is_none());
    }

    #[test]
    fn invalid_document_still_runs_extractor() {
        let report = inspect("query { getAllTermin { id ");
        assert!(report.kind.is_none());
        assert!(report.error.is_some());
    }
}
