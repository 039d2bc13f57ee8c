//! Document compilation and top-level field extraction.

use std::fmt;
use std::sync::Arc;

use async_graphql_parser::types::{ExecutableDocument, OperationType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of the first operation in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// `query`, including the shorthand `{ ... }` form.
    Query,
    /// `mutation`.
    Mutation,
    /// `subscription`.
    Subscription,
}

impl From<OperationType> for OperationKind {
    fn from(ty: OperationType) -> Self {
        match ty {
            OperationType::Query => Self::Query,
            OperationType::Mutation => Self::Mutation,
            OperationType::Subscription => Self::Subscription,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
            Self::Subscription => f.write_str("subscription"),
        }
    }
}

/// Document compilation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Source is empty or whitespace.
    #[error("document is empty")]
    Empty,
    /// Source does not parse as an executable GraphQL document.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Source parses but defines no operation (fragments only).
    #[error("document defines no operation")]
    NoOperation,
}

/// A compiled GraphQL document.
///
/// Holds the original source (sent verbatim over the wire), the parsed AST and
/// the response key of the first top-level selection.
#[derive(Debug, Clone)]
pub struct GraphqlDocument {
    source: Arc<str>,
    kind: OperationKind,
    operation_name: Option<String>,
    top_level_field: Option<String>,
    ast: Arc<ExecutableDocument>,
}

impl GraphqlDocument {
    /// Compile a document source.
    pub fn parse(source: impl Into<String>) -> Result<Self, DocumentError> {
        let source: String = source.into();
        if source.trim().is_empty() {
            return Err(DocumentError::Empty);
        }

        let ast = async_graphql_parser::parse_query(&source)
            .map_err(|err| DocumentError::Syntax(err.to_string()))?;

        let (name, operation) = ast
            .operations
            .iter()
            .min_by_key(|(_, op)| (op.pos.line, op.pos.column))
            .ok_or(DocumentError::NoOperation)?;
        let kind = OperationKind::from(operation.node.ty);
        let operation_name = name.map(ToString::to_string);

        Ok(Self {
            top_level_field: top_level_field(&source),
            source: source.into(),
            kind,
            operation_name,
            ast: Arc::new(ast),
        })
    }

    /// Document source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Kind of the first operation.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Name of the first operation, if it is named.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Response key extracted with [`top_level_field`].
    #[must_use]
    pub fn top_level_field(&self) -> Option<&str> {
        self.top_level_field.as_deref()
    }

    /// Parsed syntax tree.
    #[must_use]
    pub fn ast(&self) -> &ExecutableDocument {
        &self.ast
    }
}

impl PartialEq for GraphqlDocument {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Name of the first selection in the first `{ ... }` block of `source`.
///
/// Works on the raw text: whitespace runs collapse to one space, the first
/// token stops at a space or `(`, and for `alias: field` the text after the
/// last `:` is returned. Returns `None` when there is no block or it is empty.
#[must_use]
pub fn top_level_field(source: &str) -> Option<String> {
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");

    let open = collapsed.find('{')?;
    let rest = &collapsed[open + 1..];
    let close = rest.find('}')?;
    let body = rest[..close].trim().replace(" :", ":").replace(": ", ":");

    let token = body.split([' ', '(']).next()?;
    // NOTE: for `alias: field` this yields `field`, while the server keys the
    // response by `alias`.
    let field = token.rsplit(':').next()?.trim();

    (!field.is_empty()).then(|| field.to_string())
}
