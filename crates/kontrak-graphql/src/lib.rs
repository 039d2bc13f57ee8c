//! Kontrak GraphQL - wire layer for the kontrak data-access client.
//!
//! This crate provides:
//! - Document compilation and top-level response field extraction.
//! - Request/response envelopes and the error taxonomy of a GraphQL exchange.
//! - The [`GraphqlTransport`] seam and its reqwest implementation, including
//!   cache policies and GraphQL multipart uploads.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

mod cache;
mod client;
mod document;
mod error;
mod operation;
mod transport;

pub use cache::ResponseCache;
pub use client::{
    GraphqlClient, GraphqlClientBuilder, GraphqlClientConfig, GraphqlClientMetrics,
    GraphqlClientMetricsSnapshot,
};
pub use document::{DocumentError, GraphqlDocument, OperationKind, top_level_field};
pub use error::{
    GraphqlClientError, GraphqlError, GraphqlErrorLocation, GraphqlPathSegment, HttpErrorInfo,
};
pub use operation::{CachePolicy, GraphqlRequest, GraphqlResponse};
pub use transport::{
    CredentialSource, GraphqlTransport, TransportRequest, UploadFile, UploadRequest,
};

pub use reqwest::StatusCode;
