//! Kontrak Test Kit - mock infrastructure for the kontrak client crates.
//!
//! - [`MockTransport`] - scripted in-process [`GraphqlTransport`] that records calls
//! - [`MockGraphqlServer`] - wiremock-backed GraphQL endpoint
//! - [`LogCapture`] - structured JSONL result capture
//! - Tracing configuration for test output
//!
//! # Example
//!
//! ```rust,ignore
//! use kontrak_testkit::{MockTransport, init_test_tracing};
//!
//! #[tokio::test]
//! async fn loads_termin() {
//!     init_test_tracing();
//!     let transport = MockTransport::new();
//!     transport.push_data(serde_json::json!({"termin": {"data": [], "total": 0}}));
//!     // hand `Arc::new(transport)` to the executor under test
//! }
//! ```
//!
//! [`GraphqlTransport`]: kontrak_graphql::GraphqlTransport

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

mod log_capture;
mod mock_server;
mod mock_transport;
mod tracing_config;

pub use log_capture::*;
pub use mock_server::*;
pub use mock_transport::*;
pub use tracing_config::*;
