//! Kontrak client - data access for the kontrak GraphQL API.
//!
//! This crate provides:
//! - [`QueryExecutor`] and [`MutationExecutor`]: resolve a registry entry or a
//!   raw document once, then run it while driving loading state, error
//!   classification and user notification.
//! - The shared client state owned by [`AppContext`]: loading indicator,
//!   notification slot, confirmation dialog, session and navigation.
//! - File uploads, document number generation and the route guard.
//!
//! # Example
//!
//! ```no_run
//! use kontrak_client::{AppContext, ClientConfig, OperationMode, OperationTarget, QueryOptions};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = AppContext::from_config(ClientConfig::default())?;
//! let termin = ctx.query(
//!     OperationTarget::registry("termin", OperationMode::Get),
//!     json!({}),
//!     QueryOptions::default(),
//! );
//! termin.settled().await;
//! println!("{:?}", termin.data());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod build_info;
mod classify;
mod config;
mod confirm;
mod context;
mod executor;
mod guard;
mod loading;
mod mutation;
mod navigation;
mod notification;
mod numbering;
mod query;
mod registry;
mod session;
mod upload;

pub use build_info::{BuildInfo, build_info};
pub use classify::{
    ClassifiedError, ErrorClassifier, ErrorCode, LOGOUT_PATH, SESSION_EXPIRED_MESSAGE,
};
pub use config::{
    ClientConfig, ConfigError, DEFAULT_ALLOWED_MIME_TYPES, DEFAULT_ENDPOINT,
    DEFAULT_MAX_UPLOAD_BYTES, LoadingConfig, NotificationConfig, RegistryConfig, SessionConfig,
    TelemetrySection, TransportConfig, UploadConfig,
};
pub use confirm::{ConfirmDialog, ConfirmState};
pub use context::{AppContext, AppContextBuilder, ContextError};
pub use guard::{
    GuardDecision, REDIRECT_MAX_AGE_HOURS, RedirectStore, Route, RouteGuard, is_verification_url,
};
pub use loading::{LoadingGuard, LoadingIndicator, LoadingState};
pub use mutation::{DEFAULT_SUCCESS_MESSAGE, MutationExecutor, MutationOptions, MutationState};
pub use navigation::Navigator;
pub use notification::{Notification, NotificationState, Notifier, Severity};
pub use numbering::{
    DOCUMENT_NUMBER_MESSAGE, DocumentNumberError, DocumentNumberGenerator, DocumentNumberRequest,
};
pub use query::{QueryExecutor, QueryOptions, QueryState};
pub use registry::{
    OperationDescriptor, OperationMode, OperationRegistry, OperationTarget, RegistryError,
    ResolveError,
};
pub use session::{
    ActiveUser, FileSessionStorage, MemorySessionStorage, SessionError, SessionState,
    SessionStorage, SessionStore,
};
pub use upload::{
    FileToUpload, FileUploadResponse, FileUploader, UploadProgress, UploadRejection,
    UploaderState, mime_for_path, read_upload_file,
};

pub use kontrak_graphql::{CachePolicy, OperationKind, UploadFile};
