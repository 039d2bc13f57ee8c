//! Document file uploads through the `dokument.create` mutation.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use kontrak_graphql::{GraphqlClientError, OperationKind, UploadFile, UploadRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::classify::{ClassifiedError, ErrorCode};
use crate::context::AppContext;
use crate::executor;
use crate::notification::Severity;
use crate::registry::{OperationMode, OperationTarget};

const UPLOAD_ENTITY: &str = "dokument";
const UPLOAD_FILE_PATH: &str = "variables.data.file";
const VALIDATION_FAILED: &str = "GRAPHQL_VALIDATION_FAILED";
const BAD_REQUEST: &str = "BAD_REQUEST";
const UPLOAD_FALLBACK_MESSAGE: &str = "Failed to upload file.";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Why a file was refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("File not found")]
    Missing,

    #[error("File is too large. Maximum size is {}MB", .max_bytes / BYTES_PER_MB)]
    TooLarge { size: u64, max_bytes: u64 },

    #[error("Unsupported file type. Only JPG, PNG and PDF are allowed")]
    UnsupportedType(String),
}

/// Record created by a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUploadResponse {
    pub id: i64,
    pub uid: String,
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
}

/// One entry of a batch upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToUpload {
    pub file: Option<UploadFile>,
    /// `jenisDokumenId` of the created document.
    pub document_type: i64,
    /// `nama_dokument` of the created document.
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub uploaded: usize,
    pub total: usize,
    pub current_file: String,
}

/// Observable uploader state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploaderState {
    pub uploading: bool,
    pub progress: UploadProgress,
    pub last_error: Option<ClassifiedError>,
}

/// Where the uploaded document is attached: `{<id_key>: id}` in the input.
#[derive(Debug, Clone, Copy)]
struct Owner<'a> {
    id_key: &'a str,
    id: i64,
}

/// Validates and uploads document files.
#[derive(Clone)]
pub struct FileUploader {
    ctx: AppContext,
    state: Arc<watch::Sender<UploaderState>>,
}

impl fmt::Debug for FileUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUploader")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl FileUploader {
    #[must_use]
    pub fn new(ctx: &AppContext) -> Self {
        let (state, _rx) = watch::channel(UploaderState::default());
        Self {
            ctx: ctx.clone(),
            state: Arc::new(state),
        }
    }

    /// Check presence, size and type against the `[upload]` limits.
    pub fn validate(&self, file: Option<&UploadFile>) -> Result<(), UploadRejection> {
        let file = file.ok_or(UploadRejection::Missing)?;
        let limits = &self.ctx.config().upload;
        let size = u64::try_from(file.size()).unwrap_or(u64::MAX);
        if size > limits.max_bytes {
            return Err(UploadRejection::TooLarge {
                size,
                max_bytes: limits.max_bytes,
            });
        }
        if !limits
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed == &file.mime_type)
        {
            return Err(UploadRejection::UnsupportedType(file.mime_type.clone()));
        }
        Ok(())
    }

    /// Upload one file and attach it to `{<id_key>: id}`.
    ///
    /// Returns `None` on rejection or failure; the reason has been notified
    /// and is kept in [`last_error`](Self::last_error).
    #[instrument(skip_all, fields(id_key = %id_key, id = id))]
    pub async fn upload(
        &self,
        file: Option<&UploadFile>,
        id_key: &str,
        id: i64,
        document_type: i64,
        document_name: &str,
    ) -> Option<FileUploadResponse> {
        let file = self.accept(file)?;
        self.state.send_modify(|state| {
            state.uploading = true;
            state.progress = UploadProgress {
                uploaded: 0,
                total: 1,
                current_file: file.name.clone(),
            };
        });

        let result = self
            .transmit(file, Owner { id_key, id }, document_type, document_name)
            .await;

        self.state.send_modify(|state| {
            if result.is_some() {
                state.progress.uploaded = 1;
            }
            state.uploading = false;
        });
        result
    }

    /// Upload `files` one after another, stopping at the first failure.
    /// Returns the records created before it.
    #[instrument(skip_all, fields(id_key = %id_key, id = id, files = files.len()))]
    pub async fn upload_many(
        &self,
        files: &[FileToUpload],
        id_key: &str,
        id: i64,
    ) -> Vec<FileUploadResponse> {
        if files.is_empty() {
            return Vec::new();
        }
        self.state.send_modify(|state| {
            state.uploading = true;
            state.progress = UploadProgress {
                uploaded: 0,
                total: files.len(),
                current_file: String::new(),
            };
        });

        let owner = Owner { id_key, id };
        let mut results = Vec::with_capacity(files.len());
        for entry in files {
            let current = entry
                .file
                .as_ref()
                .map(|file| file.name.clone())
                .unwrap_or_default();
            self.state
                .send_modify(|state| state.progress.current_file = current);

            let Some(file) = self.accept(entry.file.as_ref()) else {
                break;
            };
            let Some(created) = self
                .transmit(file, owner, entry.document_type, &entry.name)
                .await
            else {
                break;
            };
            results.push(created);
            self.state.send_modify(|state| state.progress.uploaded += 1);
        }

        self.state.send_modify(|state| state.uploading = false);
        info!(uploaded = results.len(), total = files.len(), "batch upload finished");
        results
    }

    #[must_use]
    pub fn uploading(&self) -> bool {
        self.state.borrow().uploading
    }

    #[must_use]
    pub fn progress(&self) -> UploadProgress {
        self.state.borrow().progress.clone()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ClassifiedError> {
        self.state.borrow().last_error.clone()
    }

    #[must_use]
    pub fn state(&self) -> UploaderState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UploaderState> {
        self.state.subscribe()
    }

    fn accept<'f>(&self, file: Option<&'f UploadFile>) -> Option<&'f UploadFile> {
        match self.validate(file) {
            Ok(()) => file,
            Err(rejection) => {
                debug!(reason = %rejection, "file rejected");
                let message = rejection.to_string();
                self.ctx.notifier().notify(message.clone(), Severity::Error);
                self.set_error(ClassifiedError::new(message));
                None
            }
        }
    }

    async fn transmit(
        &self,
        file: &UploadFile,
        owner: Owner<'_>,
        document_type: i64,
        document_name: &str,
    ) -> Option<FileUploadResponse> {
        let target = OperationTarget::registry(UPLOAD_ENTITY, OperationMode::Create);
        let descriptor =
            match executor::resolve_or_report(&self.ctx, &target, OperationKind::Mutation) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    self.set_error(err);
                    return None;
                }
            };

        let mut input = Map::new();
        input.insert("file".to_string(), Value::Null);
        input.insert(owner.id_key.to_string(), json!(owner.id));
        input.insert("nama_dokument".to_string(), json!(document_name));
        input.insert("jenisDokumenId".to_string(), json!(document_type));
        let request = UploadRequest {
            document: descriptor.document,
            variables: json!({ "data": input }),
            file: file.clone(),
            file_path: UPLOAD_FILE_PATH.to_string(),
        };

        debug!(file = %file.name, size = file.size(), "uploading file");
        let outcome = self
            .ctx
            .transport()
            .upload(request)
            .await
            .and_then(|response| executor::unwrap_field(response, &descriptor.top_level_field))
            .and_then(|value| {
                serde_json::from_value::<FileUploadResponse>(value).map_err(GraphqlClientError::from)
            });

        match outcome {
            Ok(created) => {
                info!(id = created.id, file = %created.file_name, "file uploaded");
                self.state.send_modify(|state| state.last_error = None);
                Some(created)
            }
            Err(failure) => {
                let classified = classify_upload_failure(&failure);
                error!(
                    file = %file.name,
                    error = %classified.message,
                    code = ?classified.code,
                    "upload failed"
                );
                let message = if classified.code.as_ref().is_some_and(|code| code.is(VALIDATION_FAILED)) {
                    classified.message.clone()
                } else {
                    format!("Error: {}", classified.message)
                };
                self.ctx.notifier().show(
                    message,
                    Severity::Error,
                    self.ctx.config().error_notification_duration(),
                    false,
                );
                self.set_error(classified);
                None
            }
        }
    }

    fn set_error(&self, error: ClassifiedError) {
        self.state.send_modify(|state| state.last_error = Some(error));
    }
}

/// Error shape for uploads. Unlike the executors, a network failure without a
/// body error is coded with its status, or `BAD_REQUEST`.
fn classify_upload_failure(failure: &GraphqlClientError) -> ClassifiedError {
    let status = failure.status_code().map(ErrorCode::Status);

    if let Some(validation) = failure.network_errors().first() {
        let message = if validation.message.is_empty() {
            failure.message()
        } else {
            validation.message.clone()
        };
        let code = validation
            .extension_code()
            .map(|code| ErrorCode::Text(code.to_string()))
            .or(status);
        return ClassifiedError { message, code };
    }

    let message = Some(failure.message())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| UPLOAD_FALLBACK_MESSAGE.to_string());
    if failure.is_network() {
        let code = status.unwrap_or_else(|| ErrorCode::Text(BAD_REQUEST.to_string()));
        return ClassifiedError::new(message).with_code(code);
    }
    ClassifiedError::new(message)
}

/// Read `path` into an [`UploadFile`], guessing the MIME type from the
/// extension.
pub fn read_upload_file(path: impl AsRef<Path>) -> io::Result<UploadFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadFile::new(name, mime_for_path(path), bytes))
}

/// MIME type for a file name's extension; `application/octet-stream` when
/// the extension is unknown.
#[must_use]
pub fn mime_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
