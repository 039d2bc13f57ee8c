//! Document number generation (`nomor_dokumen.create`).

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::classify::ClassifiedError;
use crate::context::AppContext;
use crate::mutation::{MutationExecutor, MutationOptions};
use crate::registry::{OperationMode, OperationTarget};

const NUMBERING_ENTITY: &str = "nomor_dokumen";

/// Success notification of [`DocumentNumberGenerator::generate`].
pub const DOCUMENT_NUMBER_MESSAGE: &str = "Document number generated";

/// Parameters of one generated number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentNumberRequest {
    pub jenis_nomor_id: i64,
    /// Falls back to the session's scoped unit.
    pub unit_id: Option<i64>,
    /// ISO date or `yyyy-mm-dd`.
    pub tanggal: Option<String>,
}

impl DocumentNumberRequest {
    #[must_use]
    pub fn new(jenis_nomor_id: i64) -> Self {
        Self {
            jenis_nomor_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_unit(mut self, unit_id: i64) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    #[must_use]
    pub fn with_tanggal(mut self, tanggal: impl Into<String>) -> Self {
        self.tanggal = Some(tanggal.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentNumberError {
    #[error("jenis_nomor_id is required")]
    MissingJenisNomor,

    #[error("unit id was not given and the session has no scoped unit")]
    MissingUnit,

    #[error(transparent)]
    Failed(#[from] ClassifiedError),
}

/// Generates and stores document numbers.
#[derive(Debug, Clone)]
pub struct DocumentNumberGenerator {
    ctx: AppContext,
    mutation: MutationExecutor,
}

impl DocumentNumberGenerator {
    #[must_use]
    pub fn new(ctx: &AppContext) -> Self {
        let mutation = MutationExecutor::new(
            ctx,
            OperationTarget::registry(NUMBERING_ENTITY, OperationMode::Create),
            MutationOptions::default().with_success_message(DOCUMENT_NUMBER_MESSAGE),
        );
        Self {
            ctx: ctx.clone(),
            mutation,
        }
    }

    /// Create the next number for `request`. Returns the created record.
    pub async fn generate(
        &self,
        request: &DocumentNumberRequest,
    ) -> Result<Option<Value>, DocumentNumberError> {
        let variables = self.variables(request)?;
        debug!(variables = %variables, "generating document number");
        Ok(self.mutation.execute(variables).await?)
    }

    /// Last generated record.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        self.mutation.data()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.mutation.loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<ClassifiedError> {
        self.mutation.error()
    }

    fn variables(&self, request: &DocumentNumberRequest) -> Result<Value, DocumentNumberError> {
        if request.jenis_nomor_id == 0 {
            return Err(DocumentNumberError::MissingJenisNomor);
        }
        let unit_id = request
            .unit_id
            .or_else(|| self.ctx.session().active_user().scoped_unit_id())
            .ok_or(DocumentNumberError::MissingUnit)?;

        let mut variables = Map::new();
        variables.insert("jenisNomorId".to_string(), json!(request.jenis_nomor_id));
        variables.insert("unitId".to_string(), json!(unit_id));
        if let Some(tanggal) = request.tanggal.as_deref().filter(|t| !t.is_empty()) {
            variables.insert("tanggal".to_string(), json!(tanggal));
        }
        Ok(Value::Object(variables))
    }
}
