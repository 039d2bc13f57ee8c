//! Application context: the single owner of shared client state.

use std::fmt;
use std::sync::Arc;

use kontrak_graphql::{GraphqlClient, GraphqlClientError, GraphqlTransport};
use serde_json::Value;
use tracing::{debug, info};

use crate::classify::ErrorClassifier;
use crate::config::{ClientConfig, ConfigError};
use crate::confirm::ConfirmDialog;
use crate::guard::{RedirectStore, RouteGuard};
use crate::loading::LoadingIndicator;
use crate::mutation::{MutationExecutor, MutationOptions};
use crate::navigation::Navigator;
use crate::notification::Notifier;
use crate::query::{QueryExecutor, QueryOptions};
use crate::registry::{OperationRegistry, OperationTarget, RegistryError};
use crate::session::{FileSessionStorage, SessionError, SessionStore};

/// Context construction failure.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to build GraphQL transport: {0}")]
    Transport(#[from] GraphqlClientError),
}

struct ContextInner {
    config: ClientConfig,
    transport: Arc<dyn GraphqlTransport>,
    registry: Arc<OperationRegistry>,
    loading: LoadingIndicator,
    notifier: Notifier,
    confirm: ConfirmDialog,
    session: SessionStore,
    navigator: Navigator,
    redirects: RedirectStore,
    classifier: ErrorClassifier,
}

/// Cloneable handle to the client's shared state.
///
/// Build one per process with [`AppContext::builder`] and pass it to every
/// executor. [`AppContext::shutdown`] cancels the timers it owns.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("endpoint", &self.inner.config.endpoint)
            .field("entities", &self.inner.registry.len())
            .field("authenticated", &self.inner.session.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    #[must_use]
    pub fn builder(config: ClientConfig) -> AppContextBuilder {
        AppContextBuilder::new(config)
    }

    /// Context with every collaborator derived from `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self, ContextError> {
        Self::builder(config).build()
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn GraphqlTransport> {
        &self.inner.transport
    }

    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn loading(&self) -> &LoadingIndicator {
        &self.inner.loading
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn confirm(&self) -> &ConfirmDialog {
        &self.inner.confirm
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }

    #[must_use]
    pub fn redirects(&self) -> &RedirectStore {
        &self.inner.redirects
    }

    #[must_use]
    pub fn classifier(&self) -> &ErrorClassifier {
        &self.inner.classifier
    }

    #[must_use]
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(
            self.inner.session.clone(),
            self.inner.redirects.clone(),
            self.inner.navigator.clone(),
        )
    }

    /// Query executor for `target`.
    #[must_use]
    pub fn query(
        &self,
        target: OperationTarget,
        variables: Value,
        options: QueryOptions,
    ) -> QueryExecutor {
        QueryExecutor::new(self, target, variables, options)
    }

    /// Mutation executor for `target`.
    #[must_use]
    pub fn mutation(&self, target: OperationTarget, options: MutationOptions) -> MutationExecutor {
        MutationExecutor::new(self, target, options)
    }

    /// Cancel owned timers.
    pub fn shutdown(&self) {
        self.inner.loading.shutdown();
        self.inner.notifier.shutdown();
        debug!("context shut down");
    }
}

/// Builder for [`AppContext`]. Collaborators not supplied are derived from
/// the configuration.
pub struct AppContextBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn GraphqlTransport>>,
    registry: Option<OperationRegistry>,
    session: Option<SessionStore>,
}

impl fmt::Debug for AppContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContextBuilder")
            .field("config", &self.config)
            .field("transport", &self.transport.is_some())
            .field("registry", &self.registry.is_some())
            .field("session", &self.session.is_some())
            .finish()
    }
}

impl AppContextBuilder {
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            registry: None,
            session: None,
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn GraphqlTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Result<AppContext, ContextError> {
        let config = self.config;
        config.validate()?;

        let registry = match (self.registry, &config.registry.path) {
            (Some(registry), _) => registry,
            (None, Some(path)) => OperationRegistry::load(path)?,
            (None, None) => OperationRegistry::builtin()?,
        };

        let session = match (self.session, &config.session.storage_path) {
            (Some(session), _) => session,
            (None, Some(path)) => SessionStore::restore(Arc::new(FileSessionStorage::new(path)))?,
            (None, None) => SessionStore::in_memory(),
        };

        let transport: Arc<dyn GraphqlTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                GraphqlClient::builder(config.endpoint.clone())
                    .with_service_name(config.service_name.clone())
                    .with_timeout(config.timeout())
                    .with_credentials(Arc::new(session.clone()))
                    .build()?,
            ),
        };

        let navigator = Navigator::new();
        let notifier = Notifier::new(config.default_notification_duration());
        let classifier = ErrorClassifier::new(
            session.clone(),
            notifier.clone(),
            navigator.clone(),
            config.session_expired_duration(),
        );

        info!(
            endpoint = %config.endpoint,
            entities = registry.len(),
            authenticated = session.is_authenticated(),
            "client context ready"
        );

        Ok(AppContext {
            inner: Arc::new(ContextInner {
                loading: LoadingIndicator::new(config.hide_delay()),
                transport,
                registry: Arc::new(registry),
                notifier,
                confirm: ConfirmDialog::new(),
                session,
                navigator,
                redirects: RedirectStore::new(),
                classifier,
                config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_http_context() {
        let ctx = AppContext::from_config(ClientConfig::default()).expect("context");
        assert!(ctx.registry().document("termin", crate::OperationMode::Get).is_some());
        assert!(!ctx.session().is_authenticated());
        assert_eq!(ctx.config().endpoint, crate::config::DEFAULT_ENDPOINT);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClientConfig {
            endpoint: String::new(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            AppContext::from_config(config),
            Err(ContextError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn missing_registry_file_is_reported() {
        let mut config = ClientConfig::default();
        config.registry.path = Some("/nonexistent/kontrak-registry.toml".into());
        assert!(matches!(
            AppContext::from_config(config),
            Err(ContextError::Registry(RegistryError::Io { .. }))
        ));
    }

    #[test]
    fn session_is_restored_from_storage_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        SessionStore::restore(Arc::new(FileSessionStorage::new(&path)))
            .expect("restore")
            .set_token("persisted")
            .expect("save");

        let mut config = ClientConfig::default();
        config.session.storage_path = Some(path);
        let ctx = AppContext::from_config(config).expect("context");
        assert_eq!(ctx.session().token().as_deref(), Some("persisted"));
    }
}
