//! Operation registry: `entity -> {mode -> document}`.
//!
//! The registry is loaded once (from TOML or the built-in catalog) and is
//! read-only afterwards. [`OperationRegistry::resolve`] turns an
//! [`OperationTarget`] into a compiled [`OperationDescriptor`] without side
//! effects.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kontrak_graphql::{DocumentError, GraphqlDocument, OperationKind};
use serde::{Deserialize, Serialize};

const BUILTIN_CATALOG: &str = include_str!("../registry/default.toml");

/// Registry mode of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Get,
    First,
    Create,
    Update,
    Delete,
    Upsert,
}

impl OperationMode {
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::First,
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Upsert,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::First => "first",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upsert => "upsert",
        }
    }

    /// Operation kind an executor for this mode runs.
    #[must_use]
    pub const fn kind(self) -> OperationKind {
        match self {
            Self::Get | Self::First => OperationKind::Query,
            Self::Create | Self::Update | Self::Delete | Self::Upsert => OperationKind::Mutation,
        }
    }

    #[must_use]
    pub const fn is_query(self) -> bool {
        matches!(self.kind(), OperationKind::Query)
    }

    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self.kind(), OperationKind::Mutation)
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationMode {
    type Err = ResolveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| ResolveError::InvalidMode(value.to_string()))
    }
}

/// What an executor should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTarget {
    /// Registry lookup.
    Registry { entity: String, mode: OperationMode },
    /// Document source supplied directly by the caller.
    Raw(String),
}

impl OperationTarget {
    #[must_use]
    pub fn registry(entity: impl Into<String>, mode: OperationMode) -> Self {
        Self::Registry {
            entity: entity.into(),
            mode,
        }
    }

    #[must_use]
    pub fn raw(source: impl Into<String>) -> Self {
        Self::Raw(source.into())
    }

    /// Registry mode, `None` for raw documents.
    #[must_use]
    pub const fn mode(&self) -> Option<OperationMode> {
        match self {
            Self::Registry { mode, .. } => Some(*mode),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry { entity, mode } => write!(f, "{entity}.{mode}"),
            Self::Raw(_) => f.write_str("<raw document>"),
        }
    }
}

/// A resolved, compiled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub document: GraphqlDocument,
    pub top_level_field: String,
    pub mode: Option<OperationMode>,
}

/// Why a target could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("entity `{entity}` has no `{mode}` operation")]
    UnknownMode { entity: String, mode: String },

    #[error("unknown operation mode `{0}`")]
    InvalidMode(String),

    #[error("operation `{0}` has an empty document")]
    EmptyDocument(String),

    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),

    #[error("cannot determine the top-level field of the document")]
    NoTopLevelField,

    #[error("expected a {expected} document, found a {found}")]
    WrongKind {
        expected: OperationKind,
        found: OperationKind,
    },

    #[error("mode `{mode}` cannot run as a {kind}")]
    ModeNotAllowed {
        mode: OperationMode,
        kind: OperationKind,
    },
}

/// Registry load failure.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid registry TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("entity `{entity}`: {source}")]
    Mode {
        entity: String,
        #[source]
        source: ResolveError,
    },
}

type EntityOperations = BTreeMap<OperationMode, String>;

/// Read-only catalog of operation documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationRegistry {
    entities: BTreeMap<String, EntityOperations>,
}

impl OperationRegistry {
    pub fn from_toml_str(input: &str) -> Result<Self, RegistryError> {
        let raw: BTreeMap<String, BTreeMap<String, String>> = toml::from_str(input)?;
        let mut entities = BTreeMap::new();
        for (entity, operations) in raw {
            let mut typed = EntityOperations::new();
            for (mode, source) in operations {
                let mode = mode.parse().map_err(|source| RegistryError::Mode {
                    entity: entity.clone(),
                    source,
                })?;
                typed.insert(mode, source);
            }
            entities.insert(entity, typed);
        }
        Ok(Self { entities })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Raw document source for `entity.mode`.
    #[must_use]
    pub fn document(&self, entity: &str, mode: OperationMode) -> Option<&str> {
        self.entities
            .get(entity)
            .and_then(|ops| ops.get(&mode))
            .map(String::as_str)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Modes registered for `entity`, including empty ones.
    pub fn modes(&self, entity: &str) -> impl Iterator<Item = OperationMode> + '_ {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|ops| ops.keys().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Compile `target` for an executor of kind `expected`.
    pub fn resolve(
        &self,
        target: &OperationTarget,
        expected: OperationKind,
    ) -> Result<OperationDescriptor, ResolveError> {
        let (source, mode) = match target {
            OperationTarget::Registry { entity, mode } => {
                if mode.kind() != expected {
                    return Err(ResolveError::ModeNotAllowed {
                        mode: *mode,
                        kind: expected,
                    });
                }
                let operations = self
                    .entities
                    .get(entity)
                    .ok_or_else(|| ResolveError::UnknownEntity(entity.clone()))?;
                let source = operations.get(mode).ok_or_else(|| ResolveError::UnknownMode {
                    entity: entity.clone(),
                    mode: mode.to_string(),
                })?;
                if source.trim().is_empty() {
                    return Err(ResolveError::EmptyDocument(target.to_string()));
                }
                (source.as_str(), Some(*mode))
            }
            OperationTarget::Raw(source) => (source.as_str(), None),
        };

        let document = GraphqlDocument::parse(source)?;
        if document.kind() != expected {
            return Err(ResolveError::WrongKind {
                expected,
                found: document.kind(),
            });
        }
        let top_level_field = document
            .top_level_field()
            .ok_or(ResolveError::NoTopLevelField)?
            .to_string();

        Ok(OperationDescriptor {
            document,
            top_level_field,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> OperationRegistry {
        OperationRegistry::builtin().expect("built-in catalog parses")
    }

    #[test]
    fn builtin_catalog_lists_entities() {
        let registry = builtin();
        let entities: Vec<_> = registry.entities().collect();
        for entity in [
            "dokument",
            "kontrak",
            "nomor_dokumen",
            "paket_pengadaan",
            "permission",
            "permission_resolver",
            "sub_sub_unit",
            "termin",
        ] {
            assert!(entities.contains(&entity), "missing {entity}");
        }
    }

    #[test]
    fn every_builtin_document_resolves() {
        let registry = builtin();
        for entity in registry.entities() {
            for mode in registry.modes(entity) {
                let source = registry.document(entity, mode).unwrap_or_default();
                if source.trim().is_empty() {
                    continue;
                }
                let target = OperationTarget::registry(entity, mode);
                let descriptor = registry
                    .resolve(&target, mode.kind())
                    .unwrap_or_else(|err| panic!("{target}: {err}"));
                assert!(!descriptor.top_level_field.is_empty());
            }
        }
    }

    #[test]
    fn builtin_covers_contract_lifecycle_and_accounts() {
        let registry = builtin();
        let field = |entity: &str, mode: OperationMode| {
            registry
                .resolve(&OperationTarget::registry(entity, mode), mode.kind())
                .map(|descriptor| descriptor.top_level_field)
        };
        assert_eq!(
            field("kontrak_progress", OperationMode::First).as_deref(),
            Ok("getKontrakProgress")
        );
        assert_eq!(
            field("kontrak_pembayaran", OperationMode::Delete).as_deref(),
            Ok("deleteKontrakPembayaran")
        );
        assert_eq!(field("sign_in", OperationMode::Upsert).as_deref(), Ok("signIn"));
        assert_eq!(field("me", OperationMode::First).as_deref(), Ok("me"));
        assert_eq!(
            field("menu_by_role", OperationMode::Get).as_deref(),
            Ok("getMenuByRole")
        );
        assert!(matches!(
            field("kontrak_verifikasi", OperationMode::First),
            Err(ResolveError::UnknownMode { .. })
        ));
    }

    #[test]
    fn resolves_registry_query() {
        let descriptor = builtin()
            .resolve(
                &OperationTarget::registry("termin", OperationMode::Get),
                OperationKind::Query,
            )
            .expect("resolves");
        assert_eq!(descriptor.top_level_field, "getAllTermin");
        assert_eq!(descriptor.mode, Some(OperationMode::Get));
        assert_eq!(descriptor.document.operation_name(), Some("GetAllTermin"));
    }

    #[test]
    fn unknown_entity_and_mode() {
        let registry = builtin();
        assert_eq!(
            registry.resolve(
                &OperationTarget::registry("nope", OperationMode::Get),
                OperationKind::Query
            ),
            Err(ResolveError::UnknownEntity("nope".to_string()))
        );
        assert!(matches!(
            registry.resolve(
                &OperationTarget::registry("permission_resolver", OperationMode::First),
                OperationKind::Query
            ),
            Err(ResolveError::UnknownMode { .. })
        ));
    }

    #[test]
    fn placeholder_documents_are_rejected() {
        assert_eq!(
            builtin().resolve(
                &OperationTarget::registry("permission", OperationMode::Create),
                OperationKind::Mutation
            ),
            Err(ResolveError::EmptyDocument("permission.create".to_string()))
        );
    }

    #[test]
    fn mode_must_match_executor() {
        assert_eq!(
            builtin().resolve(
                &OperationTarget::registry("termin", OperationMode::Delete),
                OperationKind::Query
            ),
            Err(ResolveError::ModeNotAllowed {
                mode: OperationMode::Delete,
                kind: OperationKind::Query,
            })
        );
    }

    #[test]
    fn raw_document_kind_must_match() {
        let registry = OperationRegistry::default();
        let err = registry
            .resolve(
                &OperationTarget::raw("mutation { deleteThing(id: 1) }"),
                OperationKind::Query,
            )
            .expect_err("kind mismatch");
        assert_eq!(
            err,
            ResolveError::WrongKind {
                expected: OperationKind::Query,
                found: OperationKind::Mutation,
            }
        );

        let descriptor = registry
            .resolve(
                &OperationTarget::raw("query Foo { bar(id: 1) { x } }"),
                OperationKind::Query,
            )
            .expect("raw query");
        assert_eq!(descriptor.top_level_field, "bar");
        assert_eq!(descriptor.mode, None);
    }

    #[test]
    fn malformed_raw_document() {
        assert!(matches!(
            OperationRegistry::default()
                .resolve(&OperationTarget::raw("not graphql"), OperationKind::Query),
            Err(ResolveError::Document(_))
        ));
    }

    #[test]
    fn custom_toml_registry() {
        let registry = OperationRegistry::from_toml_str(
            r#"
            [widget]
            get = "query { listWidgets { data { id } total } }"
            upsert = "mutation Save($data: WidgetInput!) { saveWidget(data: $data) { id } }"
            "#,
        )
        .expect("parses");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.modes("widget").count(), 2);
        let descriptor = registry
            .resolve(
                &OperationTarget::registry("widget", OperationMode::Upsert),
                OperationKind::Mutation,
            )
            .expect("resolves");
        assert_eq!(descriptor.top_level_field, "saveWidget");
    }

    #[test]
    fn unknown_mode_key_is_rejected() {
        assert!(matches!(
            OperationRegistry::from_toml_str("[widget]\nlist = \"query { a }\"\n"),
            Err(RegistryError::Mode { entity, source: ResolveError::InvalidMode(_) }) if entity == "widget"
        ));
        assert!(matches!(
            OperationRegistry::from_toml_str("widget = 3"),
            Err(RegistryError::Toml(_))
        ));
    }

    #[test]
    fn mode_parses_from_str() {
        assert_eq!("first".parse::<OperationMode>(), Ok(OperationMode::First));
        assert_eq!(
            "list".parse::<OperationMode>(),
            Err(ResolveError::InvalidMode("list".to_string()))
        );
        assert!(OperationMode::Upsert.is_mutation());
        assert!(OperationMode::First.is_query());
    }
}
