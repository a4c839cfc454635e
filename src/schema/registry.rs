//! Schema registry for resolving and accessing SCIM schemas.
//!
//! The registry is an immutable, versioned table built once from the embedded
//! schemas and shared read-only (typically behind an `Arc`). It maps schema
//! URNs to resource kinds and knows which extensions each kind accepts.

use super::embedded;
use super::types::{ResourceKind, Schema};
use crate::error::{ScimError, ScimResult};

use log::debug;
use std::collections::BTreeSet;
use std::fmt;

pub const USER_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_USER_URN: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
pub const AGENT_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:Agent";
pub const AGENTIC_APPLICATION_URN: &str = "urn:ietf:params:scim:schemas:core:2.0:AgenticApplication";
pub const PATCH_OP_URN: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
pub const LIST_RESPONSE_URN: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
pub const ERROR_URN: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Version of the embedded schema table
pub const SCHEMA_TABLE_VERSION: &str = "rfc7643+draft-abbey-scim-agent-extension-00";

/// A resource kind together with its core schema and permitted extensions.
#[derive(Debug, Clone)]
pub struct ResourceTypeDefinition {
    pub kind: ResourceKind,
    pub schema: Schema,
    /// URNs of extension schemas valid alongside this core schema
    pub extensions: Vec<String>,
}

impl ResourceTypeDefinition {
    pub fn core_urn(&self) -> &str {
        &self.schema.id
    }

    pub fn allows_extension(&self, urn: &str) -> bool {
        self.extensions.iter().any(|e| e == urn)
    }

    /// Whether the resource carries an `active` flag that PATCH can toggle
    pub fn has_active_flag(&self) -> bool {
        self.schema.attribute("active").is_some()
    }
}

/// Why a `schemas` URN set could not be mapped to exactly one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaResolutionError {
    #[error("'schemas' must list at least one schema URN")]
    Empty,

    #[error("no recognized core schema URN in 'schemas' (found: {})", join_urns(.urns))]
    NoCoreSchema { urns: Vec<String> },

    #[error("extension schema(s) {} listed without their core schema", join_urns(.extensions))]
    ExtensionWithoutCore { extensions: Vec<String> },

    #[error("'schemas' lists more than one core schema ({})", join_kinds(.kinds))]
    AmbiguousCoreSchemas { kinds: Vec<ResourceKind> },

    #[error("unrecognized schema URN(s) alongside {core}: {}", join_urns(.urns))]
    UnknownSchemas { core: ResourceKind, urns: Vec<String> },

    #[error("extension schema '{extension}' is not valid for resource type {core}")]
    ExtensionNotAllowed { core: ResourceKind, extension: String },
}

fn join_urns(urns: &[String]) -> String {
    urns.join(", ")
}

fn join_kinds(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(ResourceKind::name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SchemaResolutionError {
    /// The single unambiguous core kind, if the URN set named one
    pub fn best_guess(&self) -> ResourceKind {
        match self {
            Self::UnknownSchemas { core, .. } | Self::ExtensionNotAllowed { core, .. } => *core,
            _ => ResourceKind::Unknown,
        }
    }
}

/// Registry of the embedded SCIM schemas.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    definitions: Vec<ResourceTypeDefinition>,
    extensions: Vec<Schema>,
}

impl SchemaRegistry {
    /// Create a registry from the embedded schemas.
    pub fn new() -> ScimResult<Self> {
        Self::with_embedded_schemas()
    }

    pub fn with_embedded_schemas() -> ScimResult<Self> {
        let user = Self::load_schema_from_str(embedded::core_user_schema())?;
        let group = Self::load_schema_from_str(embedded::core_group_schema())?;
        let enterprise = Self::load_schema_from_str(embedded::enterprise_user_schema())?;
        let agent = Self::load_schema_from_str(embedded::core_agent_schema())?;
        let application = Self::load_schema_from_str(embedded::core_agentic_application_schema())?;

        let definitions = vec![
            ResourceTypeDefinition {
                kind: ResourceKind::User,
                schema: user,
                extensions: vec![enterprise.id.clone()],
            },
            ResourceTypeDefinition {
                kind: ResourceKind::Group,
                schema: group,
                extensions: Vec::new(),
            },
            ResourceTypeDefinition {
                kind: ResourceKind::Agent,
                schema: agent,
                extensions: Vec::new(),
            },
            ResourceTypeDefinition {
                kind: ResourceKind::AgenticApplication,
                schema: application,
                extensions: Vec::new(),
            },
        ];

        debug!(
            "Loaded {} resource type definitions ({})",
            definitions.len(),
            SCHEMA_TABLE_VERSION
        );

        Ok(Self {
            definitions,
            extensions: vec![enterprise],
        })
    }

    fn load_schema_from_str(content: &str) -> ScimResult<Schema> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn version(&self) -> &'static str {
        SCHEMA_TABLE_VERSION
    }

    /// Definition for a resource kind; `None` for [`ResourceKind::Unknown`]
    pub fn lookup(&self, kind: ResourceKind) -> Option<&ResourceTypeDefinition> {
        self.definitions.iter().find(|d| d.kind == kind)
    }

    pub fn definitions(&self) -> &[ResourceTypeDefinition] {
        &self.definitions
    }

    /// Any registered schema, core or extension, by URN
    pub fn schema(&self, urn: &str) -> Option<&Schema> {
        self.definitions
            .iter()
            .map(|d| &d.schema)
            .chain(self.extensions.iter())
            .find(|s| s.id == urn)
    }

    /// Schema by URN, as an error when absent
    pub fn require_schema(&self, urn: &str) -> ScimResult<&Schema> {
        self.schema(urn).ok_or_else(|| ScimError::SchemaNotFound {
            schema_id: urn.to_string(),
        })
    }

    pub fn extension(&self, urn: &str) -> Option<&Schema> {
        self.extensions.iter().find(|s| s.id == urn)
    }

    fn core_kind(&self, urn: &str) -> Option<ResourceKind> {
        self.definitions
            .iter()
            .find(|d| d.core_urn() == urn)
            .map(|d| d.kind)
    }

    /// Map the URNs of a `schemas` attribute to exactly one resource kind.
    ///
    /// The core URN decides the kind. Extension URNs are accepted only with
    /// the core schema they extend.
    pub fn resolve_resource_type<S: AsRef<str>>(
        &self,
        urns: &[S],
    ) -> Result<ResourceKind, SchemaResolutionError> {
        if urns.is_empty() {
            return Err(SchemaResolutionError::Empty);
        }

        let mut cores = BTreeSet::new();
        let mut extensions = Vec::new();
        let mut unknown = Vec::new();

        for urn in urns {
            let urn = urn.as_ref();
            if let Some(kind) = self.core_kind(urn) {
                cores.insert(kind);
            } else if self.extension(urn).is_some() {
                extensions.push(urn.to_string());
            } else {
                unknown.push(urn.to_string());
            }
        }

        let core = match cores.len() {
            0 if !extensions.is_empty() && unknown.is_empty() => {
                return Err(SchemaResolutionError::ExtensionWithoutCore { extensions });
            }
            0 => {
                let mut urns = unknown;
                urns.extend(extensions);
                return Err(SchemaResolutionError::NoCoreSchema { urns });
            }
            1 => cores.into_iter().next().unwrap_or(ResourceKind::Unknown),
            _ => {
                return Err(SchemaResolutionError::AmbiguousCoreSchemas {
                    kinds: cores.into_iter().collect(),
                });
            }
        };

        if !unknown.is_empty() {
            return Err(SchemaResolutionError::UnknownSchemas { core, urns: unknown });
        }

        if let Some(definition) = self.lookup(core) {
            if let Some(extension) = extensions.into_iter().find(|e| !definition.allows_extension(e)) {
                return Err(SchemaResolutionError::ExtensionNotAllowed { core, extension });
            }
        }

        Ok(core)
    }
}

impl fmt::Display for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SchemaRegistry({} types, version {})",
            self.definitions.len(),
            SCHEMA_TABLE_VERSION
        )
    }
}
