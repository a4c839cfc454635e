//! Core schema type definitions for SCIM resources.
//!
//! This module contains the data structures that describe SCIM schemas and
//! their attribute characteristics as specified in RFC 7643, plus the closed
//! set of resource kinds the crate knows how to validate and probe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScimError;

/// A SCIM schema definition.
///
/// Each schema defines the attributes of a core resource type such as User or
/// Group, or of an extension such as the enterprise User extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URN)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// Attribute definitions, in declaration order
    pub attributes: Vec<AttributeDefinition>,
}

impl Schema {
    /// Find a top-level attribute. SCIM attribute names are case-insensitive.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        find_attribute(&self.attributes, name)
    }

    /// Attributes a client must supply
    pub fn required_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.iter().filter(|a| a.required)
    }

    /// Attributes that a server must never return (`returned: never`)
    pub fn never_returned(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes
            .iter()
            .filter(|a| a.returned == Returned::Never)
    }
}

/// Definition of a SCIM attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    #[serde(rename = "multiValued", default)]
    pub multi_valued: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub returned: Returned,
    /// Suggested values for string attributes (informational)
    #[serde(rename = "canonicalValues", default, skip_serializing_if = "Vec::is_empty")]
    pub canonical_values: Vec<String>,
    /// Sub-attributes for complex types
    #[serde(rename = "subAttributes", default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<AttributeDefinition>,
}

impl AttributeDefinition {
    pub fn is_complex(&self) -> bool {
        self.data_type == AttributeType::Complex
    }

    /// Whether a client may supply this attribute in a full resource
    pub fn is_client_writable(&self) -> bool {
        matches!(self.mutability, Mutability::ReadWrite | Mutability::WriteOnly)
    }

    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        find_attribute(&self.sub_attributes, name)
    }
}

fn find_attribute<'a>(
    attributes: &'a [AttributeDefinition],
    name: &str,
) -> Option<&'a AttributeDefinition> {
    attributes
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
}

/// SCIM attribute data types used by the embedded schemas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    #[default]
    String,
    Boolean,
    /// Complex attribute with sub-attributes
    Complex,
    /// URI reference
    Reference,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Managed by the server
    ReadOnly,
    #[default]
    ReadWrite,
    /// Set once by the server, never modified by clients
    Immutable,
    /// Accepted from clients but never returned (passwords)
    WriteOnly,
}

impl Mutability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "readOnly",
            Self::ReadWrite => "readWrite",
            Self::Immutable => "immutable",
            Self::WriteOnly => "writeOnly",
        }
    }
}

/// When an attribute appears in responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    Always,
    Never,
    #[default]
    Default,
    Request,
}

/// The closed set of resource types this crate validates and probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    User,
    Group,
    Agent,
    AgenticApplication,
    /// Could not be determined from the `schemas` attribute
    Unknown,
}

impl ResourceKind {
    /// Probed resource kinds, in lifecycle order
    pub const PROBED: [ResourceKind; 4] = [
        ResourceKind::User,
        ResourceKind::Group,
        ResourceKind::Agent,
        ResourceKind::AgenticApplication,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Agent => "Agent",
            Self::AgenticApplication => "AgenticApplication",
            Self::Unknown => "Unknown",
        }
    }

    /// Collection endpoint relative to the SCIM base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::User => "/Users",
            Self::Group => "/Groups",
            Self::Agent => "/Agents",
            Self::AgenticApplication => "/AgenticApplications",
            Self::Unknown => "",
        }
    }

    /// Case-insensitive lookup by resource type name (as used in /ResourceTypes)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::PROBED
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = ScimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            ScimError::configuration(format!(
                "unknown resource type '{}'; expected one of User, Group, Agent, AgenticApplication",
                s
            ))
        })
    }
}
