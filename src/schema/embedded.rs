//! Embedded SCIM schemas.
//!
//! The core User and Group schemas and the enterprise User extension follow
//! RFC 7643. Agent and AgenticApplication follow
//! draft-abbey-scim-agent-extension-00. Attribute fields that match the
//! defaults (`multiValued: false`, `required: false`, `mutability: readWrite`,
//! `returned: default`) are omitted.

/// Returns the core User schema as a JSON string.
pub fn core_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:User",
  "name": "User",
  "description": "User Account",
  "attributes": [
    {"name": "userName", "type": "string", "required": true},
    {"name": "name", "type": "complex", "subAttributes": [
      {"name": "formatted", "type": "string"},
      {"name": "familyName", "type": "string"},
      {"name": "givenName", "type": "string"},
      {"name": "middleName", "type": "string"},
      {"name": "honorificPrefix", "type": "string"},
      {"name": "honorificSuffix", "type": "string"}
    ]},
    {"name": "displayName", "type": "string"},
    {"name": "nickName", "type": "string"},
    {"name": "profileUrl", "type": "reference"},
    {"name": "title", "type": "string"},
    {"name": "userType", "type": "string"},
    {"name": "preferredLanguage", "type": "string"},
    {"name": "locale", "type": "string"},
    {"name": "timezone", "type": "string"},
    {"name": "active", "type": "boolean"},
    {"name": "password", "type": "string", "mutability": "writeOnly", "returned": "never"},
    {"name": "emails", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "string"},
      {"name": "display", "type": "string"},
      {"name": "type", "type": "string", "canonicalValues": ["work", "home", "other"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "phoneNumbers", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "string"},
      {"name": "display", "type": "string"},
      {"name": "type", "type": "string", "canonicalValues": ["work", "home", "mobile", "fax", "pager", "other"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "ims", "type": "complex", "multiValued": true},
    {"name": "photos", "type": "complex", "multiValued": true},
    {"name": "addresses", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "formatted", "type": "string"},
      {"name": "streetAddress", "type": "string"},
      {"name": "locality", "type": "string"},
      {"name": "region", "type": "string"},
      {"name": "postalCode", "type": "string"},
      {"name": "country", "type": "string"},
      {"name": "type", "type": "string", "canonicalValues": ["work", "home", "other"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "groups", "type": "complex", "multiValued": true, "mutability": "readOnly"},
    {"name": "entitlements", "type": "complex", "multiValued": true},
    {"name": "roles", "type": "complex", "multiValued": true},
    {"name": "x509Certificates", "type": "complex", "multiValued": true},
    {"name": "id", "type": "string", "mutability": "readOnly", "returned": "always"},
    {"name": "externalId", "type": "string"},
    {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "resourceType", "type": "string", "mutability": "readOnly"},
      {"name": "created", "type": "dateTime", "mutability": "readOnly"},
      {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
      {"name": "location", "type": "reference", "mutability": "readOnly"},
      {"name": "version", "type": "string", "mutability": "readOnly"}
    ]}
  ]
}"#
}

/// Returns the core Group schema as a JSON string.
pub fn core_group_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Group",
  "name": "Group",
  "description": "Group",
  "attributes": [
    {"name": "displayName", "type": "string", "required": true},
    {"name": "members", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "string"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "type", "type": "string", "canonicalValues": ["User", "Group"]},
      {"name": "display", "type": "string"}
    ]},
    {"name": "id", "type": "string", "mutability": "readOnly", "returned": "always"},
    {"name": "externalId", "type": "string"},
    {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "resourceType", "type": "string", "mutability": "readOnly"},
      {"name": "created", "type": "dateTime", "mutability": "readOnly"},
      {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
      {"name": "location", "type": "reference", "mutability": "readOnly"},
      {"name": "version", "type": "string", "mutability": "readOnly"}
    ]}
  ]
}"#
}

/// Returns the enterprise User extension schema as a JSON string.
pub fn enterprise_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
  "name": "EnterpriseUser",
  "description": "Enterprise User",
  "attributes": [
    {"name": "employeeNumber", "type": "string"},
    {"name": "costCenter", "type": "string"},
    {"name": "organization", "type": "string"},
    {"name": "division", "type": "string"},
    {"name": "department", "type": "string"},
    {"name": "manager", "type": "complex", "subAttributes": [
      {"name": "value", "type": "string"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "displayName", "type": "string"}
    ]}
  ]
}"#
}

/// Returns the Agent schema (draft-abbey-scim-agent-extension-00) as a JSON string.
pub fn core_agent_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Agent",
  "name": "Agent",
  "description": "An AI agent",
  "attributes": [
    {"name": "name", "type": "string", "required": true},
    {"name": "displayName", "type": "string"},
    {"name": "agentType", "type": "string"},
    {"name": "active", "type": "boolean"},
    {"name": "description", "type": "string"},
    {"name": "subject", "type": "string", "mutability": "readOnly"},
    {"name": "groups", "type": "complex", "multiValued": true, "mutability": "readOnly", "subAttributes": [
      {"name": "value", "type": "string", "mutability": "readOnly"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "display", "type": "string", "mutability": "readOnly"},
      {"name": "type", "type": "string", "mutability": "readOnly"}
    ]},
    {"name": "entitlements", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "string"},
      {"name": "display", "type": "string"},
      {"name": "type", "type": "string"},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "roles", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "string"},
      {"name": "display", "type": "string"},
      {"name": "type", "type": "string"},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "x509Certificates", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "binary"},
      {"name": "display", "type": "string"},
      {"name": "type", "type": "string"},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "applications", "type": "complex", "multiValued": true, "mutability": "readOnly", "subAttributes": [
      {"name": "value", "type": "string", "mutability": "readOnly"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "display", "type": "string", "mutability": "readOnly"}
    ]},
    {"name": "owners", "type": "complex", "multiValued": true, "mutability": "readOnly", "subAttributes": [
      {"name": "value", "type": "string", "mutability": "readOnly"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "display", "type": "string", "mutability": "readOnly"}
    ]},
    {"name": "protocols", "type": "complex", "multiValued": true, "mutability": "readOnly", "subAttributes": [
      {"name": "type", "type": "string", "mutability": "readOnly"},
      {"name": "specificationUrl", "type": "reference", "mutability": "readOnly"}
    ]},
    {"name": "parent", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "value", "type": "string", "mutability": "readOnly"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "display", "type": "string", "mutability": "readOnly"}
    ]},
    {"name": "id", "type": "string", "mutability": "readOnly", "returned": "always"},
    {"name": "externalId", "type": "string"},
    {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "resourceType", "type": "string", "mutability": "readOnly"},
      {"name": "created", "type": "dateTime", "mutability": "readOnly"},
      {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
      {"name": "location", "type": "reference", "mutability": "readOnly"},
      {"name": "version", "type": "string", "mutability": "readOnly"}
    ]}
  ]
}"#
}

/// Returns the AgenticApplication schema as a JSON string.
pub fn core_agentic_application_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:AgenticApplication",
  "name": "AgenticApplication",
  "description": "An agentic application",
  "attributes": [
    {"name": "name", "type": "string", "required": true},
    {"name": "displayName", "type": "string"},
    {"name": "description", "type": "string"},
    {"name": "active", "type": "boolean"},
    {"name": "id", "type": "string", "mutability": "readOnly", "returned": "always"},
    {"name": "externalId", "type": "string"},
    {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "resourceType", "type": "string", "mutability": "readOnly"},
      {"name": "created", "type": "dateTime", "mutability": "readOnly"},
      {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
      {"name": "location", "type": "reference", "mutability": "readOnly"},
      {"name": "version", "type": "string", "mutability": "readOnly"}
    ]}
  ]
}"#
}
