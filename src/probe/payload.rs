//! Payloads for probe requests.
//!
//! Every generated name carries the configured prefix plus a random 8-hex
//! suffix, so probe resources can be told apart from real data and found
//! again for manual removal.

use serde_json::{Value, json};
use uuid::Uuid;

use crate::schema::{AGENT_URN, AGENTIC_APPLICATION_URN, GROUP_URN, ResourceKind, USER_URN};
use crate::validator::{PatchDocument, PatchOperation};

#[derive(Debug, Clone)]
pub struct PayloadFactory {
    prefix: String,
}

impl PayloadFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    pub fn user(&self) -> Value {
        let suffix = Self::suffix();
        let address = format!("{}{}@example.com", self.prefix, suffix);
        json!({
            "schemas": [USER_URN],
            "userName": address,
            "name": {
                "givenName": "SCIMSanity",
                "familyName": format!("Test-{}", suffix)
            },
            "displayName": format!("SCIM Sanity Test User {}", suffix),
            "active": true,
            "emails": [{
                "value": address,
                "type": "work",
                "primary": true
            }]
        })
    }

    /// Group with the given member ids
    pub fn group(&self, members: &[&str]) -> Value {
        let mut group = json!({
            "schemas": [GROUP_URN],
            "displayName": format!("{}group-{}", self.prefix, Self::suffix())
        });
        if !members.is_empty() {
            group["members"] = members.iter().map(|id| json!({"value": id})).collect();
        }
        group
    }

    pub fn agent(&self) -> Value {
        let suffix = Self::suffix();
        json!({
            "schemas": [AGENT_URN],
            "name": format!("{}agent-{}", self.prefix, suffix),
            "displayName": format!("SCIM Sanity Test Agent {}", suffix),
            "active": true
        })
    }

    pub fn agentic_application(&self) -> Value {
        let suffix = Self::suffix();
        json!({
            "schemas": [AGENTIC_APPLICATION_URN],
            "name": format!("{}app-{}", self.prefix, suffix),
            "displayName": format!("SCIM Sanity Test App {}", suffix),
            "active": true
        })
    }

    /// Creation payload for a lifecycle phase. Groups are created empty.
    pub fn for_kind(&self, kind: ResourceKind) -> Option<Value> {
        match kind {
            ResourceKind::User => Some(self.user()),
            ResourceKind::Group => Some(self.group(&[])),
            ResourceKind::Agent => Some(self.agent()),
            ResourceKind::AgenticApplication => Some(self.agentic_application()),
            ResourceKind::Unknown => None,
        }
    }

    pub fn patch(operations: Vec<PatchOperation>) -> Value {
        PatchDocument::new(operations).to_value()
    }
}
