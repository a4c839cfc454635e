//! Bookkeeping of resources the probe created on the server.

use log::debug;
use serde::Serialize;

use crate::client::item_path;
use crate::schema::ResourceKind;

/// A resource created on the target server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResource {
    pub kind: ResourceKind,
    pub id: String,
    /// Logical creation order, starting at 0
    pub sequence: u64,
}

impl TestResource {
    pub fn endpoint(&self) -> &'static str {
        self.kind.endpoint()
    }

    /// Item path, e.g. `/Users/2819c223`
    pub fn path(&self) -> String {
        item_path(self.endpoint(), &self.id)
    }
}

/// Creation-ordered registry of live test resources.
///
/// A resource is recorded as soon as the server confirms its creation and is
/// removed only once its deletion is confirmed.
#[derive(Debug, Default)]
pub struct CreationRegistry {
    resources: Vec<TestResource>,
    next_sequence: u64,
}

impl CreationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed creation. Recording the same resource twice is a no-op.
    pub fn record(&mut self, kind: ResourceKind, id: impl Into<String>) -> &TestResource {
        let id = id.into();
        let index = match self.position(kind, &id) {
            Some(index) => index,
            None => {
                let resource = TestResource {
                    kind,
                    id,
                    sequence: self.next_sequence,
                };
                debug!("Registered {} (#{})", resource.path(), resource.sequence);
                self.next_sequence += 1;
                self.resources.push(resource);
                self.resources.len() - 1
            }
        };
        &self.resources[index]
    }

    /// Forget a resource whose deletion the server confirmed
    pub fn confirm_deleted(&mut self, kind: ResourceKind, id: &str) -> Option<TestResource> {
        let index = self.position(kind, id)?;
        Some(self.resources.remove(index))
    }

    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        self.position(kind, id).is_some()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Live resources, newest first
    pub fn cleanup_order(&self) -> Vec<TestResource> {
        self.resources.iter().rev().cloned().collect()
    }

    /// Live resources in creation order
    pub fn remaining(&self) -> &[TestResource] {
        &self.resources
    }

    fn position(&self, kind: ResourceKind, id: &str) -> Option<usize> {
        self.resources
            .iter()
            .position(|r| r.kind == kind && r.id == id)
    }
}
