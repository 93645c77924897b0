use async_trait::async_trait;
use serde_json::Value;

use crate::{error::Result, pass::PassType};

pub mod in_memory;
pub mod rest;

pub use in_memory::InMemoryObjectStore;
pub use rest::RestObjectStore;

/// Whether a resource is a pass class or a pass object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Class,
    Object,
}

impl ResourceKind {
    /// REST resource name, e.g. `flightClass` or `flightObject`.
    pub fn resource(self, pass_type: PassType) -> String {
        match self {
            ResourceKind::Class => pass_type.class_resource(),
            ResourceKind::Object => pass_type.object_resource(),
        }
    }

    /// Inverse of [`ResourceKind::resource`].
    pub fn from_resource(resource: &str) -> Option<(ResourceKind, PassType)> {
        PassType::ALL.iter().find_map(|&pass_type| {
            [ResourceKind::Class, ResourceKind::Object]
                .into_iter()
                .find(|kind| kind.resource(pass_type) == resource)
                .map(|kind| (kind, pass_type))
        })
    }
}

/// The wallet object store hosting pass classes and objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a resource; `Ok(None)` when it doesn't exist.
    async fn get(&self, kind: ResourceKind, pass_type: PassType, id: &str) -> Result<Option<Value>>;

    /// Create a resource. The body must carry its `id`.
    async fn insert(&self, kind: ResourceKind, pass_type: PassType, body: &Value) -> Result<Value>;

    /// Replace an existing resource with `body`.
    async fn update(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        body: &Value,
    ) -> Result<Value>;

    /// Apply patch semantics to an existing resource.
    async fn patch(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        body: &Value,
    ) -> Result<Value>;

    /// Attach a message to an existing resource. `message` is the
    /// `{"header", "body"}` record.
    async fn add_message(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        message: &Value,
    ) -> Result<Value>;

    /// Submit a `multipart/mixed` batch body built with `boundary`.
    async fn batch(&self, boundary: &str, body: String) -> Result<String>;
}
