use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    batch::parse_batch_body,
    error::{Result, WalletError},
    object_store::{ObjectStore, ResourceKind},
    pass::PassType,
};

type Key = (ResourceKind, PassType, String);

/// In-memory object store for testing
///
/// Stores resources in a HashMap. Not persistent.
#[derive(Default)]
pub struct InMemoryObjectStore {
    resources: Mutex<HashMap<Key, Value>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn resources(&self) -> MutexGuard<'_, HashMap<Key, Value>> {
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored resources of `kind`.
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources().keys().filter(|(k, _, _)| *k == kind).count()
    }

    fn insert_value(&self, kind: ResourceKind, pass_type: PassType, body: &Value) -> Result<Value> {
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::validation(format!("{kind} body is missing 'id'")))?
            .to_owned();

        log::trace!("insert {kind} {id}.");

        let mut resources = self.resources();
        let key = (kind, pass_type, id);
        if resources.contains_key(&key) {
            return Err(WalletError::Api {
                status: 409,
                body: format!("{kind} {} already exists", key.2),
            });
        }
        resources.insert(key, body.clone());

        Ok(body.clone())
    }

    fn not_found(kind: ResourceKind, id: &str) -> WalletError {
        WalletError::Api {
            status: 404,
            body: format!("{kind} {id} not found"),
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, kind: ResourceKind, pass_type: PassType, id: &str) -> Result<Option<Value>> {
        log::trace!("get {kind} {id}.");

        let resource = self
            .resources()
            .get(&(kind, pass_type, id.to_owned()))
            .cloned();

        Ok(resource)
    }

    async fn insert(&self, kind: ResourceKind, pass_type: PassType, body: &Value) -> Result<Value> {
        self.insert_value(kind, pass_type, body)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        body: &Value,
    ) -> Result<Value> {
        log::trace!("update {kind} {id}.");

        if body.get("id").and_then(Value::as_str) != Some(id) {
            return Err(WalletError::Api {
                status: 400,
                body: format!("{kind} body does not carry id {id}"),
            });
        }

        let mut resources = self.resources();
        let existing = resources
            .get_mut(&(kind, pass_type, id.to_owned()))
            .ok_or_else(|| Self::not_found(kind, id))?;
        *existing = body.clone();

        Ok(body.clone())
    }

    async fn patch(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        body: &Value,
    ) -> Result<Value> {
        log::trace!("patch {kind} {id}.");

        let mut resources = self.resources();
        let existing = resources
            .get_mut(&(kind, pass_type, id.to_owned()))
            .ok_or_else(|| Self::not_found(kind, id))?;

        if let (Value::Object(existing), Value::Object(patch)) = (&mut *existing, body) {
            for (field, value) in patch {
                existing.insert(field.clone(), value.clone());
            }
        }

        Ok(existing.clone())
    }

    async fn add_message(
        &self,
        kind: ResourceKind,
        pass_type: PassType,
        id: &str,
        message: &Value,
    ) -> Result<Value> {
        log::trace!("addMessage {kind} {id}.");

        let mut resources = self.resources();
        let existing = resources
            .get_mut(&(kind, pass_type, id.to_owned()))
            .ok_or_else(|| Self::not_found(kind, id))?;

        if let Value::Object(fields) = &mut *existing {
            match fields.entry("messages").or_insert_with(|| json!([])) {
                Value::Array(messages) => messages.push(message.clone()),
                other => *other = json!([message]),
            }
        }

        Ok(json!({ "resource": existing.clone() }))
    }

    async fn batch(&self, boundary: &str, body: String) -> Result<String> {
        let requests = parse_batch_body(boundary, &body)?;

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            let resource = request.path.rsplit('/').next().unwrap_or_default();
            let (kind, pass_type) = ResourceKind::from_resource(resource).ok_or_else(|| {
                WalletError::validation(format!("unknown batch resource '{}'", request.path))
            })?;
            let body: Value = serde_json::from_str(&request.json_body)?;

            let response = match self.insert_value(kind, pass_type, &body) {
                Ok(inserted) => inserted,
                Err(WalletError::Api { status, body }) => json!({"error": {"code": status, "message": body}}),
                Err(e) => return Err(e),
            };
            responses.push(response);
        }

        Ok(serde_json::to_string(&responses)?)
    }
}
