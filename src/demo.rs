//! The issuance walkthrough against any [`ObjectStore`]: create, update, patch
//! and message classes and objects, expire objects, mint save links and batch-create.

use serde_json::{json, Map, Value};

use crate::{
    batch::{build_batch_body, BatchRequest},
    config::WalletConfig,
    credential::IssuerIdentity,
    error::{Result, WalletError},
    object_store::{ObjectStore, ResourceKind},
    pass::{resource_id, sanitize_suffix, ObjectPatch, PassMessage, PassReference, PassType},
    save_link::{existing_objects_payload, SaveLinkPayload},
    templates,
};

/// Identifiers and links produced by [`DemoFlow::run`].
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub class_id: String,
    pub object_id: String,
    pub new_objects_link: String,
    pub existing_objects_link: String,
    pub batch_response: String,
}

/// Runs the issuance steps for one issuer against an object store.
pub struct DemoFlow<S> {
    store: S,
    identity: IssuerIdentity,
    config: WalletConfig,
}

/// Random suffix usable in a resource id.
pub fn random_suffix() -> String {
    sanitize_suffix(&uuid::Uuid::new_v4().to_string().replace('-', "_"))
}

const LINK_URI: &str = "https://developers.google.com/wallet";
const CLASS_LINK_DESCRIPTION: &str = "Homepage description";
const OBJECT_LINK_DESCRIPTION: &str = "New link description";
const REVIEW_STATUS: &str = "UNDER_REVIEW";

/// Returns `linksModuleData` of `resource` with one more link appended.
fn links_with(resource: &Value, description: &str) -> Value {
    let mut uris = resource
        .pointer("/linksModuleData/uris")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    uris.push(json!({ "uri": LINK_URI, "description": description }));

    let mut links = match resource.get("linksModuleData") {
        Some(Value::Object(links)) => links.clone(),
        _ => Map::new(),
    };
    links.insert("uris".to_owned(), Value::Array(uris));
    Value::Object(links)
}

impl<S: ObjectStore> DemoFlow<S> {
    pub fn new(store: S, identity: IssuerIdentity, config: WalletConfig) -> Self {
        Self {
            store,
            identity,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the class unless it already exists. Returns the class id.
    pub async fn create_class(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
    ) -> Result<String> {
        let class = templates::new_class(pass_type, issuer_id, class_suffix);

        if self
            .store
            .get(ResourceKind::Class, pass_type, &class.id)
            .await?
            .is_some()
        {
            log::info!("Class {} already exists!", class.id);
            return Ok(class.id);
        }

        self.store
            .insert(ResourceKind::Class, pass_type, &class.to_value()?)
            .await?;
        log::info!("Class {} created", class.id);

        Ok(class.id)
    }

    /// Creates the object unless it already exists. Returns the object id.
    pub async fn create_object(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
        object_suffix: &str,
    ) -> Result<String> {
        let object = templates::new_object(pass_type, issuer_id, class_suffix, object_suffix);

        if self
            .store
            .get(ResourceKind::Object, pass_type, &object.id)
            .await?
            .is_some()
        {
            log::info!("Object {} already exists!", object.id);
            return Ok(object.id);
        }

        self.store
            .insert(ResourceKind::Object, pass_type, &object.to_value()?)
            .await?;
        log::info!("Object {} created", object.id);

        Ok(object.id)
    }

    async fn require(&self, kind: ResourceKind, pass_type: PassType, id: &str) -> Result<Value> {
        self.store
            .get(kind, pass_type, id)
            .await?
            .ok_or_else(|| WalletError::validation(format!("{kind} {id} not found")))
    }

    /// Replaces the class with a copy carrying one more link, back under review.
    pub async fn update_class(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
    ) -> Result<String> {
        let class_id = resource_id(issuer_id, class_suffix);
        let mut class = self.require(ResourceKind::Class, pass_type, &class_id).await?;

        let links = links_with(&class, CLASS_LINK_DESCRIPTION);
        if let Value::Object(fields) = &mut class {
            fields.insert("linksModuleData".to_owned(), links);
            fields.insert("reviewStatus".to_owned(), json!(REVIEW_STATUS));
        }

        let response = self
            .store
            .update(ResourceKind::Class, pass_type, &class_id, &class)
            .await?;
        log::info!("Class update response: {response}");

        Ok(class_id)
    }

    /// Patches one more link onto the class and puts it back under review.
    pub async fn patch_class(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
    ) -> Result<String> {
        let class_id = resource_id(issuer_id, class_suffix);
        let class = self.require(ResourceKind::Class, pass_type, &class_id).await?;

        let patch = json!({
            "linksModuleData": links_with(&class, CLASS_LINK_DESCRIPTION),
            "reviewStatus": REVIEW_STATUS,
        });

        let response = self
            .store
            .patch(ResourceKind::Class, pass_type, &class_id, &patch)
            .await?;
        log::info!("Class patch response: {response}");

        Ok(class_id)
    }

    /// Attaches a message to the class.
    pub async fn add_class_message(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
        message: &PassMessage,
    ) -> Result<String> {
        let class_id = resource_id(issuer_id, class_suffix);
        self.require(ResourceKind::Class, pass_type, &class_id).await?;

        let response = self
            .store
            .add_message(ResourceKind::Class, pass_type, &class_id, &serde_json::to_value(message)?)
            .await?;
        log::info!("Class addMessage response: {response}");

        Ok(class_id)
    }

    /// Replaces the object with a copy carrying one more link.
    pub async fn update_object(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        object_suffix: &str,
    ) -> Result<String> {
        let object_id = resource_id(issuer_id, object_suffix);
        let mut object = self.require(ResourceKind::Object, pass_type, &object_id).await?;

        let links = links_with(&object, OBJECT_LINK_DESCRIPTION);
        if let Value::Object(fields) = &mut object {
            fields.insert("linksModuleData".to_owned(), links);
        }

        let response = self
            .store
            .update(ResourceKind::Object, pass_type, &object_id, &object)
            .await?;
        log::info!("Object update response: {response}");

        Ok(object_id)
    }

    /// Patches one more link onto the object.
    pub async fn patch_object(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        object_suffix: &str,
    ) -> Result<String> {
        let object_id = resource_id(issuer_id, object_suffix);
        let object = self.require(ResourceKind::Object, pass_type, &object_id).await?;

        let patch = json!({ "linksModuleData": links_with(&object, OBJECT_LINK_DESCRIPTION) });

        let response = self
            .store
            .patch(ResourceKind::Object, pass_type, &object_id, &patch)
            .await?;
        log::info!("Object patch response: {response}");

        Ok(object_id)
    }

    /// Attaches a message to the object.
    pub async fn add_object_message(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        object_suffix: &str,
        message: &PassMessage,
    ) -> Result<String> {
        let object_id = resource_id(issuer_id, object_suffix);
        self.require(ResourceKind::Object, pass_type, &object_id).await?;

        let response = self
            .store
            .add_message(ResourceKind::Object, pass_type, &object_id, &serde_json::to_value(message)?)
            .await?;
        log::info!("Object addMessage response: {response}");

        Ok(object_id)
    }

    /// Sets the object's state to `EXPIRED`.
    pub async fn expire_object(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        object_suffix: &str,
    ) -> Result<String> {
        let object_id = resource_id(issuer_id, object_suffix);
        self.require(ResourceKind::Object, pass_type, &object_id).await?;

        let response = self
            .store
            .patch(
                ResourceKind::Object,
                pass_type,
                &object_id,
                &ObjectPatch::expire().to_value()?,
            )
            .await?;
        log::debug!("Object expiration response: {response}");

        Ok(object_id)
    }

    /// Save link that creates a new class and object when redeemed.
    pub fn save_link_new(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
        object_suffix: &str,
    ) -> Result<String> {
        let mut payload = SaveLinkPayload::new();
        payload
            .push_class(&templates::new_class(pass_type, issuer_id, class_suffix))?
            .push_object(&templates::new_object(
                pass_type,
                issuer_id,
                class_suffix,
                object_suffix,
            ))?;

        let link = self
            .config
            .save_link_builder()
            .build(&self.identity, &payload)?;
        log::info!("Add to wallet link for new objects: {link}");

        Ok(link)
    }

    /// Save link that adds objects already present in the store.
    pub fn save_link_existing(&self, refs: &[(PassType, PassReference)]) -> Result<String> {
        let payload = existing_objects_payload(refs.iter().map(|(t, r)| (*t, r)))?;

        let link = self
            .config
            .save_link_builder()
            .build(&self.identity, &payload)?;
        log::info!("Add to wallet link for existing objects: {link}");

        Ok(link)
    }

    /// Creates `count` objects of `class_suffix` in one batch call.
    pub async fn batch_create_objects(
        &self,
        pass_type: PassType,
        issuer_id: &str,
        class_suffix: &str,
        count: usize,
    ) -> Result<String> {
        let requests = (0..count)
            .map(|_| {
                let object =
                    templates::new_object(pass_type, issuer_id, class_suffix, &random_suffix());
                BatchRequest::insert_object(pass_type, &object)
            })
            .collect::<Result<Vec<_>>>()?;

        let body = build_batch_body(&self.config.boundary, &requests)?;
        self.store.batch(&self.config.boundary, body).await
    }

    /// Runs every step for `pass_type` with fresh class and object suffixes.
    pub async fn run(&self, pass_type: PassType, issuer_id: &str) -> Result<DemoReport> {
        let class_suffix = random_suffix();
        let object_suffix = format!("{}-{class_suffix}", random_suffix());
        log::info!("Running {pass_type} demo for issuer {issuer_id}");

        let class_id = self.create_class(pass_type, issuer_id, &class_suffix).await?;
        let object_id = self
            .create_object(pass_type, issuer_id, &class_suffix, &object_suffix)
            .await?;
        self.expire_object(pass_type, issuer_id, &object_suffix).await?;

        let new_objects_link =
            self.save_link_new(pass_type, issuer_id, &class_suffix, &format!("{object_suffix}_"))?;
        let existing_objects_link = self.save_link_existing(&[(
            pass_type,
            PassReference {
                id: object_id.clone(),
                class_id: class_id.clone(),
            },
        )])?;

        let batch_response = self
            .batch_create_objects(pass_type, issuer_id, &class_suffix, 3)
            .await?;

        Ok(DemoReport {
            class_id,
            object_id,
            new_objects_link,
            existing_objects_link,
            batch_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        credential::tests::test_identity,
        jwt::verify_compact,
        object_store::InMemoryObjectStore,
        save_link::{token_from_link, SaveLinkClaims},
    };

    fn flow() -> DemoFlow<InMemoryObjectStore> {
        DemoFlow::new(
            InMemoryObjectStore::new(),
            test_identity(),
            WalletConfig::default(),
        )
    }

    #[tokio::test]
    async fn full_run_against_memory_store() {
        let _ = env_logger::builder().is_test(true).try_init();
        let flow = flow();

        let report = flow.run(PassType::Loyalty, "3388000000012345").await.unwrap();

        let object = flow
            .store()
            .get(ResourceKind::Object, PassType::Loyalty, &report.object_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(object["state"], json!("EXPIRED"));
        assert_eq!(flow.store().count(ResourceKind::Class), 1);
        // one created directly, three by batch
        assert_eq!(flow.store().count(ResourceKind::Object), 4);

        let token = token_from_link(&report.existing_objects_link).unwrap();
        let claims: SaveLinkClaims =
            verify_compact(token, test_identity().signer().public_key()).unwrap();
        let refs = claims.payload.get(PassType::Loyalty.objects_key()).unwrap();
        assert_eq!(refs[0]["id"], json!(report.object_id));
        assert_eq!(refs[0]["classId"], json!(report.class_id));

        let token = token_from_link(&report.new_objects_link).unwrap();
        let claims: SaveLinkClaims = verify_compact(token, test_identity().signer().public_key()).unwrap();
        assert!(claims.payload.get(PassType::Loyalty.classes_key()).is_some());
    }

    #[tokio::test]
    async fn existing_class_is_reused() {
        let flow = flow();

        let first = flow.create_class(PassType::Flight, "1", "c").await.unwrap();
        let second = flow.create_class(PassType::Flight, "1", "c").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(flow.store().count(ResourceKind::Class), 1);
    }

    #[tokio::test]
    async fn expiring_missing_object_fails() {
        let err = flow()
            .expire_object(PassType::Generic, "1", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)), "{err:?}");
    }

    #[tokio::test]
    async fn class_update_and_patch_add_links() {
        let flow = flow();
        flow.create_class(PassType::Generic, "1", "c").await.unwrap();

        flow.update_class(PassType::Generic, "1", "c").await.unwrap();
        flow.patch_class(PassType::Generic, "1", "c").await.unwrap();

        let class = flow
            .store()
            .get(ResourceKind::Class, PassType::Generic, "1.c")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(class["reviewStatus"], json!("UNDER_REVIEW"));
        let uris = class["linksModuleData"]["uris"].as_array().unwrap();
        assert_eq!(uris.len(), 2);
        assert_eq!(uris[1]["uri"], json!("https://developers.google.com/wallet"));
        assert_eq!(uris[1]["description"], json!("Homepage description"));
    }

    #[tokio::test]
    async fn object_update_and_patch_keep_existing_fields() {
        let flow = flow();
        flow.create_object(PassType::Offer, "1", "c", "o").await.unwrap();

        flow.update_object(PassType::Offer, "1", "o").await.unwrap();
        flow.patch_object(PassType::Offer, "1", "o").await.unwrap();

        let object = flow
            .store()
            .get(ResourceKind::Object, PassType::Offer, "1.o")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(object["classId"], json!("1.c"));
        assert_eq!(object["state"], json!("ACTIVE"));
        let uris = object["linksModuleData"]["uris"].as_array().unwrap();
        assert_eq!(uris.len(), 2);
        assert_eq!(uris[0]["description"], json!("New link description"));
    }

    #[tokio::test]
    async fn messages_attach_to_class_and_object() {
        let flow = flow();
        flow.create_class(PassType::Flight, "1", "c").await.unwrap();
        flow.create_object(PassType::Flight, "1", "c", "o").await.unwrap();
        let message = PassMessage::new("Gate change", "Now boarding at B12");

        flow.add_class_message(PassType::Flight, "1", "c", &message)
            .await
            .unwrap();
        flow.add_object_message(PassType::Flight, "1", "o", &message)
            .await
            .unwrap();

        for (kind, id) in [(ResourceKind::Class, "1.c"), (ResourceKind::Object, "1.o")] {
            let resource = flow
                .store()
                .get(kind, PassType::Flight, id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(
                resource["messages"],
                json!([{"header": "Gate change", "body": "Now boarding at B12"}])
            );
        }
    }

    #[tokio::test]
    async fn changing_missing_resources_fails() {
        let flow = flow();
        let message = PassMessage::new("h", "b");

        let results = [
            flow.update_class(PassType::Loyalty, "1", "x").await,
            flow.patch_class(PassType::Loyalty, "1", "x").await,
            flow.add_class_message(PassType::Loyalty, "1", "x", &message).await,
            flow.update_object(PassType::Loyalty, "1", "x").await,
            flow.patch_object(PassType::Loyalty, "1", "x").await,
            flow.add_object_message(PassType::Loyalty, "1", "x", &message).await,
        ];

        for result in results {
            assert!(matches!(result, Err(WalletError::Validation(_))), "{result:?}");
        }
        assert_eq!(flow.store().count(ResourceKind::Class), 0);
    }

    #[test]
    fn random_suffixes_are_valid_ids() {
        let suffix = random_suffix();
        assert_eq!(suffix, sanitize_suffix(&suffix));
        assert!(!suffix.contains('-'));
        assert_ne!(suffix, random_suffix());
    }
}
