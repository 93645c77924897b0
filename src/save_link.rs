use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    credential::IssuerIdentity,
    error::{Result, WalletError},
    jwt::encode_compact,
    pass::{PassClass, PassObject, PassReference, PassType, PayloadKey},
};

/// Prefix of every save link.
pub const SAVE_LINK_PREFIX: &str = "https://pay.google.com/gp/v/save/";
/// `aud` claim of save-link tokens.
pub const SAVE_LINK_AUDIENCE: &str = "google";
/// `typ` claim of save-link tokens.
pub const SAVE_LINK_TYPE: &str = "savetowallet";
/// Origins allowed to present the link when none are configured.
pub const DEFAULT_ORIGINS: &[&str] = &["www.example.com"];

/// Pass classes and objects embedded in a save link, grouped by payload key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveLinkPayload {
    entries: BTreeMap<PayloadKey, Vec<Value>>,
}

impl SaveLinkPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any serializable record under `key`.
    pub fn push<T: Serialize + ?Sized>(&mut self, key: PayloadKey, item: &T) -> Result<&mut Self> {
        let value = serde_json::to_value(item)?;
        self.push_value(key, value)
    }

    fn push_value(&mut self, key: PayloadKey, value: Value) -> Result<&mut Self> {
        self.entries.entry(key).or_default().push(value);
        Ok(self)
    }

    /// Appends a reference to an object that already exists in the store.
    pub fn push_reference(
        &mut self,
        pass_type: PassType,
        reference: &PassReference,
    ) -> Result<&mut Self> {
        self.push(pass_type.objects_key(), reference)
    }

    /// Appends a full object to be created when the link is redeemed.
    ///
    /// Fails with a validation error if the object's fields shadow its identifiers.
    pub fn push_object(&mut self, object: &PassObject) -> Result<&mut Self> {
        let value = object.to_value()?;
        self.push_value(object.pass_type.objects_key(), value)
    }

    /// Appends a full class to be created when the link is redeemed.
    pub fn push_class(&mut self, class: &PassClass) -> Result<&mut Self> {
        let value = class.to_value()?;
        self.push_value(class.pass_type.classes_key(), value)
    }

    pub fn get(&self, key: PayloadKey) -> Option<&[Value]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    /// True when no key holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

/// Claims of a save-link token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveLinkClaims {
    pub iss: String,
    pub aud: String,
    pub origins: Vec<String>,
    pub typ: String,
    pub payload: SaveLinkPayload,
}

/// Builds signed save links for an issuer.
#[derive(Debug, Clone)]
pub struct SaveLinkBuilder {
    origins: Vec<String>,
}

impl Default for SaveLinkBuilder {
    fn default() -> Self {
        Self {
            origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl SaveLinkBuilder {
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// Assembles the claims for `payload` without signing them.
    pub fn claims(&self, issuer: &IssuerIdentity, payload: &SaveLinkPayload) -> Result<SaveLinkClaims> {
        if payload.is_empty() {
            return Err(WalletError::validation(
                "save link payload must contain at least one class or object",
            ));
        }

        Ok(SaveLinkClaims {
            iss: issuer.subject.clone(),
            aud: SAVE_LINK_AUDIENCE.to_owned(),
            origins: self.origins.clone(),
            typ: SAVE_LINK_TYPE.to_owned(),
            payload: payload.clone(),
        })
    }

    /// Signs `payload` on behalf of `issuer` and returns the save link.
    ///
    /// # Arguments
    /// * `issuer` - Identity whose email becomes `iss` and whose key signs the token
    /// * `payload` - Classes, objects or references to embed
    ///
    /// # Returns
    /// * `Result<String>` - `https://pay.google.com/gp/v/save/<token>`
    pub fn build(&self, issuer: &IssuerIdentity, payload: &SaveLinkPayload) -> Result<String> {
        let claims = self.claims(issuer, payload)?;
        let token = encode_compact(&claims, &issuer.signer())?;

        log::debug!("Built save link for '{}'", claims.iss);

        Ok(format!("{SAVE_LINK_PREFIX}{token}"))
    }
}

/// Payload referencing objects that already exist in the store.
pub fn existing_objects_payload<'a>(
    refs: impl IntoIterator<Item = (PassType, &'a PassReference)>,
) -> Result<SaveLinkPayload> {
    let mut payload = SaveLinkPayload::new();
    for (pass_type, reference) in refs {
        payload.push_reference(pass_type, reference)?;
    }
    Ok(payload)
}

/// Signs `payload` with the default origins and returns the save link.
pub fn build_save_link(issuer: &IssuerIdentity, payload: &SaveLinkPayload) -> Result<String> {
    SaveLinkBuilder::default().build(issuer, payload)
}

/// Extracts the compact token from a save link.
pub fn token_from_link(link: &str) -> Result<&str> {
    link.strip_prefix(SAVE_LINK_PREFIX)
        .ok_or_else(|| WalletError::validation(format!("not a save link: '{link}'")))
}

#[cfg(test)]
mod tests {
    use base64::engine::{general_purpose::URL_SAFE_NO_PAD as BASE64_URL_NO_PAD, Engine};
    use serde_json::json;

    use super::*;
    use crate::{
        credential::tests::{test_identity, OTHER_KEY_PEM},
        jwt::{decode_claims_unverified, verify_compact},
        templates,
    };

    fn loyalty_payload() -> SaveLinkPayload {
        let mut payload = SaveLinkPayload::new();
        payload
            .push_reference(PassType::Loyalty, &PassReference::new("123", "abc", "def"))
            .unwrap();
        payload
    }

    #[test]
    fn loyalty_reference_link() {
        let _ = env_logger::builder().is_test(true).try_init();
        let link = build_save_link(&test_identity(), &loyalty_payload()).unwrap();

        assert!(link.starts_with(
            "https://pay.google.com/gp/v/save/eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9."
        ));

        let token = token_from_link(&link).unwrap();
        let claims_segment = token.split('.').nth(1).unwrap();
        let claims_json = BASE64_URL_NO_PAD.decode(claims_segment).unwrap();
        assert_eq!(
            String::from_utf8(claims_json).unwrap(),
            r#"{"iss":"test@issuer.iam","aud":"google","origins":["www.example.com"],"typ":"savetowallet","payload":{"loyaltyObjects":[{"id":"123.abc","classId":"123.def"}]}}"#
        );
    }

    #[test]
    fn token_segments_are_base64url() {
        let link = build_save_link(&test_identity(), &loyalty_payload()).unwrap();
        let token = token_from_link(&link).unwrap();
        let segments: Vec<&str> = token.split('.').collect();

        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert!(!segment.is_empty());
            assert!(segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn payload_round_trips_through_signing() {
        let identity = test_identity();
        let mut payload = SaveLinkPayload::new();
        payload
            .push_class(&templates::new_class(PassType::Generic, "1", "c"))
            .unwrap()
            .push_object(&templates::new_object(PassType::Generic, "1", "c", "o"))
            .unwrap()
            .push_reference(PassType::Flight, &PassReference::new("1", "f", "fc"))
            .unwrap();

        let link = build_save_link(&identity, &payload).unwrap();
        let token = token_from_link(&link).unwrap();

        let claims: SaveLinkClaims = decode_claims_unverified(token).unwrap();
        assert_eq!(claims.payload, payload);

        let raw: Value = decode_claims_unverified(token).unwrap();
        assert_eq!(raw["payload"]["genericClasses"], json!([{"id": "1.c"}]));
    }

    #[test]
    fn signature_verifies_only_with_issuer_key() {
        let identity = test_identity();
        let other = IssuerIdentity::from_pem("other", OTHER_KEY_PEM).unwrap();
        let link = build_save_link(&identity, &loyalty_payload()).unwrap();
        let token = token_from_link(&link).unwrap();

        let claims: SaveLinkClaims =
            verify_compact(token, identity.signer().public_key()).unwrap();
        assert_eq!(claims.iss, "test@issuer.iam");
        assert!(verify_compact::<SaveLinkClaims>(token, other.signer().public_key()).is_err());
    }

    #[test]
    fn existing_objects_across_types() {
        let refs: Vec<(PassType, PassReference)> = PassType::ALL
            .iter()
            .map(|t| (*t, PassReference::new("9", &format!("{t}-o"), &format!("{t}-c"))))
            .collect();
        let payload = existing_objects_payload(refs.iter().map(|(t, r)| (*t, r))).unwrap();

        for (pass_type, reference) in &refs {
            let entries = payload.get(pass_type.objects_key()).unwrap();
            assert_eq!(entries, &[serde_json::to_value(reference).unwrap()]);
        }
        assert!(build_save_link(&test_identity(), &payload).is_ok());
    }

    #[test]
    fn empty_payload_is_rejected() {
        let err = build_save_link(&test_identity(), &SaveLinkPayload::new()).unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)), "{err:?}");

        let mut only_empty = SaveLinkPayload::new();
        only_empty.entries.insert(PassType::Offer.objects_key(), Vec::new());
        assert!(build_save_link(&test_identity(), &only_empty).is_err());
    }

    #[test]
    fn shadowed_object_id_is_rejected() {
        let mut object = templates::new_object(PassType::Loyalty, "1", "c", "o");
        object.fields.insert("id".to_owned(), json!("1.elsewhere"));

        let mut payload = SaveLinkPayload::new();
        let err = payload.push_object(&object).unwrap_err();

        assert!(matches!(err, WalletError::Validation(_)), "{err:?}");
        assert!(payload.is_empty());
    }

    #[test]
    fn unencodable_record_is_serialization_error() {
        let mut record = std::collections::HashMap::new();
        record.insert((1u8, 2u8), 3u8);

        let mut payload = SaveLinkPayload::new();
        let err = payload
            .push(PassType::Loyalty.objects_key(), &record)
            .unwrap_err();

        assert!(matches!(err, WalletError::Serialization(_)), "{err:?}");
        assert!(payload.is_empty());
        assert!(build_save_link(&test_identity(), &payload).is_err());
    }

    #[test]
    fn configured_origins_are_used() {
        let builder = SaveLinkBuilder::new(vec!["https://a.test".into(), "https://b.test".into()]);
        let claims = builder.claims(&test_identity(), &loyalty_payload()).unwrap();
        assert_eq!(claims.origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(claims.aud, "google");
        assert_eq!(claims.typ, "savetowallet");
    }
}
