use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::WalletError;

/// Pass types hosted by the wallet object store.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    strum::EnumString,
    strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
pub enum PassType {
    EventTicket,
    Flight,
    Generic,
    GiftCard,
    Loyalty,
    Offer,
    Transit,
}

impl PassType {
    pub const ALL: [PassType; 7] = [
        PassType::EventTicket,
        PassType::Flight,
        PassType::Generic,
        PassType::GiftCard,
        PassType::Loyalty,
        PassType::Offer,
        PassType::Transit,
    ];

    fn stem(self) -> &'static str {
        match self {
            PassType::EventTicket => "eventTicket",
            PassType::Flight => "flight",
            PassType::Generic => "generic",
            PassType::GiftCard => "giftCard",
            PassType::Loyalty => "loyalty",
            PassType::Offer => "offer",
            PassType::Transit => "transit",
        }
    }

    /// REST resource name for objects, e.g. `loyaltyObject`.
    pub fn object_resource(self) -> String {
        format!("{}Object", self.stem())
    }

    /// REST resource name for classes, e.g. `loyaltyClass`.
    pub fn class_resource(self) -> String {
        format!("{}Class", self.stem())
    }

    /// Save-link payload key for objects, e.g. `loyaltyObjects`.
    pub fn objects_key(self) -> PayloadKey {
        PayloadKey::new(self, PayloadKind::Objects)
    }

    /// Save-link payload key for classes, e.g. `loyaltyClasses`.
    pub fn classes_key(self) -> PayloadKey {
        PayloadKey::new(self, PayloadKind::Classes)
    }
}

/// Whether a payload sequence holds classes or objects.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PayloadKind {
    Classes,
    Objects,
}

/// Key of the save-link payload mapping, e.g. `flightObjects` or `genericClasses`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PayloadKey {
    pub pass_type: PassType,
    pub kind: PayloadKind,
}

impl PayloadKey {
    pub fn new(pass_type: PassType, kind: PayloadKind) -> Self {
        Self { pass_type, kind }
    }
}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.kind {
            PayloadKind::Classes => "Classes",
            PayloadKind::Objects => "Objects",
        };
        write!(f, "{}{}", self.pass_type.stem(), suffix)
    }
}

impl FromStr for PayloadKey {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PassType::ALL
            .iter()
            .flat_map(|t| [t.objects_key(), t.classes_key()])
            .find(|k| k.to_string() == s)
            .ok_or_else(|| WalletError::validation(format!("unknown payload key '{s}'")))
    }
}

impl Serialize for PayloadKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PayloadKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PayloadKey::from_str(&s).map_err(de::Error::custom)
    }
}

/// Pointer to a class/object pair hosted by the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReference {
    pub id: String,
    #[serde(rename = "classId")]
    pub class_id: String,
}

impl PassReference {
    pub fn new(issuer_id: &str, object_suffix: &str, class_suffix: &str) -> Self {
        Self {
            id: resource_id(issuer_id, object_suffix),
            class_id: resource_id(issuer_id, class_suffix),
        }
    }
}

/// A pass object: identifiers plus opaque type-specific display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassObject {
    #[serde(skip)]
    pub pass_type: PassType,
    pub id: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PassObject {
    /// JSON body of the object. Fails if `fields` shadows `id` or `classId`.
    pub fn to_value(&self) -> Result<Value, WalletError> {
        check_reserved(&self.fields, &["id", "classId"], &self.id)?;
        Ok(serde_json::to_value(self)?)
    }

    pub fn reference(&self) -> PassReference {
        PassReference {
            id: self.id.clone(),
            class_id: self.class_id.clone(),
        }
    }
}

/// A pass class (template) with opaque type-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassClass {
    #[serde(skip)]
    pub pass_type: PassType,
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PassClass {
    /// JSON body of the class. Fails if `fields` shadows `id`.
    pub fn to_value(&self) -> Result<Value, WalletError> {
        check_reserved(&self.fields, &["id"], &self.id)?;
        Ok(serde_json::to_value(self)?)
    }
}

/// Message shown on a pass, attached to a class or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassMessage {
    pub header: String,
    pub body: String,
}

impl PassMessage {
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }
}

fn check_reserved(fields: &Map<String, Value>, reserved: &[&str], owner: &str) -> Result<(), WalletError> {
    match reserved.iter().find(|key| fields.contains_key(**key)) {
        Some(key) => Err(WalletError::validation(format!(
            "fields of '{owner}' must not set the reserved key '{key}'"
        ))),
        None => Ok(()),
    }
}

/// Lifecycle state of a pass object.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectState {
    Active,
    Completed,
    Expired,
    Inactive,
}

/// Partial update body for a pass object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectState>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ObjectPatch {
    /// Patch that marks the object as expired.
    pub fn expire() -> Self {
        Self {
            state: Some(ObjectState::Expired),
            ..Default::default()
        }
    }

    /// JSON body of the patch. Fails if `fields` shadows `state`.
    pub fn to_value(&self) -> Result<Value, WalletError> {
        if self.state.is_some() {
            check_reserved(&self.fields, &["state"], "patch")?;
        }
        Ok(serde_json::to_value(self)?)
    }
}

/// Builds a resource identifier in the form `<issuer-id>.<suffix>`.
pub fn resource_id(issuer_id: &str, suffix: &str) -> String {
    format!("{issuer_id}.{suffix}")
}

/// Replaces characters that are not allowed in an identifier suffix with `_`.
pub fn sanitize_suffix(suffix: &str) -> String {
    suffix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
