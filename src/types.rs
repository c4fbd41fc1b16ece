//! Wire types of the JSON:API document envelope.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Links keyed by name (`self`, `related`, or custom).
pub type Links = BTreeMap<String, Link>;

/// Free-form meta object.
pub type Meta = Map<String, Value>;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Top-level document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    pub data: PrimaryData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
}

impl Document {
    /// Create a document around primary data, with no links, included or meta.
    pub fn new(data: PrimaryData) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Primary resources, in order. Empty for `null` data.
    pub fn primary(&self) -> &[ResourceObject] {
        match &self.data {
            PrimaryData::Null => &[],
            PrimaryData::One(obj) => std::slice::from_ref(obj.as_ref()),
            PrimaryData::Many(objs) => objs,
        }
    }

    /// Look up an included resource by type and id.
    pub fn find_included(&self, resource_type: &str, id: &str) -> Option<&ResourceObject> {
        self.included
            .iter()
            .find(|r| r.resource_type == resource_type && r.id == id)
    }

    /// Convert to the generic JSON tree handed to content marshalers.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Primary `data` member: a single resource, a collection, or `null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PrimaryData {
    #[default]
    Null,
    One(Box<ResourceObject>),
    Many(Vec<ResourceObject>),
}

impl PrimaryData {
    /// Shape name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PrimaryData::Null => "null",
            PrimaryData::One(_) => "object",
            PrimaryData::Many(_) => "array",
        }
    }
}

impl Serialize for PrimaryData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PrimaryData::Null => serializer.serialize_none(),
            PrimaryData::One(obj) => obj.serialize(serializer),
            PrimaryData::Many(objs) => objs.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PrimaryData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(PrimaryData::Null),
            Value::Object(_) => serde_json::from_value(value)
                .map(|obj| PrimaryData::One(Box::new(obj)))
                .map_err(de::Error::custom),
            Value::Array(_) => serde_json::from_value(value)
                .map(PrimaryData::Many)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "data must be an object, an array or null, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

/// A single resource object (one entry of `data` or `included`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub resource_type: String,
    /// May be empty on create requests.
    #[serde(default)]
    pub id: String,
    /// `None` when the member is missing from the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ResourceObject {
    /// The `(type, id)` pair identifying this resource.
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.resource_type.clone(), self.id.clone())
    }
}

/// A relationship object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "RelationshipData::is_absent")]
    pub data: RelationshipData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Relationship linkage.
///
/// `Absent` (member missing: not fetched) is distinct from `Null` (empty
/// to-one) and from an empty `Many` (empty to-many).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RelationshipData {
    #[default]
    Absent,
    Null,
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

impl RelationshipData {
    pub fn is_absent(&self) -> bool {
        matches!(self, RelationshipData::Absent)
    }

    /// Identifiers carried by this linkage, in order.
    pub fn identifiers(&self) -> &[ResourceIdentifier] {
        match self {
            RelationshipData::Absent | RelationshipData::Null => &[],
            RelationshipData::One(ident) => std::slice::from_ref(ident),
            RelationshipData::Many(idents) => idents,
        }
    }
}

impl Serialize for RelationshipData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RelationshipData::Absent | RelationshipData::Null => serializer.serialize_none(),
            RelationshipData::One(ident) => ident.serialize(serializer),
            RelationshipData::Many(idents) => idents.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RelationshipData {
    // Only called when the member is present; a missing member is `Absent`
    // through `#[serde(default)]` on the containing field.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(RelationshipData::Null),
            Value::Object(_) => serde_json::from_value(value)
                .map(RelationshipData::One)
                .map_err(de::Error::custom),
            Value::Array(_) => serde_json::from_value(value)
                .map(RelationshipData::Many)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "relationship data must be an object, an array or null, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

/// Resource linkage entry: `type` and `id` only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// A link: either a bare URL or an object with `href` and `meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Href(String),
    Object {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Meta>,
    },
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Href(href) => href,
            Link::Object { href, .. } => href,
        }
    }

    /// Create a link object carrying meta.
    pub fn with_meta(href: impl Into<String>, meta: Meta) -> Self {
        Link::Object {
            href: href.into(),
            meta: Some(meta),
        }
    }
}

impl From<String> for Link {
    fn from(href: String) -> Self {
        Link::Href(href)
    }
}

impl From<&str> for Link {
    fn from(href: &str) -> Self {
        Link::Href(href.to_string())
    }
}

/// Base URL and route prefix used to generate links.
///
/// Example:
/// - `base_url`: `https://api.example.com`
/// - `prefix`: `v1`
/// - resource `posts/1` → `https://api.example.com/v1/posts/1`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    pub base_url: String,
    #[serde(default)]
    pub prefix: String,
}

impl ServerInfo {
    pub fn new(base_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prefix: prefix.into(),
        }
    }

    /// `{base}{prefix}` with exactly one slash between the parts and no
    /// trailing slash.
    pub fn root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, prefix)
        }
    }

    /// `{base}{prefix}/{type}/{id}`
    pub fn resource_url(&self, resource_type: &str, id: &str) -> String {
        format!("{}/{}/{}", self.root(), resource_type, id)
    }

    /// `{base}{prefix}/{type}/{id}/relationships/{name}`
    pub fn relationship_self_url(&self, resource_type: &str, id: &str, name: &str) -> String {
        format!(
            "{}/relationships/{}",
            self.resource_url(resource_type, id),
            name
        )
    }

    /// `{base}{prefix}/{type}/{id}/{name}`
    pub fn relationship_related_url(&self, resource_type: &str, id: &str, name: &str) -> String {
        format!("{}/{}", self.resource_url(resource_type, id), name)
    }
}
