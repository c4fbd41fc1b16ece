//! Legacy convention fallback.
//!
//! Plain serde values that implement none of the record capabilities can
//! still be exchanged: the identifier is whichever field is named `id`
//! (case-insensitive) and the resource type comes from the Rust type name.
//! Relationships and included resources are always empty on this path.
//!
//! Decoding here rebuilds the whole value through serde: the target is
//! serialized, the payload attributes are written into that field map and the
//! result is deserialized again. Fields marked `#[serde(skip)]` come back as
//! their defaults and fields holding values JSON cannot represent (such as a
//! NaN float) fail the decode. Types that need those fields kept should
//! implement [`Resource`](crate::Resource) and go through
//! [`Codec::decode`](crate::Codec::decode), which writes attributes in place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::decoder::{
    check_type, merge_collection, merge_single, parse_document, require_attributes,
    MergeStrategy,
};
use crate::error::{DecodeError, EncodeError, RecordError};
use crate::inspector::{TypeInspector, TypeSchema};
use crate::naming::NamingConfig;
use crate::record::{Capabilities, RelationshipKind};
use crate::types::{
    json_type_name, Document, Link, Links, PrimaryData, RelationshipData, ResourceObject,
    ServerInfo,
};

/// Last path segment of a Rust type name, looking through references,
/// slices and single-parameter wrappers: `my_app::model::Widget`,
/// `Vec<Widget>`, `Option<Box<Widget>>` and `&[Widget]` all give `Widget`.
///
/// Generics with several parameters keep their own name (`HashMap<K, V>`
/// gives `HashMap`).
pub fn short_type_name(full: &str) -> String {
    let name = full.trim_start_matches('&').trim();
    let name = name.strip_prefix("mut ").unwrap_or(name).trim();

    if let Some(inner) = name.strip_prefix('[') {
        let element = inner
            .trim_end_matches(']')
            .split(';')
            .next()
            .unwrap_or(inner);
        return short_type_name(element);
    }

    let (base, generics) = match (name.find('<'), name.rfind('>')) {
        (Some(open), Some(close)) if close > open => {
            (&name[..open], Some(&name[open + 1..close]))
        }
        _ => (name, None),
    };
    let last = base.rsplit("::").next().unwrap_or(base);

    match generics {
        Some(inner) if top_level_params(inner) == 1 => short_type_name(inner),
        _ => last.to_string(),
    }
}

/// Number of comma-separated parameters at the outermost nesting level.
fn top_level_params(generics: &str) -> usize {
    let mut depth = 0usize;
    let mut count = 1;
    for c in generics.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => count += 1,
            _ => {}
        }
    }
    count
}

/// Encode any serializable value by convention.
///
/// # Errors
///
/// - `EncodeError::InvalidInputKind` if the value is neither an object nor an array.
/// - `EncodeError::InvalidRecord` if a single object has no usable id.
/// - `EncodeError::NonConformingElement` if an array element has no usable id.
pub fn encode_legacy<T: Serialize + ?Sized>(
    record: &T,
    inspector: &TypeInspector,
    server: Option<&ServerInfo>,
) -> Result<Document, EncodeError> {
    let type_name = short_type_name(std::any::type_name::<T>());
    let value = serde_json::to_value(record).map_err(|source| EncodeError::Serialize {
        type_name: type_name.clone(),
        source,
    })?;
    encode_legacy_value(&value, &type_name, inspector, server)
}

/// Encode an already serialized value under the given Rust type name.
pub fn encode_legacy_value(
    value: &Value,
    type_name: &str,
    inspector: &TypeInspector,
    server: Option<&ServerInfo>,
) -> Result<Document, EncodeError> {
    let naming = inspector.naming();

    let data = match value {
        Value::Object(fields) => {
            let object = legacy_object(fields, type_name, naming, server)
                .map_err(|reason| EncodeError::InvalidRecord { reason })?;
            PrimaryData::One(Box::new(object))
        }
        Value::Array(items) => {
            let objects = items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(fields) => legacy_object(fields, type_name, naming, server)
                        .map_err(|reason| EncodeError::NonConformingElement { index, reason }),
                    other => Err(EncodeError::NonConformingElement {
                        index,
                        reason: format!("expected object, got {}", json_type_name(other)),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            PrimaryData::Many(objects)
        }
        other => {
            return Err(EncodeError::InvalidInputKind {
                actual: json_type_name(other).to_string(),
            })
        }
    };

    debug!(type_name, kind = data.kind(), "encoded legacy document");
    Ok(Document::new(data))
}

/// Decode a single-resource document into a plain serde value.
pub fn decode_legacy<T>(
    raw: &str,
    target: &mut T,
    inspector: &TypeInspector,
) -> Result<(), DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    let document = parse_document(raw)?;
    let strategy = LegacyStrategy::new::<T>(inspector.naming());
    merge_single(&strategy, &document, target)
}

/// Decode a collection document into a vector of plain serde values.
pub fn decode_legacy_many<T>(
    raw: &str,
    target: &mut Vec<T>,
    inspector: &TypeInspector,
) -> Result<(), DecodeError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let document = parse_document(raw)?;
    let strategy = LegacyStrategy::new::<T>(inspector.naming());
    merge_collection(&strategy, &document, target)
}

/// Schema of a plain value, or `None` if it has no field named `id`.
fn legacy_schema(
    type_name: &str,
    fields: &Map<String, Value>,
    naming: &NamingConfig,
) -> Option<TypeSchema> {
    let id_field = fields.keys().find(|k| k.eq_ignore_ascii_case("id"))?.clone();
    Some(TypeSchema {
        type_name: type_name.to_string(),
        resource_type: naming.resource_type_name(type_name),
        fields: TypeSchema::exposed_fields(fields, &id_field, &[], naming),
        id_field,
        excluded: Vec::new(),
        capabilities: Capabilities::NONE,
    })
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn legacy_object(
    fields: &Map<String, Value>,
    type_name: &str,
    naming: &NamingConfig,
    server: Option<&ServerInfo>,
) -> Result<ResourceObject, String> {
    let schema = legacy_schema(type_name, fields, naming)
        .ok_or_else(|| format!("{} has no id field", type_name))?;

    let id = fields
        .get(&schema.id_field)
        .and_then(id_value)
        .ok_or_else(|| format!("{} id must be a string or a number", type_name))?;
    if id.is_empty() {
        return Err(format!("{} has an empty id", type_name));
    }

    let mut links = Links::new();
    if let Some(server) = server {
        links.insert(
            "self".to_string(),
            Link::Href(server.resource_url(&schema.resource_type, &id)),
        );
    }

    Ok(ResourceObject {
        attributes: Some(schema.attributes(fields, naming)),
        resource_type: schema.resource_type,
        id,
        links,
        ..ResourceObject::default()
    })
}

/// Keep numeric id fields numeric.
fn assign_id(current: Option<&Value>, id: &str) -> Result<Value, RecordError> {
    match current {
        Some(Value::Number(n)) if id.is_empty() => Ok(Value::Number(n.clone())),
        Some(Value::Number(_)) => id
            .parse::<u64>()
            .map(Value::from)
            .or_else(|_| id.parse::<i64>().map(Value::from))
            .map_err(|_| RecordError::new(format!("id \"{}\" is not numeric", id))),
        _ => Ok(Value::String(id.to_string())),
    }
}

struct LegacyStrategy<'a> {
    type_name: String,
    resource_type: String,
    naming: &'a NamingConfig,
}

impl<'a> LegacyStrategy<'a> {
    fn new<T>(naming: &'a NamingConfig) -> Self {
        let type_name = short_type_name(std::any::type_name::<T>());
        Self {
            resource_type: naming.resource_type_name(&type_name),
            type_name,
            naming,
        }
    }

    fn schema_for(&self, fields: &Map<String, Value>) -> Result<TypeSchema, DecodeError> {
        legacy_schema(&self.type_name, fields, self.naming).ok_or_else(|| {
            DecodeError::IdentityCapabilityMissing {
                type_name: self.type_name.clone(),
                reason: "no field named id".to_string(),
            }
        })
    }
}

impl<T: Serialize + DeserializeOwned> MergeStrategy<T> for LegacyStrategy<'_> {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn existing_id(&self, record: &T) -> Result<String, DecodeError> {
        let fields = to_fields(&self.type_name, &self.resource_type, record)?;
        let schema = self.schema_for(&fields)?;
        fields
            .get(&schema.id_field)
            .and_then(id_value)
            .ok_or_else(|| DecodeError::IdentityCapabilityMissing {
                type_name: self.type_name.clone(),
                reason: "id is neither a string nor a number".to_string(),
            })
    }

    fn merge(&self, object: &ResourceObject, base: &T) -> Result<T, DecodeError> {
        let mut fields = to_fields(&self.type_name, &self.resource_type, base)?;
        let schema = self.schema_for(&fields)?;
        check_type(&schema, object)?;
        let attributes = require_attributes(&schema, object)?;

        if let Some((name, relationship)) = object
            .relationships
            .iter()
            .find(|(_, r)| !r.data.is_absent())
        {
            let kind = match relationship.data {
                RelationshipData::Many(_) => RelationshipKind::ToMany,
                _ => RelationshipKind::ToOne,
            };
            return Err(DecodeError::UnsupportedRelationshipKind {
                resource_type: schema.resource_type.clone(),
                name: name.clone(),
                kind,
            });
        }

        apply_attributes(&schema, self.naming, attributes, &mut fields);
        let id = assign_id(fields.get(&schema.id_field), &object.id).map_err(|source| {
            DecodeError::Rejected {
                resource_type: schema.resource_type.clone(),
                source,
            }
        })?;
        fields.insert(schema.id_field.clone(), id);

        serde_json::from_value(Value::Object(fields)).map_err(|source| {
            DecodeError::InvalidAttribute {
                resource_type: schema.resource_type.clone(),
                source,
            }
        })
    }
}

/// Write payload attributes into a record's serialized fields.
///
/// Unknown attributes, the identifier and excluded fields are ignored.
fn apply_attributes(
    schema: &TypeSchema,
    naming: &NamingConfig,
    attributes: &Map<String, Value>,
    fields: &mut Map<String, Value>,
) {
    for (wire_name, value) in attributes {
        let key = schema.field_for_wire(wire_name).map(String::from).or_else(|| {
            fields
                .keys()
                .find(|key| schema.is_exposed(key) && naming.jsonify(key) == *wire_name)
                .cloned()
        });

        match key {
            Some(key) if schema.is_exposed(&key) => {
                fields.insert(key, value.clone());
            }
            _ => trace!(attribute = %wire_name, "ignoring unknown attribute"),
        }
    }
}

/// Serialize a record into its field map.
fn to_fields<T: Serialize>(
    type_name: &str,
    resource_type: &str,
    record: &T,
) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(DecodeError::IdentityCapabilityMissing {
            type_name: type_name.to_string(),
            reason: format!("serializes to {}, not an object", json_type_name(&other)),
        }),
        Err(source) => Err(DecodeError::InvalidAttribute {
            resource_type: resource_type.to_string(),
            source,
        }),
    }
}
