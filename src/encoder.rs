//! Resource encoding: records to documents.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::error::EncodeError;
use crate::included::IncludedCollector;
use crate::inspector::{TypeInspector, TypeSchema};
use crate::record::{Capabilities, Payload, Record};
use crate::relationships::resolve_relationships;
use crate::types::{Document, Link, Links, Meta, PrimaryData, ResourceObject, ServerInfo};

/// Top-level document members added to an encoded document.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub links: Links,
    pub meta: Meta,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level link.
    pub fn link(mut self, name: impl Into<String>, link: impl Into<Link>) -> Self {
        self.links.insert(name.into(), link.into());
        self
    }

    /// Add a top-level meta entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Encode a payload into a document.
///
/// Collections fail as a whole on the first bad element; no partial
/// document is returned.
///
/// # Errors
///
/// - `EncodeError::InvalidRecord` for a nil root record or an empty id.
/// - `EncodeError::NonConformingElement` for a nil or invalid collection element.
/// - `EncodeError::Serialize` if a record cannot be serialized.
pub fn encode_payload(
    payload: Payload<'_>,
    inspector: &TypeInspector,
    server: Option<&ServerInfo>,
    options: &EncodeOptions,
) -> Result<Document, EncodeError> {
    let (roots, is_collection) = match payload {
        Payload::One(None) => {
            return Err(EncodeError::InvalidRecord {
                reason: "record is nil".to_string(),
            })
        }
        Payload::One(Some(record)) => (vec![record], false),
        Payload::Many(items) => {
            let roots = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    item.ok_or_else(|| EncodeError::NonConformingElement {
                        index,
                        reason: "element is nil".to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            (roots, true)
        }
    };

    let mut collector = IncludedCollector::new(inspector, server);
    let mut objects = Vec::with_capacity(roots.len());

    for (index, record) in roots.iter().enumerate() {
        let object = encode_record(*record, inspector, server).map_err(|err| {
            if is_collection {
                as_element_error(index, err)
            } else {
                err
            }
        })?;
        collector.mark_visited(&object.resource_type, &object.id);
        objects.push(object);
    }

    for record in &roots {
        collector.collect(*record)?;
    }

    debug!(
        resources = objects.len(),
        included = collector.len(),
        "encoded document"
    );

    let data = if is_collection {
        PrimaryData::Many(objects)
    } else {
        objects
            .pop()
            .map_or(PrimaryData::Null, |obj| PrimaryData::One(Box::new(obj)))
    };

    Ok(Document {
        links: options.links.clone(),
        data,
        included: collector.into_included(),
        meta: options.meta.clone(),
    })
}

/// Encode a single record into a resource object, without inclusion.
pub fn encode_record(
    record: &dyn Record,
    inspector: &TypeInspector,
    server: Option<&ServerInfo>,
) -> Result<ResourceObject, EncodeError> {
    let schema = record.record_schema(inspector);

    let id = record.record_id();
    if id.is_empty() {
        return Err(EncodeError::InvalidRecord {
            reason: format!("{} has an empty id", schema.type_name),
        });
    }

    let fields = record
        .record_fields()
        .map_err(|source| EncodeError::Serialize {
            type_name: schema.type_name.clone(),
            source,
        })?;
    let Value::Object(fields) = fields else {
        return Err(EncodeError::InvalidRecord {
            reason: format!("{} does not serialize to an object", schema.type_name),
        });
    };

    let attributes = schema.attributes(&fields, inspector.naming());

    let relationships = if schema.has(Capabilities::REFERENCES) {
        resolve_relationships(record, &schema, &id, inspector.naming(), server)
    } else {
        BTreeMap::new()
    };

    let links = resource_links(record, &schema, &id, server);

    let meta = if schema.has(Capabilities::CUSTOM_META) {
        record.record_meta()
    } else {
        None
    };

    Ok(ResourceObject {
        resource_type: schema.resource_type.clone(),
        id,
        attributes: Some(attributes),
        relationships,
        links,
        meta,
    })
}

/// Generated `self` link merged with the record's custom links.
fn resource_links(
    record: &dyn Record,
    schema: &TypeSchema,
    id: &str,
    server: Option<&ServerInfo>,
) -> Links {
    let mut links = Links::new();
    if let Some(server) = server {
        links.insert(
            "self".to_string(),
            Link::Href(server.resource_url(&schema.resource_type, id)),
        );
    }
    if schema.has(Capabilities::CUSTOM_LINKS) {
        links.extend(record.record_links(server));
    }
    links
}

fn as_element_error(index: usize, err: EncodeError) -> EncodeError {
    match err {
        EncodeError::InvalidRecord { reason } => {
            EncodeError::NonConformingElement { index, reason }
        }
        other => other,
    }
}
