//! Document decoding: documents merged back into records.
//!
//! A single resource object is merged into one target record. An array is
//! merged into a collection: elements whose id matches an existing record
//! update it in place, the rest are decoded into fresh default records and
//! appended in payload order.
//!
//! Attributes are written field by field onto a copy of the existing record
//! through [`Resource::set_attribute`], so fields missing from the payload
//! keep their current values. Every decode is atomic: on error the target is
//! left untouched.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::DecodeError;
use crate::inspector::{TypeInspector, TypeSchema};
use crate::record::{Capabilities, RelationshipKind, Resource};
use crate::types::{Document, PrimaryData, RelationshipData, ResourceObject};

/// How resource objects are matched against and merged into records of `T`.
pub(crate) trait MergeStrategy<T> {
    fn resource_type(&self) -> &str;

    /// Resolved id of an existing target element.
    fn existing_id(&self, record: &T) -> Result<String, DecodeError>;

    /// Produce `base` updated with `object`.
    fn merge(&self, object: &ResourceObject, base: &T) -> Result<T, DecodeError>;
}

/// Parse a raw document.
///
/// # Errors
///
/// Returns `DecodeError::ParseError` if the input is not a well-formed document.
pub fn parse_document(raw: &str) -> Result<Document, DecodeError> {
    serde_json::from_str(raw).map_err(|source| DecodeError::ParseError { source })
}

/// Decode a raw single-resource document into `target`.
pub fn decode<T: Resource>(
    raw: &str,
    target: &mut T,
    inspector: &TypeInspector,
) -> Result<(), DecodeError> {
    let document = parse_document(raw)?;
    decode_document(&document, target, inspector)
}

/// Decode a raw collection document into `target`.
pub fn decode_many<T: Resource>(
    raw: &str,
    target: &mut Vec<T>,
    inspector: &TypeInspector,
) -> Result<(), DecodeError> {
    let document = parse_document(raw)?;
    decode_document_many(&document, target, inspector)
}

/// Decode a parsed single-resource document into `target`.
pub fn decode_document<T: Resource>(
    document: &Document,
    target: &mut T,
    inspector: &TypeInspector,
) -> Result<(), DecodeError> {
    let strategy = ResourceStrategy::new::<T>(inspector);
    merge_single(&strategy, document, target)
}

/// Decode a parsed collection document into `target`.
pub fn decode_document_many<T: Resource>(
    document: &Document,
    target: &mut Vec<T>,
    inspector: &TypeInspector,
) -> Result<(), DecodeError> {
    let strategy = ResourceStrategy::new::<T>(inspector);
    merge_collection(&strategy, document, target)
}

pub(crate) fn merge_single<T, S: MergeStrategy<T>>(
    strategy: &S,
    document: &Document,
    target: &mut T,
) -> Result<(), DecodeError> {
    let PrimaryData::One(object) = &document.data else {
        return Err(DecodeError::ShapeMismatch {
            expected: "object",
            actual: document.data.kind(),
        });
    };

    *target = strategy.merge(object, target)?;
    debug!(resource_type = strategy.resource_type(), id = %object.id, "decoded resource");
    Ok(())
}

pub(crate) fn merge_collection<T: Default, S: MergeStrategy<T>>(
    strategy: &S,
    document: &Document,
    target: &mut Vec<T>,
) -> Result<(), DecodeError> {
    let PrimaryData::Many(objects) = &document.data else {
        return Err(DecodeError::ShapeMismatch {
            expected: "array",
            actual: document.data.kind(),
        });
    };

    let existing_ids = target
        .iter()
        .map(|record| strategy.existing_id(record))
        .collect::<Result<Vec<_>, _>>()?;

    // Staged so that a failing element leaves `target` untouched.
    let mut updated: Vec<Option<T>> = target.iter().map(|_| None).collect();
    let mut appended: Vec<(String, T)> = Vec::new();

    for object in objects {
        let position = if object.id.is_empty() {
            None
        } else {
            existing_ids.iter().position(|id| *id == object.id)
        };

        if let Some(index) = position {
            let merged = match &updated[index] {
                Some(staged) => strategy.merge(object, staged)?,
                None => strategy.merge(object, &target[index])?,
            };
            trace!(id = %object.id, index, "updating existing element");
            updated[index] = Some(merged);
            continue;
        }

        let staged = if object.id.is_empty() {
            None
        } else {
            appended.iter().position(|(id, _)| *id == object.id)
        };
        match staged {
            Some(index) => {
                let merged = strategy.merge(object, &appended[index].1)?;
                appended[index].1 = merged;
            }
            None => {
                trace!(id = %object.id, "appending new element");
                let merged = strategy.merge(object, &T::default())?;
                appended.push((object.id.clone(), merged));
            }
        }
    }

    let updated_count = updated.iter().filter(|slot| slot.is_some()).count();
    for (slot, record) in updated.into_iter().zip(target.iter_mut()) {
        if let Some(merged) = slot {
            *record = merged;
        }
    }
    let appended_count = appended.len();
    target.extend(appended.into_iter().map(|(_, record)| record));

    debug!(
        resource_type = strategy.resource_type(),
        updated = updated_count,
        appended = appended_count,
        "decoded collection"
    );
    Ok(())
}

/// Fail with `TypeMismatch` unless `object` has the expected type.
pub(crate) fn check_type(schema: &TypeSchema, object: &ResourceObject) -> Result<(), DecodeError> {
    if object.resource_type != schema.resource_type {
        return Err(DecodeError::TypeMismatch {
            expected: schema.resource_type.clone(),
            actual: object.resource_type.clone(),
        });
    }
    Ok(())
}

pub(crate) fn require_attributes<'o>(
    schema: &TypeSchema,
    object: &'o ResourceObject,
) -> Result<&'o Map<String, Value>, DecodeError> {
    object
        .attributes
        .as_ref()
        .ok_or_else(|| DecodeError::MissingAttributes {
            resource_type: schema.resource_type.clone(),
        })
}

/// Merge strategy for [`Resource`] types.
struct ResourceStrategy {
    schema: Arc<TypeSchema>,
}

impl ResourceStrategy {
    fn new<T: Resource>(inspector: &TypeInspector) -> Self {
        Self {
            schema: inspector.schema_of::<T>(),
        }
    }

    fn require(
        &self,
        capability: Capabilities,
        name: &str,
        kind: RelationshipKind,
    ) -> Result<(), DecodeError> {
        if self.schema.has(capability) {
            Ok(())
        } else {
            Err(DecodeError::UnsupportedRelationshipKind {
                resource_type: self.schema.resource_type.clone(),
                name: name.to_string(),
                kind,
            })
        }
    }

    fn apply_attributes<T: Resource>(
        &self,
        attributes: &Map<String, Value>,
        record: &mut T,
    ) -> Result<(), DecodeError> {
        for (wire_name, value) in attributes {
            let Some(key) = self.schema.field_for_wire(wire_name) else {
                trace!(attribute = %wire_name, "ignoring unknown attribute");
                continue;
            };

            let written = record.set_attribute(key, value.clone()).map_err(|source| {
                DecodeError::InvalidAttribute {
                    resource_type: self.schema.resource_type.clone(),
                    source,
                }
            })?;
            if !written {
                trace!(attribute = %wire_name, "attribute has no setter");
            }
        }
        Ok(())
    }

    fn apply_relationships<T: Resource>(
        &self,
        object: &ResourceObject,
        record: &mut T,
    ) -> Result<(), DecodeError> {
        for (name, relationship) in &object.relationships {
            let result = match &relationship.data {
                RelationshipData::Absent => continue,
                RelationshipData::Null => {
                    self.require(Capabilities::TO_ONE_MUTATOR, name, RelationshipKind::ToOne)?;
                    record.set_to_one(name, None)
                }
                RelationshipData::One(identifier) => {
                    self.require(Capabilities::TO_ONE_MUTATOR, name, RelationshipKind::ToOne)?;
                    record.set_to_one(name, Some(identifier))
                }
                RelationshipData::Many(identifiers) => {
                    self.require(Capabilities::TO_MANY_MUTATOR, name, RelationshipKind::ToMany)?;
                    record.set_to_many(name, identifiers)
                }
            };
            result.map_err(|source| DecodeError::Rejected {
                resource_type: self.schema.resource_type.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl<T: Resource> MergeStrategy<T> for ResourceStrategy {
    fn resource_type(&self) -> &str {
        &self.schema.resource_type
    }

    fn existing_id(&self, record: &T) -> Result<String, DecodeError> {
        Ok(record.id())
    }

    fn merge(&self, object: &ResourceObject, base: &T) -> Result<T, DecodeError> {
        check_type(&self.schema, object)?;
        let attributes = require_attributes(&self.schema, object)?;

        let mut record = base.clone();
        self.apply_attributes(attributes, &mut record)?;

        record
            .set_id(&object.id)
            .map_err(|source| DecodeError::Rejected {
                resource_type: self.schema.resource_type.clone(),
                source,
            })?;

        self.apply_relationships(object, &mut record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use crate::types::ResourceIdentifier;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Status {
        #[default]
        Draft,
        Published,
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Post {
        id: String,
        title: String,
        view_count: u32,
        status: Status,
        author_id: Option<String>,
        tag_ids: Vec<String>,
        cache_key: String,
    }

    impl Resource for Post {
        const TYPE_NAME: &'static str = "Post";
        const EXCLUDED_FIELDS: &'static [&'static str] =
            &["author_id", "tag_ids", "cache_key"];
        const CAPABILITIES: Capabilities =
            Capabilities::TO_ONE_MUTATOR.union(Capabilities::TO_MANY_MUTATOR);

        crate::resource_attributes!(title, view_count, status);

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.id = id.to_string();
            Ok(())
        }

        fn set_to_one(
            &mut self,
            name: &str,
            target: Option<&ResourceIdentifier>,
        ) -> Result<(), RecordError> {
            match name {
                "author" => {
                    self.author_id = target.map(|t| t.id.clone());
                    Ok(())
                }
                _ => Err(RecordError::new(format!("unknown relationship {}", name))),
            }
        }

        fn set_to_many(
            &mut self,
            name: &str,
            targets: &[ResourceIdentifier],
        ) -> Result<(), RecordError> {
            match name {
                "tags" => {
                    self.tag_ids = targets.iter().map(|t| t.id.clone()).collect();
                    Ok(())
                }
                _ => Err(RecordError::new(format!("unknown relationship {}", name))),
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Resource for Note {
        const TYPE_NAME: &'static str = "Note";

        crate::resource_attributes!(text);

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.id = id.to_string();
            Ok(())
        }
    }

    #[test]
    fn decodes_attributes_id_and_relationships() {
        let inspector = TypeInspector::default();
        let mut post = Post::default();
        let raw = r#"{
            "data": {
                "type": "posts",
                "id": "1",
                "attributes": { "title": "Hello", "viewCount": 3, "status": "published" },
                "relationships": {
                    "author": { "data": { "type": "people", "id": "9" } },
                    "tags": {
                        "data": [{ "type": "tags", "id": "a" }, { "type": "tags", "id": "b" }]
                    }
                }
            }
        }"#;

        decode(raw, &mut post, &inspector).unwrap();
        assert_eq!(post.id, "1");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.view_count, 3);
        assert_eq!(post.status, Status::Published);
        assert_eq!(post.author_id.as_deref(), Some("9"));
        assert_eq!(post.tag_ids, vec!["a", "b"]);
    }

    #[test]
    fn preserves_fields_missing_from_payload() {
        let inspector = TypeInspector::default();
        let mut post = Post {
            id: "1".into(),
            title: "Old".into(),
            view_count: 10,
            cache_key: "k".into(),
            author_id: Some("9".into()),
            ..Post::default()
        };
        let raw = r#"{
            "data": { "type": "posts", "id": "1", "attributes": { "title": "New" } }
        }"#;

        decode(raw, &mut post, &inspector).unwrap();
        assert_eq!(post.title, "New");
        assert_eq!(post.view_count, 10);
        assert_eq!(post.cache_key, "k");
        assert_eq!(post.author_id.as_deref(), Some("9"));
    }

    #[test]
    fn null_to_one_clears() {
        let inspector = TypeInspector::default();
        let mut post = Post {
            author_id: Some("9".into()),
            ..Post::default()
        };
        let raw = r#"{ "data": { "type": "posts", "id": "1", "attributes": {},
            "relationships": { "author": { "data": null } } } }"#;

        decode(raw, &mut post, &inspector).unwrap();
        assert_eq!(post.author_id, None);
    }

    #[test]
    fn absent_relationship_data_is_ignored() {
        let inspector = TypeInspector::default();
        let mut note = Note::default();
        let raw = r#"{ "data": { "type": "notes", "id": "1", "attributes": { "text": "x" },
            "relationships": {
                "owner": { "links": { "related": "http://x/notes/1/owner" } }
            } } }"#;

        decode(raw, &mut note, &inspector).unwrap();
        assert_eq!(note.text, "x");
    }

    #[test]
    fn excluded_and_unknown_attributes_are_ignored() {
        let inspector = TypeInspector::default();
        let mut post = Post {
            cache_key: "keep".into(),
            ..Post::default()
        };
        let raw = r#"{ "data": { "type": "posts", "id": "1",
            "attributes": { "cacheKey": "overwritten", "unknown": true, "id": "evil" } } }"#;

        decode(raw, &mut post, &inspector).unwrap();
        assert_eq!(post.cache_key, "keep");
        assert_eq!(post.id, "1");
    }

    #[test]
    fn type_mismatch() {
        let inspector = TypeInspector::default();
        let mut post = Post::default();
        let raw = r#"{ "data": { "type": "notes", "id": "1", "attributes": {} } }"#;

        let result = decode(raw, &mut post, &inspector);
        assert!(matches!(
            result,
            Err(DecodeError::TypeMismatch { expected, actual })
                if expected == "posts" && actual == "notes"
        ));
    }

    #[test]
    fn missing_attributes() {
        let inspector = TypeInspector::default();
        let mut post = Post::default();
        let raw = r#"{ "data": { "type": "posts", "id": "1",
            "relationships": { "author": { "data": null } } } }"#;

        let result = decode(raw, &mut post, &inspector);
        assert!(matches!(result, Err(DecodeError::MissingAttributes { .. })));
    }

    #[test]
    fn shape_mismatch_both_ways() {
        let inspector = TypeInspector::default();

        let mut post = Post::default();
        let result = decode(r#"{ "data": [] }"#, &mut post, &inspector);
        assert!(matches!(
            result,
            Err(DecodeError::ShapeMismatch { expected: "object", actual: "array" })
        ));

        let mut posts: Vec<Post> = Vec::new();
        let raw = r#"{ "data": { "type": "posts", "id": "1", "attributes": {} } }"#;
        let result = decode_many(raw, &mut posts, &inspector);
        assert!(matches!(
            result,
            Err(DecodeError::ShapeMismatch { expected: "array", actual: "object" })
        ));
    }

    #[test]
    fn parse_error() {
        let inspector = TypeInspector::default();
        let mut post = Post::default();
        let result = decode("{ \"data\": ", &mut post, &inspector);
        assert!(matches!(result, Err(DecodeError::ParseError { .. })));
    }

    #[test]
    fn unsupported_relationship_kinds() {
        let inspector = TypeInspector::default();

        let mut note = Note::default();
        let raw = r#"{ "data": { "type": "notes", "id": "1", "attributes": {},
            "relationships": { "owner": { "data": { "type": "people", "id": "1" } } } } }"#;
        let result = decode(raw, &mut note, &inspector);
        assert!(matches!(
            result,
            Err(DecodeError::UnsupportedRelationshipKind { kind: RelationshipKind::ToOne, .. })
        ));

        let raw = r#"{ "data": { "type": "notes", "id": "1", "attributes": {},
            "relationships": { "tags": { "data": [] } } } }"#;
        let result = decode(raw, &mut note, &inspector);
        assert!(matches!(
            result,
            Err(DecodeError::UnsupportedRelationshipKind { kind: RelationshipKind::ToMany, .. })
        ));
    }

    #[test]
    fn invalid_enum_value() {
        let inspector = TypeInspector::default();
        let mut post = Post::default();
        let raw = r#"{
            "data": { "type": "posts", "id": "1", "attributes": { "status": "archived" } }
        }"#;

        let result = decode(raw, &mut post, &inspector);
        assert!(matches!(result, Err(DecodeError::InvalidAttribute { .. })));
        assert_eq!(post, Post::default());
    }

    #[test]
    fn rejected_mutation_leaves_target_unchanged() {
        let inspector = TypeInspector::default();
        let mut post = Post {
            title: "Old".into(),
            ..Post::default()
        };
        let raw = r#"{ "data": { "type": "posts", "id": "1", "attributes": { "title": "New" },
            "relationships": { "editor": { "data": null } } } }"#;

        let result = decode(raw, &mut post, &inspector);
        assert!(matches!(result, Err(DecodeError::Rejected { .. })));
        assert_eq!(post.title, "Old");
    }

    #[test]
    fn collection_merge_updates_in_place_and_appends() {
        let inspector = TypeInspector::default();
        let post = |id: &str, title: &str, view_count: u32| Post {
            id: id.into(),
            title: title.into(),
            view_count,
            ..Post::default()
        };
        let mut posts = vec![post("1", "one", 1), post("2", "two", 2), post("3", "three", 3)];
        let raw = r#"{ "data": [
            { "type": "posts", "id": "4", "attributes": { "title": "four" } },
            { "type": "posts", "id": "2", "attributes": { "title": "TWO" } }
        ] }"#;

        decode_many(raw, &mut posts, &inspector).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(posts[1].title, "TWO");
        assert_eq!(posts[1].view_count, 2);
        assert_eq!(posts[0].title, "one");
        assert_eq!(posts[2].title, "three");
        assert_eq!(posts[3].title, "four");
        assert_eq!(posts[3].view_count, 0);
    }

    #[test]
    fn collection_merge_is_atomic() {
        let inspector = TypeInspector::default();
        let mut posts = vec![Post {
            id: "1".into(),
            title: "one".into(),
            ..Post::default()
        }];
        let raw = r#"{ "data": [
            { "type": "posts", "id": "1", "attributes": { "title": "changed" } },
            { "type": "notes", "id": "2", "attributes": {} }
        ] }"#;

        let result = decode_many(raw, &mut posts, &inspector);
        assert!(matches!(result, Err(DecodeError::TypeMismatch { .. })));
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "one");
    }

    #[test]
    fn new_elements_without_id_are_appended() {
        let inspector = TypeInspector::default();
        let mut posts: Vec<Post> = Vec::new();
        let raw = r#"{ "data": [
            { "type": "posts", "attributes": { "title": "a" } },
            { "type": "posts", "attributes": { "title": "b" } }
        ] }"#;

        decode_many(raw, &mut posts, &inspector).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "a");
        assert_eq!(posts[1].title, "b");
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Sensor {
        id: String,
        label: String,
        #[serde(skip)]
        handle: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        reading: f64,
    }

    impl Resource for Sensor {
        const TYPE_NAME: &'static str = "Sensor";

        crate::resource_attributes!(label, unit, reading);

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.id = id.to_string();
            Ok(())
        }
    }

    fn sensor(id: &str, label: &str, handle: u32) -> Sensor {
        Sensor {
            id: id.into(),
            label: label.into(),
            handle: Some(handle),
            ..Sensor::default()
        }
    }

    #[test]
    fn skipped_fields_survive_single_decode() {
        let inspector = TypeInspector::default();
        let mut target = sensor("1", "old", 42);
        let raw = r#"{ "data": { "type": "sensors", "id": "1",
            "attributes": { "label": "north wall" } } }"#;

        decode(raw, &mut target, &inspector).unwrap();
        assert_eq!(target.label, "north wall");
        assert_eq!(target.handle, Some(42));
    }

    #[test]
    fn skipped_fields_survive_collection_decode() {
        let inspector = TypeInspector::default();
        let mut targets = vec![sensor("1", "a", 7), sensor("2", "b", 8)];
        let raw = r#"{ "data": [
            { "type": "sensors", "id": "2", "attributes": { "label": "B" } },
            { "type": "sensors", "id": "3", "attributes": { "label": "c" } }
        ] }"#;

        decode_many(raw, &mut targets, &inspector).unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].handle, Some(7));
        assert_eq!(targets[1].label, "B");
        assert_eq!(targets[1].handle, Some(8));
        assert_eq!(targets[2].handle, None);
    }

    #[test]
    fn non_finite_field_untouched_by_other_updates() {
        let inspector = TypeInspector::default();
        let mut target = Sensor {
            reading: f64::NAN,
            ..sensor("1", "old", 1)
        };
        let raw = r#"{ "data": { "type": "sensors", "id": "1",
            "attributes": { "label": "new" } } }"#;

        decode(raw, &mut target, &inspector).unwrap();
        assert_eq!(target.label, "new");
        assert!(target.reading.is_nan());

        let raw = r#"{ "data": { "type": "sensors", "id": "1",
            "attributes": { "reading": 21.5 } } }"#;
        decode(raw, &mut target, &inspector).unwrap();
        assert_eq!(target.reading, 21.5);
    }

    #[test]
    fn attribute_omitted_from_default_serialization_is_settable() {
        let inspector = TypeInspector::default();
        let mut target = sensor("1", "a", 1);
        let raw = r#"{ "data": { "type": "sensors", "id": "1",
            "attributes": { "unit": "celsius" } } }"#;

        decode(raw, &mut target, &inspector).unwrap();
        assert_eq!(target.unit.as_deref(), Some("celsius"));
    }
}
