//! Relationship resolution.
//!
//! Turns a record's declared [`Reference`]s and concrete [`ReferenceId`]s
//! into relationship objects:
//!
//! | Situation | `data` |
//! |-----------|--------|
//! | to-many with ids | array of all ids, in given order |
//! | to-one with ids | first id |
//! | declared to-many, no ids | `[]` |
//! | declared to-one, no ids | `null` |
//! | declared, not loaded | member omitted |
//!
//! The kind comes from the reference's [`Cardinality`](crate::Cardinality),
//! which by default infers to-many when the name is its own plural.

use std::collections::BTreeMap;

use tracing::trace;

use crate::inspector::TypeSchema;
use crate::naming::NamingConfig;
use crate::record::{Capabilities, Record, Reference, ReferenceId, RelationshipKind};
use crate::types::{Link, Links, Relationship, RelationshipData, ServerInfo};

/// Build the relationships of `record`, whose resolved id is `id`.
///
/// Callers check [`Capabilities::REFERENCES`] first; reference ids are only
/// read when the type declares [`Capabilities::LINKED_RELATIONS`].
pub fn resolve_relationships(
    record: &dyn Record,
    schema: &TypeSchema,
    id: &str,
    naming: &NamingConfig,
    server: Option<&ServerInfo>,
) -> BTreeMap<String, Relationship> {
    let references = record.declared_references();
    let linked = if schema.has(Capabilities::LINKED_RELATIONS) {
        record.linked_ids()
    } else {
        Vec::new()
    };

    let mut relationships = BTreeMap::new();

    for (name, ids) in group_by_name(linked) {
        let cardinality = references
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.cardinality)
            .unwrap_or_default();
        let data = linkage(cardinality.resolve(&name, naming), &ids);
        let relationship = build_relationship(record, schema, id, &name, data, server);
        relationships.insert(name, relationship);
    }

    for reference in &references {
        if relationships.contains_key(&reference.name) {
            continue;
        }
        let data = empty_linkage(reference, naming);
        trace!(
            resource_type = %schema.resource_type,
            name = %reference.name,
            not_loaded = reference.not_loaded,
            "empty relationship"
        );
        let relationship = build_relationship(record, schema, id, &reference.name, data, server);
        relationships.insert(reference.name.clone(), relationship);
    }

    relationships
}

/// `self` and `related` links for a relationship. Empty without server info.
pub fn relationship_links(
    server: Option<&ServerInfo>,
    resource_type: &str,
    id: &str,
    name: &str,
) -> Links {
    let mut links = Links::new();
    if let Some(server) = server {
        links.insert(
            "self".to_string(),
            Link::Href(server.relationship_self_url(resource_type, id, name)),
        );
        links.insert(
            "related".to_string(),
            Link::Href(server.relationship_related_url(resource_type, id, name)),
        );
    }
    links
}

/// Group ids by relationship name, names in first-appearance order.
fn group_by_name(ids: Vec<ReferenceId>) -> Vec<(String, Vec<ReferenceId>)> {
    let mut groups: Vec<(String, Vec<ReferenceId>)> = Vec::new();
    for reference_id in ids {
        match groups.iter_mut().find(|(name, _)| *name == reference_id.name) {
            Some((_, group)) => group.push(reference_id),
            None => groups.push((reference_id.name.clone(), vec![reference_id])),
        }
    }
    groups
}

fn linkage(kind: RelationshipKind, ids: &[ReferenceId]) -> RelationshipData {
    match kind {
        RelationshipKind::ToMany => {
            RelationshipData::Many(ids.iter().map(ReferenceId::identifier).collect())
        }
        RelationshipKind::ToOne => ids
            .first()
            .map_or(RelationshipData::Null, |first| {
                RelationshipData::One(first.identifier())
            }),
    }
}

fn empty_linkage(reference: &Reference, naming: &NamingConfig) -> RelationshipData {
    if reference.not_loaded {
        return RelationshipData::Absent;
    }
    match reference.cardinality.resolve(&reference.name, naming) {
        RelationshipKind::ToMany => RelationshipData::Many(Vec::new()),
        RelationshipKind::ToOne => RelationshipData::Null,
    }
}

fn build_relationship(
    record: &dyn Record,
    schema: &TypeSchema,
    id: &str,
    name: &str,
    data: RelationshipData,
    server: Option<&ServerInfo>,
) -> Relationship {
    let meta = if schema.has(Capabilities::RELATIONSHIP_META) {
        record.record_relationship_meta(name)
    } else {
        None
    };

    Relationship {
        links: relationship_links(server, &schema.resource_type, id, name),
        data,
        meta,
    }
}
