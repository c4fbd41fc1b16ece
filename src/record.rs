//! Record capabilities.
//!
//! Users implement [`Resource`] for their types. The engine walks records
//! through the object-safe [`Record`] trait, which every `Resource` gets via
//! a blanket impl, so heterogeneous collections and related records of
//! different types can be encoded in one pass.
//!
//! Optional behaviors are opted into with [`Resource::CAPABILITIES`]. The
//! engine only calls a capability method when its flag is set; the flags are
//! read once per type and cached in the [`TypeSchema`].
//!
//! # Example
//!
//! ```
//! use jsonapi_codec::{Capabilities, Codec, RecordError, Reference, Resource};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Clone, Serialize, Deserialize)]
//! struct Widget {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Resource for Widget {
//!     const TYPE_NAME: &'static str = "Widget";
//!     const CAPABILITIES: Capabilities = Capabilities::REFERENCES;
//!
//!     fn id(&self) -> String {
//!         self.id.clone()
//!     }
//!
//!     fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
//!         self.id = id.to_string();
//!         Ok(())
//!     }
//!
//!     jsonapi_codec::resource_attributes!(name);
//!
//!     fn references(&self) -> Vec<Reference> {
//!         vec![Reference::new("tags", "tags")]
//!     }
//! }
//!
//! let widget = Widget {
//!     id: "1".into(),
//!     name: "Test".into(),
//! };
//! let doc = Codec::default().encode(&widget).unwrap();
//! assert_eq!(
//!     doc.to_value().unwrap(),
//!     serde_json::json!({
//!         "data": {
//!             "type": "widgets",
//!             "id": "1",
//!             "attributes": { "name": "Test" },
//!             "relationships": { "tags": { "data": [] } }
//!         }
//!     })
//! );
//! ```

use std::any::TypeId;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::RecordError;
use crate::inspector::{TypeInspector, TypeSchema};
use crate::naming::NamingConfig;
use crate::types::{Links, Meta, ResourceIdentifier, ServerInfo};

/// Set of optional behaviors a record type implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const NONE: Self = Self(0);
    /// [`Resource::references`]
    pub const REFERENCES: Self = Self(1 << 0);
    /// [`Resource::reference_ids`]
    pub const LINKED_RELATIONS: Self = Self(1 << 1);
    /// [`Resource::referenced_records`]
    pub const INCLUDED_RELATIONS: Self = Self(1 << 2);
    /// [`Resource::links`]
    pub const CUSTOM_LINKS: Self = Self(1 << 3);
    /// [`Resource::meta`]
    pub const CUSTOM_META: Self = Self(1 << 4);
    /// [`Resource::set_to_one`]
    pub const TO_ONE_MUTATOR: Self = Self(1 << 5);
    /// [`Resource::set_to_many`]
    pub const TO_MANY_MUTATOR: Self = Self(1 << 6);
    /// [`Resource::relationship_meta`]
    pub const RELATIONSHIP_META: Self = Self(1 << 7);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Declared cardinality of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    /// To-many if the name is its own plural, to-one otherwise.
    #[default]
    Inferred,
    ToOne,
    ToMany,
}

impl Cardinality {
    /// Resolve to a concrete kind for the relationship `name`.
    pub fn resolve(self, name: &str, naming: &NamingConfig) -> RelationshipKind {
        match self {
            Cardinality::ToOne => RelationshipKind::ToOne,
            Cardinality::ToMany => RelationshipKind::ToMany,
            Cardinality::Inferred if naming.is_plural(name) => RelationshipKind::ToMany,
            Cardinality::Inferred => RelationshipKind::ToOne,
        }
    }
}

/// Resolved kind of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    ToOne,
    ToMany,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::ToOne => f.write_str("to-one"),
            RelationshipKind::ToMany => f.write_str("to-many"),
        }
    }
}

/// A relationship slot a record may have, populated or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Resource type of the related records.
    pub resource_type: String,
    /// Relationship name.
    pub name: String,
    pub cardinality: Cardinality,
    /// The relation was not fetched; its linkage is omitted instead of
    /// being reported empty.
    pub not_loaded: bool,
}

impl Reference {
    /// Reference whose cardinality is inferred from `name`.
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            cardinality: Cardinality::Inferred,
            not_loaded: false,
        }
    }

    pub fn to_one(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::ToOne,
            ..Self::new(resource_type, name)
        }
    }

    pub fn to_many(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::ToMany,
            ..Self::new(resource_type, name)
        }
    }

    /// Mark the relation as not fetched.
    pub fn unloaded(mut self) -> Self {
        self.not_loaded = true;
        self
    }
}

/// One concrete relationship instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceId {
    pub resource_type: String,
    pub name: String,
    pub id: String,
}

impl ReferenceId {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            id: id.into(),
        }
    }

    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.resource_type.clone(), self.id.clone())
    }
}

/// A record type exchanged through JSON:API documents.
///
/// Attributes are the record's serde fields minus [`Self::ID_FIELD`] and
/// [`Self::EXCLUDED_FIELDS`]. Decoding writes each payload attribute through
/// [`Self::set_attribute`] onto a copy of the existing record, so fields the
/// payload does not carry (including `#[serde(skip)]` state) are kept as is.
pub trait Resource: Serialize + DeserializeOwned + Clone + Default + 'static {
    /// Rust-side type name the resource type is derived from, e.g. `"SimplePost"`.
    const TYPE_NAME: &'static str;

    /// Used verbatim as the resource type name when set.
    const RESOURCE_NAME: Option<&'static str> = None;

    /// Route name, used when [`Self::RESOURCE_NAME`] is not set.
    const ROUTE_NAME: Option<&'static str> = None;

    /// Serde key of the identifier field.
    const ID_FIELD: &'static str = "id";

    /// Serde keys never exposed as attributes.
    const EXCLUDED_FIELDS: &'static [&'static str] = &[];

    const CAPABILITIES: Capabilities = Capabilities::NONE;

    /// Serde keys accepted by [`Self::set_attribute`].
    const ATTRIBUTES: &'static [&'static str] = &[];

    fn id(&self) -> String;

    fn set_id(&mut self, id: &str) -> Result<(), RecordError>;

    /// Write one decoded attribute. `key` is the serde field name; returns
    /// `Ok(false)` for keys the type does not accept.
    ///
    /// Usually generated with [`resource_attributes!`](crate::resource_attributes).
    fn set_attribute(&mut self, key: &str, value: Value) -> Result<bool, serde_json::Error>;

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn reference_ids(&self) -> Vec<ReferenceId> {
        Vec::new()
    }

    /// Related records to include. `None` entries are skipped.
    fn referenced_records(&self) -> Vec<Option<&dyn Record>> {
        Vec::new()
    }

    /// Set or clear (`None`) a to-one relationship.
    fn set_to_one(
        &mut self,
        name: &str,
        _target: Option<&ResourceIdentifier>,
    ) -> Result<(), RecordError> {
        Err(RecordError::new(format!("no to-one relationship \"{}\"", name)))
    }

    /// Replace a to-many relationship.
    fn set_to_many(
        &mut self,
        name: &str,
        _targets: &[ResourceIdentifier],
    ) -> Result<(), RecordError> {
        Err(RecordError::new(format!("no to-many relationship \"{}\"", name)))
    }

    /// Custom resource links, merged over the generated `self` link.
    fn links(&self, _server: Option<&ServerInfo>) -> Links {
        Links::new()
    }

    fn meta(&self) -> Option<Meta> {
        None
    }

    fn relationship_meta(&self, _name: &str) -> Option<Meta> {
        None
    }
}

/// Object-safe view of a [`Resource`] used by the encoder.
pub trait Record {
    fn record_type(&self) -> TypeId;

    fn record_type_name(&self) -> &'static str;

    fn record_schema(&self, inspector: &TypeInspector) -> Arc<TypeSchema>;

    fn record_id(&self) -> String;

    /// The record serialized to a JSON object keyed by serde field names.
    fn record_fields(&self) -> Result<Value, serde_json::Error>;

    fn declared_references(&self) -> Vec<Reference>;

    fn linked_ids(&self) -> Vec<ReferenceId>;

    fn included_records(&self) -> Vec<Option<&dyn Record>>;

    fn record_links(&self, server: Option<&ServerInfo>) -> Links;

    fn record_meta(&self) -> Option<Meta>;

    fn record_relationship_meta(&self, name: &str) -> Option<Meta>;
}

impl<T: Resource> Record for T {
    fn record_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn record_type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn record_schema(&self, inspector: &TypeInspector) -> Arc<TypeSchema> {
        inspector.schema_of::<T>()
    }

    fn record_id(&self) -> String {
        Resource::id(self)
    }

    fn record_fields(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn declared_references(&self) -> Vec<Reference> {
        Resource::references(self)
    }

    fn linked_ids(&self) -> Vec<ReferenceId> {
        Resource::reference_ids(self)
    }

    fn included_records(&self) -> Vec<Option<&dyn Record>> {
        Resource::referenced_records(self)
    }

    fn record_links(&self, server: Option<&ServerInfo>) -> Links {
        Resource::links(self, server)
    }

    fn record_meta(&self) -> Option<Meta> {
        Resource::meta(self)
    }

    fn record_relationship_meta(&self, name: &str) -> Option<Meta> {
        Resource::relationship_meta(self, name)
    }
}

/// Implements [`Resource::set_attribute`] and [`Resource::ATTRIBUTES`] for the
/// listed fields, inside an `impl Resource` block.
///
/// A field whose serde key differs from its Rust name is written
/// `field = "key"`. Values are decoded with the field type's `Deserialize`;
/// field-level `#[serde(with = ...)]` adapters are not applied.
///
/// ```ignore
/// impl Resource for Post {
///     const TYPE_NAME: &'static str = "Post";
///
///     jsonapi_codec::resource_attributes!(title, view_count, kind = "type");
///     // id / set_id ...
/// }
/// ```
#[macro_export]
macro_rules! resource_attributes {
    ($($field:ident $(= $key:literal)?),* $(,)?) => {
        const ATTRIBUTES: &'static [&'static str] =
            &[$($crate::__attribute_key!($field $(, $key)?)),*];

        #[allow(unused_variables)]
        fn set_attribute(
            &mut self,
            key: &str,
            value: $crate::__private::Value,
        ) -> ::std::result::Result<bool, $crate::__private::serde_json::Error> {
            $(
                if key == $crate::__attribute_key!($field $(, $key)?) {
                    self.$field = $crate::__private::serde_json::from_value(value)?;
                    return ::std::result::Result::Ok(true);
                }
            )*
            ::std::result::Result::Ok(false)
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __attribute_key {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $key:literal) => {
        $key
    };
}

/// Root input of an encode call.
///
/// `None` models a nil record: rejected at the root, and reported as a
/// non-conforming element inside a collection.
pub enum Payload<'a> {
    One(Option<&'a dyn Record>),
    Many(Vec<Option<&'a dyn Record>>),
}

impl<'a> Payload<'a> {
    pub fn one(record: &'a dyn Record) -> Self {
        Payload::One(Some(record))
    }

    /// Homogeneous collection.
    pub fn many<T: Resource>(records: &'a [T]) -> Self {
        Payload::Many(records.iter().map(|r| Some(r as &dyn Record)).collect())
    }
}
