//! JSON:API codec
//!
//! Encodes typed Rust records into JSON:API-style documents and merges such
//! documents back into records.
//!
//! # Example
//!
//! ```
//! use jsonapi_codec::{Codec, RecordError, Resource};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
//! struct SimplePost {
//!     id: String,
//!     title: String,
//!     view_count: u32,
//! }
//!
//! impl Resource for SimplePost {
//!     const TYPE_NAME: &'static str = "SimplePost";
//!
//!     jsonapi_codec::resource_attributes!(title, view_count);
//!
//!     fn id(&self) -> String {
//!         self.id.clone()
//!     }
//!
//!     fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
//!         self.id = id.to_string();
//!         Ok(())
//!     }
//! }
//!
//! let codec = Codec::default();
//! let post = SimplePost {
//!     id: "1".into(),
//!     title: "Hello".into(),
//!     view_count: 3,
//! };
//!
//! let value = codec.encode(&post).unwrap().to_value().unwrap();
//! assert_eq!(value["data"]["type"], "simplePosts");
//! assert_eq!(value["data"]["attributes"]["viewCount"], 3);
//!
//! let mut decoded = SimplePost::default();
//! codec.decode(&value.to_string(), &mut decoded).unwrap();
//! assert_eq!(decoded, post);
//! ```
//!
//! # Relationship data
//!
//! | Record state | Encoded `data` |
//! |--------------|----------------|
//! | to-many with ids | array of identifiers |
//! | to-one with ids | first identifier |
//! | declared to-many, no ids | `[]` |
//! | declared to-one, no ids | `null` |
//! | declared, not loaded | omitted |
//!
//! # Naming
//!
//! Field names become camelCase wire names (`user_id` → `userID`), type names
//! become pluralized camelCase resource types (`SimplePost` → `simplePosts`,
//! `Category` → `categories`). See [`NamingConfig`] for the tables.

mod codec;
mod decoder;
mod encoder;
mod error;
mod included;
mod inspector;
pub mod legacy;
mod naming;
mod record;
mod relationships;
mod types;
mod validator;

pub use codec::Codec;
pub use decoder::{decode, decode_document, decode_document_many, decode_many, parse_document};
pub use encoder::{encode_payload, encode_record, EncodeOptions};
pub use error::{DecodeError, EncodeError, RecordError, SchemaError, ValidateError};
pub use included::IncludedCollector;
pub use inspector::{AttributeField, TypeInspector, TypeSchema};
pub use legacy::{decode_legacy, decode_legacy_many, encode_legacy, encode_legacy_value};
pub use naming::{NamingConfig, NamingOverrides};
pub use record::{
    Capabilities, Cardinality, Payload, Record, Reference, ReferenceId, RelationshipKind,
    Resource,
};
pub use relationships::{relationship_links, resolve_relationships};
pub use types::{
    json_type_name, Document, Link, Links, Meta, PrimaryData, Relationship, RelationshipData,
    ResourceIdentifier, ResourceObject, ServerInfo,
};
pub use validator::{envelope_schema, validate_against_schema, validate_document};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
    pub use serde_json::Value;
}
