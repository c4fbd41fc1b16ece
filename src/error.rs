//! Error types for encoding, decoding and validation.

use std::fmt;
use thiserror::Error;

use crate::record::RelationshipKind;

/// Errors while encoding records into a document.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("collection element {index} does not conform: {reason}")]
    NonConformingElement { index: usize, reason: String },

    #[error("unsupported input kind: expected object or array, got {actual}")]
    InvalidInputKind { actual: String },

    #[error("cannot serialize {type_name}: {source}")]
    Serialize {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors while decoding a document into records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid document: {source}")]
    ParseError {
        #[source]
        source: serde_json::Error,
    },

    #[error("shape mismatch: target expects {expected} data, document has {actual}")]
    ShapeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("type mismatch: expected \"{expected}\", got \"{actual}\"")]
    TypeMismatch { expected: String, actual: String },

    #[error("resource \"{resource_type}\" has no attributes object")]
    MissingAttributes { resource_type: String },

    #[error("invalid attributes for \"{resource_type}\": {source}")]
    InvalidAttribute {
        resource_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("\"{resource_type}\" does not support {kind} relationship \"{name}\"")]
    UnsupportedRelationshipKind {
        resource_type: String,
        name: String,
        kind: RelationshipKind,
    },

    #[error("{type_name} has no identity: {reason}")]
    IdentityCapabilityMissing { type_name: String, reason: String },

    #[error("\"{resource_type}\" rejected the update: {source}")]
    Rejected {
        resource_type: String,
        #[source]
        source: RecordError,
    },
}

/// Error returned by record mutators (identity assignment, relationship
/// setters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub message: String,
}

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RecordError {}

/// Errors during envelope validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid envelope schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid member.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
