//! Envelope validation against the bundled document schema.

use serde_json::Value;

use crate::error::{SchemaError, ValidateError};

const ENVELOPE_SCHEMA: &str = include_str!("../schemas/envelope.json");

/// The JSON Schema documents are checked against.
pub fn envelope_schema() -> Result<Value, ValidateError> {
    serde_json::from_str(ENVELOPE_SCHEMA).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })
}

/// Validate a raw document's envelope: top-level members, resource objects,
/// relationship objects and links. Attribute values are not checked.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` with every violation found.
pub fn validate_document(document: &Value) -> Result<(), ValidateError> {
    let schema = envelope_schema()?;
    validate_against_schema(&schema, document)
}

/// Validate a value against an arbitrary schema.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_of(document: Value) -> Vec<SchemaError> {
        match validate_document(&document) {
            Err(ValidateError::Invalid { errors }) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn bundled_schema_compiles() {
        let schema = envelope_schema().unwrap();
        assert!(jsonschema::validator_for(&schema).is_ok());
    }

    #[test]
    fn accepts_single_collection_and_null() {
        let single = json!({
            "data": {
                "type": "widgets",
                "id": "1",
                "attributes": { "name": "Test" },
                "relationships": { "tags": { "data": [] } }
            }
        });
        assert!(validate_document(&single).is_ok());

        let many = json!({
            "data": [{ "type": "widgets", "id": "1" }],
            "included": [{ "type": "tags", "id": "2", "links": { "self": "http://x/tags/2" } }],
            "meta": { "total": 1 }
        });
        assert!(validate_document(&many).is_ok());

        assert!(validate_document(&json!({ "data": null })).is_ok());
    }

    #[test]
    fn missing_data_is_invalid() {
        let errors = errors_of(json!({ "meta": {} }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("data"));
    }

    #[test]
    fn resource_without_type_is_invalid() {
        let errors = errors_of(json!({ "data": [{ "id": "1" }] }));
        assert!(!errors.is_empty());
    }

    #[test]
    fn identifier_with_extra_members_is_invalid() {
        let errors = errors_of(json!({
            "data": {
                "type": "posts",
                "id": "1",
                "relationships": {
                    "author": { "data": { "type": "people", "id": "9", "name": "Ada" } }
                }
            }
        }));
        assert!(!errors.is_empty());
    }

    #[test]
    fn link_objects_need_href() {
        assert!(validate_document(&json!({
            "data": null,
            "links": { "self": { "href": "http://x", "meta": { "count": 1 } } }
        }))
        .is_ok());

        let errors = errors_of(json!({ "data": null, "links": { "self": { "meta": {} } } }));
        assert_eq!(errors[0].path, "/links/self");
    }

    #[test]
    fn numeric_id_is_invalid() {
        let errors = errors_of(json!({ "data": { "type": "widgets", "id": 1 } }));
        assert!(!errors.is_empty());
    }
}
