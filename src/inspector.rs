//! Type inspection: per-type schemas derived once and cached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};
use tracing::debug;

use crate::naming::NamingConfig;
use crate::record::{Capabilities, Resource};

/// An exposed attribute: serde key and wire name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeField {
    pub key: String,
    pub wire_name: String,
}

/// Everything the encoder and decoder need to know about a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    /// Rust-side type name.
    pub type_name: String,
    /// Wire resource type, e.g. `simplePosts`.
    pub resource_type: String,
    /// Serde key of the identifier.
    pub id_field: String,
    /// Serde keys never exposed as attributes.
    pub excluded: Vec<String>,
    /// Exposed attributes in declaration order.
    pub fields: Vec<AttributeField>,
    pub capabilities: Capabilities,
}

impl TypeSchema {
    pub fn has(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// True unless `key` is the identifier or an excluded field.
    pub fn is_exposed(&self, key: &str) -> bool {
        key != self.id_field && !self.excluded.iter().any(|e| e == key)
    }

    /// Wire name of the serde field `key`.
    pub fn wire_name(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.wire_name.as_str())
    }

    /// Serde key of the attribute sent as `wire_name`.
    pub fn field_for_wire(&self, wire_name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.wire_name == wire_name)
            .map(|f| f.key.as_str())
    }

    /// Build the attributes map from a record's serialized fields.
    ///
    /// Keys missing from the cached field list (e.g. skipped when the default
    /// value was serialized) are named on the fly.
    pub fn attributes(
        &self,
        fields: &Map<String, Value>,
        naming: &NamingConfig,
    ) -> Map<String, Value> {
        fields
            .iter()
            .filter(|(key, _)| self.is_exposed(key))
            .map(|(key, value)| {
                let wire = self
                    .wire_name(key)
                    .map(String::from)
                    .unwrap_or_else(|| naming.jsonify(key));
                (wire, value.clone())
            })
            .collect()
    }

    pub(crate) fn exposed_fields(
        fields: &Map<String, Value>,
        id_field: &str,
        excluded: &[String],
        naming: &NamingConfig,
    ) -> Vec<AttributeField> {
        fields
            .keys()
            .filter(|key| key.as_str() != id_field && !excluded.iter().any(|e| e == *key))
            .map(|key| AttributeField {
                key: key.clone(),
                wire_name: naming.jsonify(key),
            })
            .collect()
    }
}

/// Derives and caches [`TypeSchema`]s.
///
/// Owns the naming tables; both are fixed for the inspector's lifetime.
#[derive(Debug, Default)]
pub struct TypeInspector {
    naming: NamingConfig,
    cache: RwLock<HashMap<TypeId, Arc<TypeSchema>>>,
}

impl TypeInspector {
    pub fn new(naming: NamingConfig) -> Self {
        Self {
            naming,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    /// Schema of `T`, built on first use.
    pub fn schema_of<T: Resource>(&self) -> Arc<TypeSchema> {
        let key = TypeId::of::<T>();
        if let Some(schema) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(schema);
        }

        let schema = Arc::new(self.build_schema::<T>());
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert(schema))
    }

    /// Resource type name of `T`: naming override, else route name, else
    /// the pluralized formatted type name.
    pub fn resource_type_of<T: Resource>(&self) -> String {
        self.schema_of::<T>().resource_type.clone()
    }

    fn build_schema<T: Resource>(&self) -> TypeSchema {
        let resource_type = T::RESOURCE_NAME
            .or(T::ROUTE_NAME)
            .map(String::from)
            .unwrap_or_else(|| self.naming.resource_type_name(T::TYPE_NAME));
        let excluded: Vec<String> = T::EXCLUDED_FIELDS.iter().map(|s| s.to_string()).collect();

        let mut fields = match serde_json::to_value(T::default()) {
            Ok(Value::Object(map)) => {
                TypeSchema::exposed_fields(&map, T::ID_FIELD, &excluded, &self.naming)
            }
            _ => Vec::new(),
        };

        // Settable attributes the default value did not serialize.
        for key in T::ATTRIBUTES {
            let known = fields.iter().any(|f| f.key == *key);
            if !known && *key != T::ID_FIELD && !excluded.iter().any(|e| e == key) {
                fields.push(AttributeField {
                    key: key.to_string(),
                    wire_name: self.naming.jsonify(key),
                });
            }
        }

        debug!(
            type_name = T::TYPE_NAME,
            resource_type = %resource_type,
            fields = fields.len(),
            "built type schema"
        );

        TypeSchema {
            type_name: T::TYPE_NAME.to_string(),
            resource_type,
            id_field: T::ID_FIELD.to_string(),
            excluded,
            fields,
            capabilities: T::CAPABILITIES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct SimplePost {
        id: String,
        title: String,
        author_id: String,
        internal_notes: String,
    }

    impl Resource for SimplePost {
        const TYPE_NAME: &'static str = "SimplePost";
        const EXCLUDED_FIELDS: &'static [&'static str] = &["internal_notes"];
        const CAPABILITIES: Capabilities = Capabilities::REFERENCES;

        crate::resource_attributes!(title, author_id, internal_notes);

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.id = id.to_string();
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Renamed {
        key: String,
    }

    impl Resource for Renamed {
        const TYPE_NAME: &'static str = "Renamed";
        const RESOURCE_NAME: Option<&'static str> = Some("custom-things");
        const ROUTE_NAME: Option<&'static str> = Some("ignored");
        const ID_FIELD: &'static str = "key";

        crate::resource_attributes!(key);

        fn id(&self) -> String {
            self.key.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.key = id.to_string();
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Routed {
        id: String,
    }

    impl Resource for Routed {
        const TYPE_NAME: &'static str = "Routed";
        const ROUTE_NAME: Option<&'static str> = Some("routes");

        crate::resource_attributes!();

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.id = id.to_string();
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Draft {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
        word_count: u32,
    }

    impl Resource for Draft {
        const TYPE_NAME: &'static str = "Draft";

        crate::resource_attributes!(subtitle, word_count);

        fn id(&self) -> String {
            self.id.clone()
        }

        fn set_id(&mut self, id: &str) -> Result<(), RecordError> {
            self.id = id.to_string();
            Ok(())
        }
    }

    #[test]
    fn settable_attributes_join_the_schema() {
        let inspector = TypeInspector::default();
        let schema = inspector.schema_of::<Draft>();

        let wire: Vec<&str> = schema.fields.iter().map(|f| f.wire_name.as_str()).collect();
        assert_eq!(wire, vec!["wordCount", "subtitle"]);
        assert_eq!(schema.field_for_wire("subtitle"), Some("subtitle"));
    }

    #[test]
    fn schema_lists_exposed_fields_in_order() {
        let inspector = TypeInspector::default();
        let schema = inspector.schema_of::<SimplePost>();

        assert_eq!(schema.resource_type, "simplePosts");
        let wire: Vec<&str> = schema.fields.iter().map(|f| f.wire_name.as_str()).collect();
        assert_eq!(wire, vec!["title", "authorID"]);
        assert_eq!(schema.field_for_wire("authorID"), Some("author_id"));
        assert!(schema.has(Capabilities::REFERENCES));
        assert!(!schema.has(Capabilities::CUSTOM_META));
    }

    #[test]
    fn schema_is_cached() {
        let inspector = TypeInspector::default();
        let first = inspector.schema_of::<SimplePost>();
        let second = inspector.schema_of::<SimplePost>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn naming_override_wins_over_route_name() {
        let inspector = TypeInspector::default();
        assert_eq!(inspector.resource_type_of::<Renamed>(), "custom-things");
        assert_eq!(inspector.resource_type_of::<Routed>(), "routes");
    }

    #[test]
    fn custom_id_field_is_not_an_attribute() {
        let inspector = TypeInspector::default();
        let schema = inspector.schema_of::<Renamed>();
        assert!(schema.fields.is_empty());
        assert!(!schema.is_exposed("key"));
    }

    #[test]
    fn attributes_skip_identifier_and_excluded() {
        let inspector = TypeInspector::default();
        let schema = inspector.schema_of::<SimplePost>();
        let fields = json!({
            "id": "1",
            "title": "Hello",
            "author_id": "7",
            "internal_notes": "secret"
        });

        let attrs = schema.attributes(fields.as_object().unwrap(), inspector.naming());
        assert_eq!(
            Value::Object(attrs),
            json!({ "title": "Hello", "authorID": "7" })
        );
    }
}
