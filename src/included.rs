//! Included-resource collection.
//!
//! Walks [`Record::included_records`] recursively and flattens every related
//! record into one list. The first occurrence of a `(type, id)` pair wins;
//! later ones are dropped without being walked again, which also ends
//! cycles.

use std::collections::HashSet;

use tracing::trace;

use crate::encoder::encode_record;
use crate::error::EncodeError;
use crate::inspector::TypeInspector;
use crate::record::{Capabilities, Record};
use crate::types::{ResourceObject, ServerInfo};

/// Per-call accumulator of included resources.
pub struct IncludedCollector<'a> {
    inspector: &'a TypeInspector,
    server: Option<&'a ServerInfo>,
    visited: HashSet<(String, String)>,
    included: Vec<ResourceObject>,
}

impl<'a> IncludedCollector<'a> {
    pub fn new(inspector: &'a TypeInspector, server: Option<&'a ServerInfo>) -> Self {
        Self {
            inspector,
            server,
            visited: HashSet::new(),
            included: Vec::new(),
        }
    }

    /// Record `(resource_type, id)` as seen. Returns false if it already was.
    pub fn mark_visited(&mut self, resource_type: &str, id: &str) -> bool {
        self.visited
            .insert((resource_type.to_string(), id.to_string()))
    }

    /// Collect the related records reachable from `record`.
    pub fn collect(&mut self, record: &dyn Record) -> Result<(), EncodeError> {
        let schema = record.record_schema(self.inspector);
        if !schema.has(Capabilities::INCLUDED_RELATIONS) {
            return Ok(());
        }

        // nil entries are skipped
        for related in record.included_records().into_iter().flatten() {
            let related_schema = related.record_schema(self.inspector);
            let id = related.record_id();
            if !self.mark_visited(&related_schema.resource_type, &id) {
                trace!(
                    resource_type = %related_schema.resource_type,
                    id = %id,
                    "duplicate included resource dropped"
                );
                continue;
            }

            let object = encode_record(related, self.inspector, self.server)?;
            self.included.push(object);
            self.collect(related)?;
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.included.len()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    /// Included resources in discovery order.
    pub fn into_included(self) -> Vec<ResourceObject> {
        self.included
    }
}
