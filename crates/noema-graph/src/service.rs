//! The knowledge-graph facade: one orchestrator per process, holding the
//! immutable schema registry and a handle to the store.
//!
//! Each operation follows the same shape: resolve types, validate, build
//! a parameterized query, execute through [`GraphStore`], and shape the
//! raw rows into response records. Validation and argument errors are
//! raised before the store is touched. The facade holds no mutable state,
//! so it is safe to share across concurrent operations.

use std::sync::Arc;

use serde_json::Value;

use noema_core::types::{EntityRecord, PropertyMap};
use noema_schema::SchemaRegistry;

use crate::error::{GraphError, Result};
use crate::store::{GraphStore, RecordMap, StoreError};

/// Property names managed by the access layer itself, never validated
/// against the schema.
pub(crate) const RESERVED_PROPERTIES: [&str; 1] = ["provenance"];

/// Schema-validated access layer over a graph store.
#[derive(Clone)]
pub struct KnowledgeGraph {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn GraphStore>,
}

impl KnowledgeGraph {
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<dyn GraphStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    /// Whether the backing store answers a liveness probe.
    pub async fn store_available(&self) -> bool {
        self.store.exists().await
    }
}

// ── Row shaping helpers ───────────────────────────────────────────

/// Shape a `{entity, labels}` row into an [`EntityRecord`].
pub(crate) fn entity_from_record(record: &RecordMap) -> Result<EntityRecord> {
    let properties = object_field(record, "entity")?;
    let id = properties
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let entity_type = entity_type_from_labels(record.get("labels"));
    Ok(EntityRecord {
        id,
        entity_type,
        properties,
    })
}

/// The specific type label of a node, skipping the base `Entity` label.
pub(crate) fn entity_type_from_labels(labels: Option<&Value>) -> String {
    labels
        .and_then(Value::as_array)
        .and_then(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .find(|label| *label != "Entity")
        })
        .unwrap_or("Entity")
        .to_string()
}

pub(crate) fn object_field(record: &RecordMap, key: &str) -> Result<PropertyMap> {
    match record.get(key) {
        Some(Value::Object(map)) => Ok(map.clone()),
        other => Err(conversion(format!(
            "expected object at '{key}', got: {other:?}"
        ))),
    }
}

pub(crate) fn string_field(record: &RecordMap, key: &str) -> Result<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| conversion(format!("expected string at '{key}'")))
}

pub(crate) fn count_from(rows: &[RecordMap]) -> i64 {
    rows.first()
        .and_then(|row| row.get("total"))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

pub(crate) fn conversion(message: String) -> GraphError {
    GraphError::Store(StoreError::Conversion(message))
}

/// Relabel an entity-level NotFound with the role the entity played in
/// the failing operation.
pub(crate) fn rekind(kind: &'static str) -> impl FnOnce(GraphError) -> GraphError {
    move |e| match e {
        GraphError::NotFound { id, .. } => GraphError::NotFound { kind, id },
        other => other,
    }
}

/// Encode values the store cannot hold as node properties: nested objects
/// (and arrays containing them) become JSON strings.
pub(crate) fn encode_for_storage(properties: &mut PropertyMap) {
    for value in properties.values_mut() {
        let nested = match value {
            Value::Object(_) => true,
            Value::Array(items) => items.iter().any(|v| v.is_object() || v.is_array()),
            _ => false,
        };
        if nested {
            *value = Value::String(value.to_string());
        }
    }
}
