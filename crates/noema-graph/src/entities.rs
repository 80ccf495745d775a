//! Entity operations: validated mutations and filtered reads.

use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use noema_core::types::{EntityRecord, Page, PageMeta, PageRequest, PropertyMap};
use noema_schema::{validate_properties, EffectiveEntityType, PropertyKind};

use crate::cypher;
use crate::error::{GraphError, Result};
use crate::service::{
    conversion, count_from, encode_for_storage, entity_from_record, KnowledgeGraph,
    RESERVED_PROPERTIES,
};

impl KnowledgeGraph {
    /// Create a new entity of the given type.
    ///
    /// A missing `id` is filled with a generated uuid before validation;
    /// the caller's property map is never mutated, and nothing reaches the
    /// store unless the completed record passes validation. `provenance`
    /// is stored alongside the record but is not part of the schema.
    pub async fn create_entity(
        &self,
        entity_type: &str,
        properties: &PropertyMap,
        provenance: Option<&PropertyMap>,
    ) -> Result<EntityRecord> {
        let effective = self.resolve_entity_type_checked(entity_type)?;
        info!(entity_type, "Creating entity");

        let mut record = properties.clone();
        if !record.contains_key("id") {
            record.insert(
                "id".to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }

        let violations = validate_properties(&effective.name, &effective.properties, &record);
        if !violations.is_empty() {
            return Err(GraphError::ValidationFailed { violations });
        }

        let id = record
            .get("id")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        let mut stored = record.clone();
        encode_for_storage(&mut stored);
        if let Some(prov) = provenance {
            let rendered =
                serde_json::to_string(prov).map_err(|e| conversion(e.to_string()))?;
            stored.insert("provenance".to_string(), Value::String(rendered));
        }

        let query = cypher::create_entity(entity_type, stored)?;
        self.store().execute_write(&query).await?;
        debug!(entity_type, id = %id, "Entity created");

        Ok(EntityRecord {
            id,
            entity_type: entity_type.to_string(),
            properties: record,
        })
    }

    /// Fetch a single entity by id.
    pub async fn get_entity(&self, entity_id: &str) -> Result<EntityRecord> {
        let query = cypher::entity_by_id(entity_id)?;
        let rows = self.store().execute_read(&query).await?;
        match rows.first() {
            Some(row) => entity_from_record(row),
            None => Err(GraphError::not_found("Entity", entity_id)),
        }
    }

    /// List entities, optionally narrowed by type and property equality
    /// filters, one page at a time.
    pub async fn list_entities(
        &self,
        entity_type: Option<&str>,
        filters: &PropertyMap,
        page: PageRequest,
    ) -> Result<Page<EntityRecord>> {
        if let Some(t) = entity_type {
            self.resolve_entity_type_checked(t)?;
        }
        self.check_filter_keys(entity_type, filters)?;

        let page = page.normalized();
        let queries = cypher::list_entities(entity_type, filters, page.skip(), page.page_size)?;

        let total = count_from(&self.store().execute_read(&queries.count).await?);
        let rows = self.store().execute_read(&queries.page).await?;
        let items = rows
            .iter()
            .map(entity_from_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            pagination: PageMeta::compute(page, total),
        })
    }

    /// Find the single entity matching every given property value.
    pub async fn get_entity_by_properties(
        &self,
        entity_type: Option<&str>,
        properties: &PropertyMap,
    ) -> Result<EntityRecord> {
        if properties.is_empty() {
            return Err(GraphError::InvalidArgument(
                "at least one property to match is required".to_string(),
            ));
        }
        if let Some(t) = entity_type {
            self.resolve_entity_type_checked(t)?;
        }
        self.check_filter_keys(entity_type, properties)?;

        let query = cypher::entity_by_properties(entity_type, properties)?;
        let rows = self.store().execute_read(&query).await?;
        match rows.first() {
            Some(row) => entity_from_record(row),
            None => Err(GraphError::NotFound {
                kind: "Entity",
                id: Value::Object(properties.clone()).to_string(),
            }),
        }
    }

    /// Replace or extend an entity's properties. The merged record must
    /// re-pass validation in full; identity is immutable.
    pub async fn update_entity(
        &self,
        entity_id: &str,
        properties: &PropertyMap,
    ) -> Result<EntityRecord> {
        if let Some(id_value) = properties.get("id") {
            if id_value.as_str() != Some(entity_id) {
                return Err(GraphError::InvalidArgument(
                    "entity id is immutable".to_string(),
                ));
            }
        }

        let existing = self.get_entity(entity_id).await?;
        let effective = self.registry().resolve_entity_type(&existing.entity_type)?;
        info!(entity_id, entity_type = %existing.entity_type, "Updating entity");

        let mut merged = existing.properties.clone();
        let mut reserved = PropertyMap::new();
        for key in RESERVED_PROPERTIES {
            if let Some(value) = merged.remove(key) {
                reserved.insert(key.to_string(), value);
            }
        }
        merged.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        decode_declared(&effective, &mut merged);

        let violations = validate_properties(&effective.name, &effective.properties, &merged);
        if !violations.is_empty() {
            return Err(GraphError::ValidationFailed { violations });
        }

        let mut stored = merged.clone();
        encode_for_storage(&mut stored);
        stored.extend(reserved);

        let query = cypher::update_entity(entity_id, stored)?;
        self.store().execute_write(&query).await?;

        Ok(EntityRecord {
            id: entity_id.to_string(),
            entity_type: existing.entity_type,
            properties: merged,
        })
    }

    /// Delete an entity and, transactionally, its incident relationships.
    pub async fn delete_entity(&self, entity_id: &str) -> Result<()> {
        let existing = self.get_entity(entity_id).await?;
        info!(entity_id, entity_type = %existing.entity_type, "Deleting entity");

        let query = cypher::delete_entity(entity_id)?;
        self.store().execute_write(&query).await?;
        Ok(())
    }

    pub(crate) fn resolve_entity_type_checked(
        &self,
        entity_type: &str,
    ) -> Result<EffectiveEntityType> {
        if entity_type.trim().is_empty() {
            return Err(GraphError::InvalidArgument(
                "entity_type must not be blank".to_string(),
            ));
        }
        Ok(self.registry().resolve_entity_type(entity_type)?)
    }

    /// Whitelist filter property names against the registry before they
    /// are spliced into query text.
    fn check_filter_keys(&self, entity_type: Option<&str>, filters: &PropertyMap) -> Result<()> {
        let effective = match entity_type {
            Some(t) => Some(self.registry().resolve_entity_type(t)?),
            None => None,
        };
        for key in filters.keys() {
            if key == "id" {
                continue;
            }
            let known = match &effective {
                Some(e) => e.properties.contains_key(key),
                None => self.registry().is_known_property(key),
            };
            if !known {
                return Err(GraphError::InvalidArgument(format!(
                    "property '{key}' is not declared in the schema"
                )));
            }
        }
        Ok(())
    }
}

/// Object- and array-kinded properties come back from the store as the
/// JSON strings they were encoded as; restore them before re-validation.
fn decode_declared(effective: &EffectiveEntityType, properties: &mut PropertyMap) {
    for (key, value) in properties.iter_mut() {
        let Some(constraint) = effective.properties.get(key) else {
            continue;
        };
        if !matches!(constraint.kind, PropertyKind::Object | PropertyKind::Array) {
            continue;
        }
        if let Value::String(text) = value {
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                if constraint.kind.matches(&parsed) {
                    *value = parsed;
                }
            }
        }
    }
}
