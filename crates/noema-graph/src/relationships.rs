//! Relationship operations.
//!
//! Creation verifies both endpoints exist before anything else: a missing
//! endpoint fails fast and the store's write path is never touched.

use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use noema_core::types::{Direction, Page, PageMeta, PageRequest, PropertyMap, RelationshipRecord};
use noema_schema::{validate_endpoints, validate_properties};

use crate::cypher;
use crate::error::{GraphError, Result};
use crate::service::{
    count_from, encode_for_storage, object_field, rekind, string_field, KnowledgeGraph,
};
use crate::store::RecordMap;

impl KnowledgeGraph {
    /// Create a relationship between two existing entities.
    pub async fn create_relationship(
        &self,
        source_id: &str,
        rel_type: &str,
        target_id: &str,
        properties: Option<&PropertyMap>,
    ) -> Result<RelationshipRecord> {
        let def = self.resolve_relationship_type_checked(rel_type)?;
        info!(rel_type, source_id, target_id, "Creating relationship");

        let source = self
            .get_entity(source_id)
            .await
            .map_err(rekind("Source entity"))?;
        let target = self
            .get_entity(target_id)
            .await
            .map_err(rekind("Target entity"))?;

        let record = properties.cloned().unwrap_or_default();
        let mut violations =
            validate_endpoints(rel_type, def, &source.entity_type, &target.entity_type);
        violations.extend(validate_properties(rel_type, &def.properties, &record));
        if !violations.is_empty() {
            return Err(GraphError::ValidationFailed { violations });
        }

        let rel_id = Uuid::new_v4().to_string();
        let mut stored = record.clone();
        encode_for_storage(&mut stored);
        stored.insert("id".to_string(), Value::String(rel_id.clone()));

        let query = cypher::create_relationship(rel_type, source_id, target_id, stored)?;
        self.store().execute_write(&query).await?;
        debug!(rel_type, id = %rel_id, "Relationship created");

        Ok(RelationshipRecord {
            id: rel_id,
            rel_type: rel_type.to_string(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            properties: record,
        })
    }

    /// Fetch the relationship of the given type between two entities.
    pub async fn get_relationship(
        &self,
        source_id: &str,
        rel_type: &str,
        target_id: &str,
    ) -> Result<RelationshipRecord> {
        self.resolve_relationship_type_checked(rel_type)?;

        let query = cypher::relationship_between(source_id, rel_type, target_id)?;
        let rows = self.store().execute_read(&query).await?;
        let Some(row) = rows.first() else {
            return Err(GraphError::NotFound {
                kind: "Relationship",
                id: format!("({source_id})-[{rel_type}]->({target_id})"),
            });
        };

        let properties = object_field(row, "relationship")?;
        let id = properties
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(RelationshipRecord {
            id,
            rel_type: string_field(row, "rel_type")?,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            properties,
        })
    }

    /// Delete the relationship of the given type between two entities.
    pub async fn delete_relationship(
        &self,
        source_id: &str,
        rel_type: &str,
        target_id: &str,
    ) -> Result<()> {
        self.get_relationship(source_id, rel_type, target_id).await?;

        let query = cypher::delete_relationship(source_id, rel_type, target_id)?;
        self.store().execute_write(&query).await?;
        info!(rel_type, source_id, target_id, "Relationship deleted");
        Ok(())
    }

    /// List relationships, optionally anchored to an entity and narrowed
    /// by type and direction, one page at a time.
    pub async fn list_relationships(
        &self,
        entity_id: Option<&str>,
        rel_type: Option<&str>,
        direction: Direction,
        page: PageRequest,
    ) -> Result<Page<RelationshipRecord>> {
        if let Some(t) = rel_type {
            self.resolve_relationship_type_checked(t)?;
        }

        let page = page.normalized();
        let queries =
            cypher::list_relationships(entity_id, rel_type, direction, page.skip(), page.page_size)?;

        let total = count_from(&self.store().execute_read(&queries.count).await?);
        let rows = self.store().execute_read(&queries.page).await?;
        let items = rows
            .iter()
            .map(relationship_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            pagination: PageMeta::compute(page, total),
        })
    }

    fn resolve_relationship_type_checked(
        &self,
        rel_type: &str,
    ) -> Result<&noema_schema::RelationshipTypeDef> {
        if rel_type.trim().is_empty() {
            return Err(GraphError::InvalidArgument(
                "relationship_type must not be blank".to_string(),
            ));
        }
        Ok(self.registry().resolve_relationship_type(rel_type)?)
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn relationship_from_row(row: &RecordMap) -> Result<RelationshipRecord> {
    let properties = object_field(row, "relationship")?;
    let id = properties
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(RelationshipRecord {
        id,
        rel_type: string_field(row, "rel_type")?,
        source_id: string_field(row, "source_id")?,
        target_id: string_field(row, "target_id")?,
        properties,
    })
}
