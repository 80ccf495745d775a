//! Exploration operations: free-text search, path finding, tier-scoped
//! views, and the symbol/concept and cross-domain lookups.

use serde_json::Value;
use tracing::{debug, info};

use noema_core::types::{
    CrossDomainResult, DomainMapping, EntityRecord, GraphPath, PathRelationship, PropertyMap,
    RelatedEntity, Tier, TieredEntity, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

use crate::cypher::{self, PathMode};
use crate::error::{GraphError, Result};
use crate::service::{
    entity_from_record, entity_type_from_labels, object_field, rekind, string_field,
    KnowledgeGraph,
};
use crate::store::RecordMap;
use crate::tier;

impl KnowledgeGraph {
    /// Free-text search over the searchable properties. Every
    /// whitespace-separated term must match somewhere; terms are
    /// case-insensitive substrings.
    pub async fn search_entities(
        &self,
        query_text: &str,
        entity_types: Option<&[String]>,
        limit: Option<i64>,
    ) -> Result<Vec<EntityRecord>> {
        let terms: Vec<&str> = query_text.split_whitespace().collect();
        if terms.is_empty() {
            return Err(GraphError::InvalidArgument(
                "search query must not be blank".to_string(),
            ));
        }

        let types: Vec<String> = match entity_types {
            Some(types) if !types.is_empty() => types.to_vec(),
            _ => vec!["Concept".to_string(), "Symbol".to_string()],
        };
        for t in &types {
            self.resolve_entity_type_checked(t)?;
        }

        let limit = match limit {
            Some(l) if l > 0 && l <= MAX_PAGE_SIZE => l,
            _ => DEFAULT_PAGE_SIZE,
        };
        info!(query = query_text, limit, "Searching entities");

        let query = cypher::search_entities(&terms, &types, limit)?;
        let rows = self.store().execute_read(&query).await?;
        rows.iter().map(entity_from_record).collect()
    }

    /// Single shortest path between two entities. Absence of a path is a
    /// successful empty result.
    pub async fn find_path(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: Option<i64>,
        relationship_types: Option<&[String]>,
    ) -> Result<Vec<GraphPath>> {
        self.shortest_paths(
            source_id,
            target_id,
            max_depth,
            relationship_types,
            PathMode::SingleShortest,
        )
        .await
    }

    /// All shortest paths between two entities.
    pub async fn find_paths(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: Option<i64>,
        relationship_types: Option<&[String]>,
    ) -> Result<Vec<GraphPath>> {
        self.shortest_paths(
            source_id,
            target_id,
            max_depth,
            relationship_types,
            PathMode::AllShortest,
        )
        .await
    }

    async fn shortest_paths(
        &self,
        source_id: &str,
        target_id: &str,
        max_depth: Option<i64>,
        relationship_types: Option<&[String]>,
        mode: PathMode,
    ) -> Result<Vec<GraphPath>> {
        let source = self
            .get_entity(source_id)
            .await
            .map_err(rekind("Source entity"))?;
        self.get_entity(target_id)
            .await
            .map_err(rekind("Target entity"))?;
        info!(source_id, target_id, "Finding paths");

        // An entity is trivially connected to itself.
        if source_id == target_id {
            return Ok(vec![GraphPath {
                length: 0,
                nodes: vec![source.properties],
                relationships: Vec::new(),
            }]);
        }

        let rel_types: Vec<String> = relationship_types.map(<[String]>::to_vec).unwrap_or_default();
        for t in &rel_types {
            self.registry().resolve_relationship_type(t)?;
        }

        let query = cypher::shortest_paths(source_id, target_id, &rel_types, max_depth, mode)?;
        let rows = self.store().execute_read(&query).await?;
        Ok(rows.iter().map(path_from_row).collect())
    }

    /// Fetch an entity and project its properties through a knowledge
    /// tier. An unrecognized tier label falls back to L1.
    pub async fn get_entity_with_tier(
        &self,
        entity_id: &str,
        tier: Option<&str>,
    ) -> Result<TieredEntity> {
        let record = self.get_entity(entity_id).await?;
        let tier = Tier::from_param(tier);
        debug!(entity_id, tier = tier.as_str(), "Projecting entity through tier");

        let properties = tier::project(&record.properties, tier);
        let entity_type = if record.entity_type == "Entity" {
            None
        } else {
            Some(record.entity_type)
        };
        Ok(TieredEntity {
            id: record.id,
            entity_type,
            tier,
            properties,
        })
    }

    /// All symbols that represent the given concept.
    pub async fn find_symbols_for_concept(&self, concept_id: &str) -> Result<Vec<RelatedEntity>> {
        self.require_entity_of_type(concept_id, "Concept").await?;
        let query = cypher::symbols_for_concept(concept_id)?;
        let rows = self.store().execute_read(&query).await?;
        rows.iter().map(related_from_row).collect()
    }

    /// All concepts represented by the given symbol.
    pub async fn find_concepts_for_symbol(&self, symbol_id: &str) -> Result<Vec<RelatedEntity>> {
        self.require_entity_of_type(symbol_id, "Symbol").await?;
        let query = cypher::concepts_for_symbol(symbol_id)?;
        let rows = self.store().execute_read(&query).await?;
        rows.iter().map(related_from_row).collect()
    }

    /// Concepts in other domains mapped to the given concept: directly
    /// adjacent cross-references when no domain filter is given, two-hop
    /// bridged mappings otherwise.
    pub async fn find_cross_domain_mappings(
        &self,
        concept_id: &str,
        source_domain: Option<&str>,
        target_domain: Option<&str>,
    ) -> Result<CrossDomainResult> {
        self.require_entity_of_type(concept_id, "Concept").await?;
        info!(concept_id, "Finding cross-domain mappings");

        if source_domain.is_none() && target_domain.is_none() {
            let query = cypher::cross_reference_adjacent(concept_id)?;
            let rows = self.store().execute_read(&query).await?;
            let related = rows
                .iter()
                .map(related_from_row)
                .collect::<Result<Vec<_>>>()?;
            return Ok(CrossDomainResult::Adjacent(related));
        }

        let query = cypher::cross_reference_bridged(concept_id, source_domain, target_domain)?;
        let rows = self.store().execute_read(&query).await?;
        let mappings = rows
            .iter()
            .map(mapping_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(CrossDomainResult::Bridged(mappings))
    }

    async fn require_entity_of_type(
        &self,
        entity_id: &str,
        type_name: &'static str,
    ) -> Result<EntityRecord> {
        let record = self
            .get_entity(entity_id)
            .await
            .map_err(rekind(type_name))?;
        if record.entity_type != type_name {
            return Err(GraphError::not_found(type_name, entity_id));
        }
        Ok(record)
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn path_from_row(row: &RecordMap) -> GraphPath {
    let length = row
        .get("path_length")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let nodes: Vec<PropertyMap> = row
        .get("nodes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default();
    let relationships: Vec<PathRelationship> = row
        .get("relationships")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|m| PathRelationship {
                    rel_type: m
                        .get("rel_type")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    properties: m
                        .get("properties")
                        .and_then(Value::as_object)
                        .cloned()
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    GraphPath {
        length,
        nodes,
        relationships,
    }
}

fn related_from_row(row: &RecordMap) -> Result<RelatedEntity> {
    Ok(RelatedEntity {
        entity: entity_from_record(row)?,
        rel_type: string_field(row, "rel_type")?,
        relationship: object_field(row, "relationship")?,
    })
}

fn mapping_from_row(row: &RecordMap) -> Result<DomainMapping> {
    Ok(DomainMapping {
        source: endpoint_from(row, "source", "source_labels")?,
        source_rel_type: string_field(row, "source_rel_type")?,
        source_relation: object_field(row, "source_relation")?,
        target: endpoint_from(row, "target", "target_labels")?,
        target_rel_type: string_field(row, "target_rel_type")?,
        target_relation: object_field(row, "target_relation")?,
    })
}

fn endpoint_from(row: &RecordMap, props_key: &str, labels_key: &str) -> Result<EntityRecord> {
    let properties = object_field(row, props_key)?;
    let id = properties
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(EntityRecord {
        id,
        entity_type: entity_type_from_labels(row.get(labels_key)),
        properties,
    })
}
