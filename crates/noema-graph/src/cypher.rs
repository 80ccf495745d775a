//! Cypher query construction.
//!
//! Builders here are pure: they turn a structured request into query text
//! plus a named parameter list, and never touch the store. Every
//! caller-controlled *value* flows through a `$` parameter. The only
//! things spliced into query text are identifiers the facade has already
//! validated against the schema registry (type names, relationship type
//! names, declared property names), because the query language cannot
//! parameterize labels and relationship types.

use serde_json::Value;

use noema_core::types::{Direction, PropertyMap};

use crate::error::{GraphError, Result};

/// Upper bound on variable-length traversal depth.
pub const MAX_PATH_DEPTH: i64 = 10;

/// Properties consulted by free-text search.
pub const SEARCHABLE_PROPERTIES: [&str; 4] = ["name", "description", "notation", "domain"];

/// Relationship types that constitute cross-domain references.
pub const CROSS_REFERENCE_TYPES: [&str; 4] =
    ["MAPPED_TO", "EQUIVALENT_TO", "DERIVED_FROM", "APPLIES_TO"];

/// A query ready for execution: text plus named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    text: String,
    params: Vec<(String, Value)>,
}

impl CypherQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }
}

/// Variant of shortest-path search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    SingleShortest,
    AllShortest,
}

impl PathMode {
    fn function(self) -> &'static str {
        match self {
            Self::SingleShortest => "shortestPath",
            Self::AllShortest => "allShortestPaths",
        }
    }

    fn default_depth(self) -> i64 {
        match self {
            Self::SingleShortest => 5,
            Self::AllShortest => 3,
        }
    }
}

// ── Entities ──────────────────────────────────────────────────────

pub fn entity_by_id(entity_id: &str) -> Result<CypherQuery> {
    require_id("entity_id", entity_id)?;
    Ok(CypherQuery::new(
        "MATCH (e:Entity {id: $id}) RETURN properties(e) AS entity, labels(e) AS labels",
    )
    .param("id", entity_id))
}

pub fn create_entity(type_label: &str, record: PropertyMap) -> Result<CypherQuery> {
    require_id("entity_type", type_label)?;
    Ok(
        CypherQuery::new(format!(
            "CREATE (e{}) SET e = $props RETURN e.id AS id",
            label_fragment(Some(type_label))
        ))
        .param("props", Value::Object(record)),
    )
}

pub fn update_entity(entity_id: &str, record: PropertyMap) -> Result<CypherQuery> {
    require_id("entity_id", entity_id)?;
    Ok(
        CypherQuery::new("MATCH (e:Entity {id: $id}) SET e = $props RETURN e.id AS id")
            .param("id", entity_id)
            .param("props", Value::Object(record)),
    )
}

/// Removes the entity and, in the same statement, every incident
/// relationship.
pub fn delete_entity(entity_id: &str) -> Result<CypherQuery> {
    require_id("entity_id", entity_id)?;
    Ok(
        CypherQuery::new("MATCH (e:Entity {id: $id}) DETACH DELETE e").param("id", entity_id),
    )
}

/// Page and count queries sharing the same match-and-filter predicates.
#[derive(Debug, Clone)]
pub struct ListQueries {
    pub page: CypherQuery,
    pub count: CypherQuery,
}

pub fn list_entities(
    type_label: Option<&str>,
    filters: &PropertyMap,
    skip: i64,
    limit: i64,
) -> Result<ListQueries> {
    let (clauses, params) = equality_filters("e", filters)?;

    let mut parts = vec![format!("MATCH (e{})", label_fragment(type_label))];
    if !clauses.is_empty() {
        parts.push(format!("WHERE {}", clauses.join(" AND ")));
    }

    let count_text = format!("{} RETURN count(e) AS total", parts.join(" "));

    parts.push("RETURN properties(e) AS entity, labels(e) AS labels".to_string());
    parts.push("ORDER BY e.id SKIP $skip LIMIT $limit".to_string());
    let page_text = parts.join(" ");

    let mut page = CypherQuery::new(page_text);
    let mut count = CypherQuery::new(count_text);
    for (name, value) in &params {
        page = page.param(name.clone(), value.clone());
        count = count.param(name.clone(), value.clone());
    }
    page = page.param("skip", skip).param("limit", limit);

    Ok(ListQueries { page, count })
}

pub fn entity_by_properties(
    type_label: Option<&str>,
    filters: &PropertyMap,
) -> Result<CypherQuery> {
    if filters.is_empty() {
        return Err(GraphError::InvalidArgument(
            "at least one property to match is required".to_string(),
        ));
    }
    let (clauses, params) = equality_filters("e", filters)?;

    let text = format!(
        "MATCH (e{}) WHERE {} RETURN properties(e) AS entity, labels(e) AS labels LIMIT 1",
        label_fragment(type_label),
        clauses.join(" AND ")
    );

    let mut query = CypherQuery::new(text);
    for (name, value) in params {
        query = query.param(name, value);
    }
    Ok(query)
}

// ── Relationships ─────────────────────────────────────────────────

pub fn create_relationship(
    rel_type: &str,
    source_id: &str,
    target_id: &str,
    record: PropertyMap,
) -> Result<CypherQuery> {
    require_id("relationship_type", rel_type)?;
    require_id("source_id", source_id)?;
    require_id("target_id", target_id)?;

    let text = format!(
        "MATCH (source:Entity {{id: $source_id}}), (target:Entity {{id: $target_id}}) \
         CREATE (source)-[r:{rel_type}]->(target) SET r = $props RETURN r.id AS id"
    );

    Ok(CypherQuery::new(text)
        .param("source_id", source_id)
        .param("target_id", target_id)
        .param("props", Value::Object(record)))
}

pub fn relationship_between(
    source_id: &str,
    rel_type: &str,
    target_id: &str,
) -> Result<CypherQuery> {
    require_id("relationship_type", rel_type)?;
    require_id("source_id", source_id)?;
    require_id("target_id", target_id)?;

    let text = format!(
        "MATCH (source:Entity {{id: $source_id}})-[r:{rel_type}]->(target:Entity {{id: $target_id}}) \
         RETURN properties(r) AS relationship, type(r) AS rel_type LIMIT 1"
    );

    Ok(CypherQuery::new(text)
        .param("source_id", source_id)
        .param("target_id", target_id))
}

pub fn delete_relationship(
    source_id: &str,
    rel_type: &str,
    target_id: &str,
) -> Result<CypherQuery> {
    require_id("relationship_type", rel_type)?;
    require_id("source_id", source_id)?;
    require_id("target_id", target_id)?;

    let text = format!(
        "MATCH (source:Entity {{id: $source_id}})-[r:{rel_type}]->(target:Entity {{id: $target_id}}) \
         DELETE r"
    );

    Ok(CypherQuery::new(text)
        .param("source_id", source_id)
        .param("target_id", target_id))
}

pub fn list_relationships(
    entity_id: Option<&str>,
    rel_type: Option<&str>,
    direction: Direction,
    skip: i64,
    limit: i64,
) -> Result<ListQueries> {
    let type_fragment = match rel_type {
        Some(t) => {
            require_id("relationship_type", t)?;
            format!(":{t}")
        }
        None => String::new(),
    };

    let pattern = match entity_id {
        Some(id) => {
            require_id("entity_id", id)?;
            // `Both` is the union of the two directed patterns.
            match direction {
                Direction::Outgoing => {
                    format!("(e:Entity {{id: $id}})-[r{type_fragment}]->(o:Entity)")
                }
                Direction::Incoming => {
                    format!("(e:Entity {{id: $id}})<-[r{type_fragment}]-(o:Entity)")
                }
                Direction::Both => {
                    format!("(e:Entity {{id: $id}})-[r{type_fragment}]-(o:Entity)")
                }
            }
        }
        None => format!("(a:Entity)-[r{type_fragment}]->(b:Entity)"),
    };

    let returns = "RETURN properties(r) AS relationship, type(r) AS rel_type, \
                   startNode(r).id AS source_id, endNode(r).id AS target_id";

    let page_text = format!("MATCH {pattern} {returns} ORDER BY r.id SKIP $skip LIMIT $limit");
    let count_text = format!("MATCH {pattern} RETURN count(r) AS total");

    let mut page = CypherQuery::new(page_text);
    let mut count = CypherQuery::new(count_text);
    if let Some(id) = entity_id {
        page = page.param("id", id);
        count = count.param("id", id);
    }
    page = page.param("skip", skip).param("limit", limit);

    Ok(ListQueries { page, count })
}

// ── Search ────────────────────────────────────────────────────────

/// Free-text search: every term must match at least one searchable
/// property, case-insensitively, as a substring.
pub fn search_entities(terms: &[&str], type_labels: &[String], limit: i64) -> Result<CypherQuery> {
    if terms.is_empty() {
        return Err(GraphError::InvalidArgument(
            "search query must not be blank".to_string(),
        ));
    }

    let mut clauses = Vec::new();
    if !type_labels.is_empty() {
        let label_predicates: Vec<String> =
            type_labels.iter().map(|t| format!("e:{t}")).collect();
        clauses.push(format!("({})", label_predicates.join(" OR ")));
    }

    let mut query_params: Vec<(String, Value)> = Vec::new();
    for (i, term) in terms.iter().enumerate() {
        let param = format!("term{i}");
        let matchers: Vec<String> = SEARCHABLE_PROPERTIES
            .iter()
            .map(|prop| {
                format!("toLower(toString(coalesce(e.{prop}, ''))) CONTAINS toLower(${param})")
            })
            .collect();
        clauses.push(format!("({})", matchers.join(" OR ")));
        query_params.push((param, Value::String((*term).to_string())));
    }

    let text = format!(
        "MATCH (e:Entity) WHERE {} RETURN properties(e) AS entity, labels(e) AS labels LIMIT $limit",
        clauses.join(" AND ")
    );

    let mut query = CypherQuery::new(text);
    for (name, value) in query_params {
        query = query.param(name, value);
    }
    Ok(query.param("limit", limit))
}

// ── Paths ─────────────────────────────────────────────────────────

/// Variable-depth shortest-path search between two anchor entities.
///
/// Depth above the hard ceiling is clamped to it; a non-positive or
/// absent depth falls back to the mode's default. An empty
/// `rel_types` slice leaves the traversal unrestricted.
pub fn shortest_paths(
    source_id: &str,
    target_id: &str,
    rel_types: &[String],
    max_depth: Option<i64>,
    mode: PathMode,
) -> Result<CypherQuery> {
    require_id("source_id", source_id)?;
    require_id("target_id", target_id)?;

    let depth = match max_depth {
        None => mode.default_depth(),
        Some(d) if d > MAX_PATH_DEPTH => MAX_PATH_DEPTH,
        Some(d) if d < 1 => mode.default_depth(),
        Some(d) => d,
    };

    let rel_fragment = if rel_types.is_empty() {
        format!("[*..{depth}]")
    } else {
        format!("[:{}*..{depth}]", rel_types.join("|"))
    };

    let text = format!(
        "MATCH (source:Entity {{id: $source_id}}), (target:Entity {{id: $target_id}}) \
         MATCH path = {}((source)-{rel_fragment}-(target)) \
         RETURN [n IN nodes(path) | properties(n)] AS nodes, \
         [r IN relationships(path) | {{rel_type: type(r), properties: properties(r)}}] AS relationships, \
         length(path) AS path_length",
        mode.function()
    );

    Ok(CypherQuery::new(text)
        .param("source_id", source_id)
        .param("target_id", target_id))
}

// ── Cross-references ──────────────────────────────────────────────

/// All concepts directly linked to the anchor through a cross-reference
/// relationship, in either direction.
pub fn cross_reference_adjacent(concept_id: &str) -> Result<CypherQuery> {
    require_id("concept_id", concept_id)?;
    let text = format!(
        "MATCH (c:Concept {{id: $concept_id}}) \
         MATCH (other:Concept)-[r:{}]-(c) \
         RETURN properties(other) AS entity, labels(other) AS labels, \
         type(r) AS rel_type, properties(r) AS relationship",
        CROSS_REFERENCE_TYPES.join("|")
    );
    Ok(CypherQuery::new(text).param("concept_id", concept_id))
}

/// Two-hop mappings through the anchor concept, filtered by source and/or
/// target domain.
pub fn cross_reference_bridged(
    concept_id: &str,
    source_domain: Option<&str>,
    target_domain: Option<&str>,
) -> Result<CypherQuery> {
    require_id("concept_id", concept_id)?;

    let mut clauses = Vec::new();
    let mut query = CypherQuery::new(String::new()).param("concept_id", concept_id);
    if let Some(domain) = source_domain {
        clauses.push("source.domain = $source_domain".to_string());
        query = query.param("source_domain", domain);
    }
    if let Some(domain) = target_domain {
        clauses.push("target.domain = $target_domain".to_string());
        query = query.param("target_domain", domain);
    }

    let mut parts = vec![
        "MATCH (c:Concept {id: $concept_id})".to_string(),
        "MATCH (source:Concept)-[r1]->(c), (c)-[r2]->(target:Concept)".to_string(),
    ];
    if !clauses.is_empty() {
        parts.push(format!("WHERE {}", clauses.join(" AND ")));
    }
    parts.push(
        "RETURN properties(source) AS source, labels(source) AS source_labels, \
         type(r1) AS source_rel_type, properties(r1) AS source_relation, \
         properties(target) AS target, labels(target) AS target_labels, \
         type(r2) AS target_rel_type, properties(r2) AS target_relation"
            .to_string(),
    );

    query.text = parts.join(" ");
    Ok(query)
}

/// Symbols that represent the anchor concept.
pub fn symbols_for_concept(concept_id: &str) -> Result<CypherQuery> {
    require_id("concept_id", concept_id)?;
    Ok(CypherQuery::new(
        "MATCH (s:Symbol)-[r:REPRESENTS]->(c:Concept {id: $id}) \
         RETURN properties(s) AS entity, labels(s) AS labels, \
         type(r) AS rel_type, properties(r) AS relationship",
    )
    .param("id", concept_id))
}

/// Concepts represented by the anchor symbol.
pub fn concepts_for_symbol(symbol_id: &str) -> Result<CypherQuery> {
    require_id("symbol_id", symbol_id)?;
    Ok(CypherQuery::new(
        "MATCH (s:Symbol {id: $id})-[r:REPRESENTS]->(c:Concept) \
         RETURN properties(c) AS entity, labels(c) AS labels, \
         type(r) AS rel_type, properties(r) AS relationship",
    )
    .param("id", symbol_id))
}

// ── Helpers ───────────────────────────────────────────────────────

/// The label pattern for an entity match: the base label plus the
/// specific type, when one is requested.
fn label_fragment(type_label: Option<&str>) -> String {
    match type_label {
        Some(label) if label != "Entity" => format!(":Entity:{label}"),
        _ => ":Entity".to_string(),
    }
}

/// AND-combined per-property equality predicates. Property names become
/// part of the query text, so they must pass the identifier check; the
/// facade additionally whitelists them against the registry.
fn equality_filters(
    alias: &str,
    filters: &PropertyMap,
) -> Result<(Vec<String>, Vec<(String, Value)>)> {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for (key, value) in filters {
        if !is_identifier(key) {
            return Err(GraphError::InvalidArgument(format!(
                "'{key}' is not a valid property name"
            )));
        }
        clauses.push(format!("{alias}.{key} = $prop_{key}"));
        params.push((format!("prop_{key}"), value.clone()));
    }
    Ok((clauses, params))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn require_id(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GraphError::InvalidArgument(format!(
            "{name} must not be blank"
        )));
    }
    Ok(())
}
