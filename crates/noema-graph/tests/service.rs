//! Facade tests over a scripted in-memory store.
//!
//! The fake store returns pre-queued rows and records every query it is
//! handed, so these tests verify the full orchestration path (type
//! resolution, validation, query construction, result shaping) without
//! a database.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use noema_core::types::{Direction, PageRequest, PropertyMap};
use noema_graph::cypher::CypherQuery;
use noema_graph::{GraphError, GraphStore, KnowledgeGraph, RecordMap, StoreError};
use noema_schema::{
    EntityTypeDef, PropertyConstraint, PropertyKind, RelationshipTypeDef, SchemaRegistry,
};

// ── Fake store ───────────────────────────────────────────────────

#[derive(Default)]
struct FakeStore {
    reads: Mutex<VecDeque<Vec<RecordMap>>>,
    writes: Mutex<VecDeque<Vec<RecordMap>>>,
    read_log: Mutex<Vec<CypherQuery>>,
    write_log: Mutex<Vec<CypherQuery>>,
}

impl FakeStore {
    fn push_read(&self, rows: Vec<RecordMap>) {
        self.reads.lock().unwrap().push_back(rows);
    }

    fn push_write(&self, rows: Vec<RecordMap>) {
        self.writes.lock().unwrap().push_back(rows);
    }

    fn read_queries(&self) -> Vec<CypherQuery> {
        self.read_log.lock().unwrap().clone()
    }

    fn write_queries(&self) -> Vec<CypherQuery> {
        self.write_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for FakeStore {
    async fn execute_read(&self, query: &CypherQuery) -> Result<Vec<RecordMap>, StoreError> {
        self.read_log.lock().unwrap().push(query.clone());
        Ok(self.reads.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute_write(&self, query: &CypherQuery) -> Result<Vec<RecordMap>, StoreError> {
        self.write_log.lock().unwrap().push(query.clone());
        Ok(self.writes.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn exists(&self) -> bool {
        true
    }
}

// ── Fixtures ─────────────────────────────────────────────────────

fn test_registry() -> Arc<SchemaRegistry> {
    let entity_types = BTreeMap::from([
        (
            "Entity".to_string(),
            EntityTypeDef {
                description: "Base entity type".to_string(),
                inherits: None,
                properties: BTreeMap::from([
                    (
                        "id".to_string(),
                        PropertyConstraint::required(PropertyKind::String),
                    ),
                    (
                        "name".to_string(),
                        PropertyConstraint::required(PropertyKind::String),
                    ),
                    (
                        "description".to_string(),
                        PropertyConstraint::of(PropertyKind::String),
                    ),
                ]),
            },
        ),
        (
            "Concept".to_string(),
            EntityTypeDef {
                description: String::new(),
                inherits: Some("Entity".to_string()),
                properties: BTreeMap::from([(
                    "domain".to_string(),
                    PropertyConstraint::required(PropertyKind::String),
                )]),
            },
        ),
        (
            "Symbol".to_string(),
            EntityTypeDef {
                description: String::new(),
                inherits: Some("Entity".to_string()),
                properties: BTreeMap::from([(
                    "notation".to_string(),
                    PropertyConstraint::required(PropertyKind::String),
                )]),
            },
        ),
    ]);

    let relationship_types = BTreeMap::from([
        (
            "REPRESENTS".to_string(),
            RelationshipTypeDef {
                description: String::new(),
                source_types: vec!["Symbol".to_string()],
                target_types: vec!["Concept".to_string()],
                properties: BTreeMap::from([(
                    "confidence".to_string(),
                    PropertyConstraint {
                        min: Some(0.0),
                        max: Some(1.0),
                        ..PropertyConstraint::of(PropertyKind::Number)
                    },
                )]),
            },
        ),
        (
            "RELATES_TO".to_string(),
            RelationshipTypeDef {
                description: String::new(),
                source_types: vec!["Concept".to_string()],
                target_types: vec!["Concept".to_string()],
                properties: BTreeMap::new(),
            },
        ),
    ]);

    Arc::new(SchemaRegistry::from_definitions(
        entity_types,
        relationship_types,
    ))
}

fn service() -> (KnowledgeGraph, Arc<FakeStore>) {
    let store = Arc::new(FakeStore::default());
    let kg = KnowledgeGraph::new(test_registry(), store.clone());
    (kg, store)
}

fn props(value: Value) -> PropertyMap {
    value.as_object().unwrap().clone()
}

fn entity_row(properties: Value, labels: &[&str]) -> RecordMap {
    props(json!({ "entity": properties, "labels": labels }))
}

fn count_row(total: i64) -> RecordMap {
    props(json!({ "total": total }))
}

// ── Entities ─────────────────────────────────────────────────────

#[tokio::test]
async fn create_entity_reports_all_violations_without_store_calls() {
    let (kg, store) = service();

    let err = kg
        .create_entity("Concept", &props(json!({"name": "Derivative"})), None)
        .await
        .unwrap_err();

    match err {
        GraphError::ValidationFailed { violations } => {
            assert_eq!(violations, vec!["required property 'domain' is missing"]);
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
    assert!(store.write_queries().is_empty());
    assert!(store.read_queries().is_empty());
}

#[tokio::test]
async fn create_entity_assigns_id_and_writes_once() {
    let (kg, store) = service();

    let created = kg
        .create_entity(
            "Concept",
            &props(json!({"name": "Derivative", "domain": "calculus"})),
            None,
        )
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.entity_type, "Concept");
    assert_eq!(created.properties["domain"], json!("calculus"));
    assert_eq!(created.properties["id"], json!(created.id.clone()));

    let writes = store.write_queries();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].text().starts_with("CREATE (e:Entity:Concept)"));
    // The record travels as a parameter, not in the text.
    assert!(!writes[0].text().contains("calculus"));
}

#[tokio::test]
async fn create_entity_keeps_caller_supplied_id() {
    let (kg, _store) = service();

    let created = kg
        .create_entity(
            "Concept",
            &props(json!({"id": "c-7", "name": "Limit", "domain": "calculus"})),
            None,
        )
        .await
        .unwrap();
    assert_eq!(created.id, "c-7");
}

#[tokio::test]
async fn create_entity_stores_provenance_outside_the_schema() {
    let (kg, store) = service();

    kg.create_entity(
        "Concept",
        &props(json!({"name": "Limit", "domain": "calculus"})),
        Some(&props(json!({"source": "import", "batch": 3}))),
    )
    .await
    .unwrap();

    let writes = store.write_queries();
    let (_, stored) = writes[0]
        .params()
        .iter()
        .find(|(name, _)| name == "props")
        .unwrap();
    let prov = stored["provenance"].as_str().unwrap();
    assert!(prov.contains("import"));
}

#[tokio::test]
async fn unknown_entity_type_is_not_found() {
    let (kg, store) = service();
    let err = kg
        .create_entity("Ghost", &props(json!({"name": "x"})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Schema(_)));
    assert!(store.write_queries().is_empty());
}

#[tokio::test]
async fn list_entities_normalizes_pagination() {
    let (kg, store) = service();
    store.push_read(vec![count_row(0)]);
    store.push_read(vec![]);

    let page = kg
        .list_entities(
            Some("Concept"),
            &PropertyMap::new(),
            PageRequest {
                page: -1,
                page_size: 500,
            },
        )
        .await
        .unwrap();

    assert_eq!(page.pagination.page, 0);
    assert_eq!(page.pagination.page_size, 20);
    assert_eq!(page.pagination.total_pages, 0);
    assert!(!page.pagination.has_next);
    assert!(!page.pagination.has_prev);

    let reads = store.read_queries();
    assert_eq!(reads.len(), 2);
    assert!(reads[1].params().contains(&("skip".to_string(), json!(0))));
    assert!(reads[1].params().contains(&("limit".to_string(), json!(20))));
}

#[tokio::test]
async fn list_entities_rejects_unknown_filter_property() {
    let (kg, store) = service();
    let err = kg
        .list_entities(
            Some("Concept"),
            &props(json!({"shoe_size": 44})),
            PageRequest::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    assert!(store.read_queries().is_empty());
}

#[tokio::test]
async fn get_entity_by_properties_requires_a_filter() {
    let (kg, _store) = service();
    let err = kg
        .get_entity_by_properties(None, &PropertyMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
}

#[tokio::test]
async fn update_entity_revalidates_merged_record() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);

    let err = kg
        .update_entity("c1", &props(json!({"domain": 7})))
        .await
        .unwrap_err();

    match err {
        GraphError::ValidationFailed { violations } => {
            assert_eq!(violations, vec!["property 'domain' must be a string"]);
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
    assert!(store.write_queries().is_empty());
}

#[tokio::test]
async fn update_entity_merges_and_writes() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);

    let updated = kg
        .update_entity("c1", &props(json!({"description": "rate of change"})))
        .await
        .unwrap();

    assert_eq!(updated.properties["domain"], json!("calculus"));
    assert_eq!(updated.properties["description"], json!("rate of change"));
    assert_eq!(store.write_queries().len(), 1);
}

#[tokio::test]
async fn update_entity_rejects_id_change() {
    let (kg, store) = service();
    let err = kg
        .update_entity("c1", &props(json!({"id": "c2"})))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    assert!(store.read_queries().is_empty());
}

// ── Relationships ────────────────────────────────────────────────

#[tokio::test]
async fn create_relationship_fails_fast_on_missing_target() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "s1", "name": "∂", "notation": "∂"}),
        &["Entity", "Symbol"],
    )]);
    store.push_read(vec![]); // target lookup comes back empty

    let err = kg
        .create_relationship("s1", "REPRESENTS", "missing", None)
        .await
        .unwrap_err();

    match err {
        GraphError::NotFound { kind, id } => {
            assert_eq!(kind, "Target entity");
            assert_eq!(id, "missing");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(store.write_queries().is_empty());
}

#[tokio::test]
async fn create_relationship_checks_endpoint_types() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);
    store.push_read(vec![entity_row(
        json!({"id": "c2", "name": "Limit", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);

    let err = kg
        .create_relationship("c1", "REPRESENTS", "c2", None)
        .await
        .unwrap_err();

    match err {
        GraphError::ValidationFailed { violations } => {
            assert_eq!(violations.len(), 1);
            assert!(violations[0].contains("source type 'Concept' is not allowed"));
            assert!(violations[0].contains("allowed: Symbol"));
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
    assert!(store.write_queries().is_empty());
}

#[tokio::test]
async fn create_relationship_writes_with_generated_id() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "s1", "name": "∂", "notation": "∂"}),
        &["Entity", "Symbol"],
    )]);
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);

    let created = kg
        .create_relationship("s1", "REPRESENTS", "c1", Some(&props(json!({"confidence": 0.9}))))
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.rel_type, "REPRESENTS");
    assert_eq!(created.source_id, "s1");
    assert_eq!(created.target_id, "c1");

    let writes = store.write_queries();
    assert_eq!(writes.len(), 1);
    assert!(writes[0].text().contains("CREATE (source)-[r:REPRESENTS]->(target)"));
}

#[tokio::test]
async fn delete_relationship_not_found_means_no_write() {
    let (kg, store) = service();
    store.push_read(vec![]); // lookup finds nothing

    let err = kg
        .delete_relationship("a", "RELATES_TO", "b")
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { kind: "Relationship", .. }));
    assert!(store.write_queries().is_empty());
}

#[tokio::test]
async fn list_relationships_shapes_rows() {
    let (kg, store) = service();
    store.push_read(vec![count_row(1)]);
    store.push_read(vec![props(json!({
        "relationship": {"id": "r1", "confidence": 0.8},
        "rel_type": "REPRESENTS",
        "source_id": "s1",
        "target_id": "c1"
    }))]);

    let page = kg
        .list_relationships(Some("s1"), Some("REPRESENTS"), Direction::Outgoing, PageRequest::default())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, "r1");
    assert_eq!(page.items[0].source_id, "s1");
    assert_eq!(page.pagination.total_count, 1);
    assert_eq!(page.pagination.total_pages, 1);
}

// ── Paths, search, tiers ─────────────────────────────────────────

#[tokio::test]
async fn path_to_self_is_zero_length() {
    let (kg, store) = service();
    let row = entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    );
    store.push_read(vec![row.clone()]);
    store.push_read(vec![row]);

    let paths = kg.find_path("c1", "c1", None, None).await.unwrap();

    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].length, 0);
    assert_eq!(paths[0].nodes.len(), 1);
    assert!(paths[0].relationships.is_empty());
    // The shortcut never issues a path query.
    assert_eq!(store.read_queries().len(), 2);
}

#[tokio::test]
async fn find_path_clamps_depth_and_returns_empty_success() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(json!({"id": "a", "name": "A"}), &["Entity", "Concept"])]);
    store.push_read(vec![entity_row(json!({"id": "b", "name": "B"}), &["Entity", "Concept"])]);
    store.push_read(vec![]); // no path within bounds

    let paths = kg.find_path("a", "b", Some(99), None).await.unwrap();
    assert!(paths.is_empty());

    let reads = store.read_queries();
    assert_eq!(reads.len(), 3);
    assert!(reads[2].text().contains("shortestPath((source)-[*..10]-(target))"));
}

#[tokio::test]
async fn find_path_missing_source_is_not_found() {
    let (kg, store) = service();
    store.push_read(vec![]);

    let err = kg.find_path("ghost", "b", None, None).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound { kind: "Source entity", .. }));
    assert_eq!(store.read_queries().len(), 1);
}

#[tokio::test]
async fn find_paths_shapes_path_rows() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(json!({"id": "a", "name": "A"}), &["Entity", "Concept"])]);
    store.push_read(vec![entity_row(json!({"id": "b", "name": "B"}), &["Entity", "Concept"])]);
    store.push_read(vec![props(json!({
        "nodes": [{"id": "a"}, {"id": "m"}, {"id": "b"}],
        "relationships": [
            {"rel_type": "RELATES_TO", "properties": {}},
            {"rel_type": "RELATES_TO", "properties": {}}
        ],
        "path_length": 2
    }))]);

    let paths = kg.find_paths("a", "b", Some(4), None).await.unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].length, 2);
    assert_eq!(paths[0].nodes.len(), 3);
    assert_eq!(paths[0].relationships[0].rel_type, "RELATES_TO");

    let reads = store.read_queries();
    assert!(reads[2].text().contains("allShortestPaths((source)-[*..4]-(target))"));
}

#[tokio::test]
async fn search_normalizes_invalid_limit_and_defaults_types() {
    let (kg, store) = service();
    store.push_read(vec![]);

    kg.search_entities("chain rule", None, Some(0)).await.unwrap();

    let reads = store.read_queries();
    assert_eq!(reads.len(), 1);
    assert!(reads[0].text().contains("(e:Concept OR e:Symbol)"));
    assert!(reads[0].params().contains(&("limit".to_string(), json!(20))));
    assert!(reads[0].params().contains(&("term0".to_string(), json!("chain"))));
    assert!(reads[0].params().contains(&("term1".to_string(), json!("rule"))));
}

#[tokio::test]
async fn blank_search_is_invalid() {
    let (kg, _store) = service();
    let err = kg.search_entities("   ", None, None).await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
}

#[tokio::test]
async fn tier_projection_resolves_suffixed_properties() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({
            "id": "c1",
            "name": "Derivative",
            "definition_l1": "rate of change",
            "definition_l2": "limit of the difference quotient"
        }),
        &["Entity", "Concept"],
    )]);

    let view = kg.get_entity_with_tier("c1", Some("L2")).await.unwrap();

    assert_eq!(view.entity_type.as_deref(), Some("Concept"));
    assert_eq!(view.properties["definition"], json!("limit of the difference quotient"));
    assert!(!view.properties.contains_key("definition_l1"));
    assert_eq!(view.properties["name"], json!("Derivative"));
}

#[tokio::test]
async fn invalid_tier_defaults_to_l1() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "x", "summary_l1": "short"}),
        &["Entity", "Concept"],
    )]);

    let view = kg.get_entity_with_tier("c1", Some("L7")).await.unwrap();
    assert_eq!(view.properties["summary"], json!("short"));
}

#[tokio::test]
async fn symbols_for_concept_requires_concept_anchor() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "s1", "name": "∂", "notation": "∂"}),
        &["Entity", "Symbol"],
    )]);

    let err = kg.find_symbols_for_concept("s1").await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound { kind: "Concept", .. }));
    assert_eq!(store.read_queries().len(), 1);
}

#[tokio::test]
async fn cross_domain_without_filters_is_adjacent() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);
    store.push_read(vec![props(json!({
        "entity": {"id": "c9", "name": "Velocity", "domain": "physics"},
        "labels": ["Entity", "Concept"],
        "rel_type": "MAPPED_TO",
        "relationship": {}
    }))]);

    let result = kg.find_cross_domain_mappings("c1", None, None).await.unwrap();
    match result {
        noema_core::types::CrossDomainResult::Adjacent(related) => {
            assert_eq!(related.len(), 1);
            assert_eq!(related[0].entity.id, "c9");
            assert_eq!(related[0].rel_type, "MAPPED_TO");
        }
        other => panic!("expected Adjacent, got {other:?}"),
    }
}

#[tokio::test]
async fn cross_domain_with_filters_is_bridged() {
    let (kg, store) = service();
    store.push_read(vec![entity_row(
        json!({"id": "c1", "name": "Derivative", "domain": "calculus"}),
        &["Entity", "Concept"],
    )]);
    store.push_read(vec![props(json!({
        "source": {"id": "c5", "name": "Slope", "domain": "geometry"},
        "source_labels": ["Entity", "Concept"],
        "source_rel_type": "MAPPED_TO",
        "source_relation": {},
        "target": {"id": "c9", "name": "Velocity", "domain": "physics"},
        "target_labels": ["Entity", "Concept"],
        "target_rel_type": "APPLIES_TO",
        "target_relation": {}
    }))]);

    let result = kg
        .find_cross_domain_mappings("c1", Some("geometry"), Some("physics"))
        .await
        .unwrap();
    match result {
        noema_core::types::CrossDomainResult::Bridged(mappings) => {
            assert_eq!(mappings.len(), 1);
            assert_eq!(mappings[0].source.id, "c5");
            assert_eq!(mappings[0].target.entity_type, "Concept");
        }
        other => panic!("expected Bridged, got {other:?}"),
    }

    let reads = store.read_queries();
    assert!(reads[1]
        .params()
        .contains(&("source_domain".to_string(), json!("geometry"))));
}
