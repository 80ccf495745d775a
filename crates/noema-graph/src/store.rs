//! The graph store boundary: a small collaborator contract the access
//! layer depends on, plus the Neo4j implementation.
//!
//! Everything above this module is synchronous computation; all I/O and
//! all transactional behavior live behind [`GraphStore`].

use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph};
use serde_json::Value;
use tracing::{debug, info};

use noema_core::GraphSettings;

use crate::cypher::CypherQuery;

/// A single result row, keyed by the query's RETURN aliases.
pub type RecordMap = serde_json::Map<String, Value>;

/// Errors from the store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Graph store connection error: {0}")]
    Connection(String),

    #[error("Graph store query error: {0}")]
    Query(String),

    #[error("Record conversion error: {0}")]
    Conversion(String),
}

/// The transactional graph backend the access layer delegates to.
///
/// `execute_write` runs inside an atomic transaction: committed on
/// success, rolled back on any failure, never partially applied.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn execute_read(&self, query: &CypherQuery) -> Result<Vec<RecordMap>, StoreError>;

    async fn execute_write(&self, query: &CypherQuery) -> Result<Vec<RecordMap>, StoreError>;

    /// Liveness probe.
    async fn exists(&self) -> bool;
}

/// Neo4j-backed [`GraphStore`] with connection pooling.
///
/// Clone is cheap (the driver's `Graph` is an inner Arc).
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

/// Uniqueness constraints for entity identifiers.
const CONSTRAINTS: [&str; 3] = [
    "CREATE CONSTRAINT entity_id_unique IF NOT EXISTS FOR (e:Entity) REQUIRE e.id IS UNIQUE",
    "CREATE CONSTRAINT concept_id_unique IF NOT EXISTS FOR (c:Concept) REQUIRE c.id IS UNIQUE",
    "CREATE CONSTRAINT symbol_id_unique IF NOT EXISTS FOR (s:Symbol) REQUIRE s.id IS UNIQUE",
];

/// Lookup indexes for the common query entry points.
const INDEXES: [&str; 2] = [
    "CREATE INDEX entity_name_idx IF NOT EXISTS FOR (e:Entity) ON (e.name)",
    "CREATE INDEX concept_domain_idx IF NOT EXISTS FOR (c:Concept) ON (c.domain)",
];

impl Neo4jStore {
    /// Connect to Neo4j with the given settings.
    pub async fn connect(settings: &GraphSettings) -> Result<Self, StoreError> {
        let neo_config = ConfigBuilder::default()
            .uri(&settings.uri)
            .user(&settings.user)
            .password(&settings.password)
            .max_connections(settings.max_connections as usize)
            .fetch_size(settings.fetch_size)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(uri = %settings.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Create the id-uniqueness constraints and lookup indexes. Idempotent.
    pub async fn ensure_constraints(&self) -> Result<(), StoreError> {
        for statement in CONSTRAINTS.iter().chain(INDEXES.iter()).copied() {
            self.graph
                .run(neo4rs::query(statement))
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;
            debug!(statement, "Applied schema statement");
        }
        info!("Graph constraints and indexes ensured");
        Ok(())
    }

    fn to_driver_query(query: &CypherQuery) -> neo4rs::Query {
        let mut q = neo4rs::query(query.text());
        for (name, value) in query.params() {
            q = q.param(name, bolt_value(value));
        }
        q
    }

    async fn collect_in_txn(
        txn: &mut neo4rs::Txn,
        query: neo4rs::Query,
    ) -> Result<Vec<RecordMap>, StoreError> {
        let mut stream = txn
            .execute(query)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let mut rows = Vec::new();
        while let Some(row) = stream
            .next(txn.handle())
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            rows.push(row_to_record(&row)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn execute_read(&self, query: &CypherQuery) -> Result<Vec<RecordMap>, StoreError> {
        let mut stream = self
            .graph
            .execute(Self::to_driver_query(query))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            rows.push(row_to_record(&row)?);
        }
        Ok(rows)
    }

    async fn execute_write(&self, query: &CypherQuery) -> Result<Vec<RecordMap>, StoreError> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        match Self::collect_in_txn(&mut txn, Self::to_driver_query(query)).await {
            Ok(rows) => {
                txn.commit()
                    .await
                    .map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(rows)
            }
            Err(e) => {
                let _ = txn.rollback().await;
                Err(e)
            }
        }
    }

    async fn exists(&self) -> bool {
        self.graph.run(neo4rs::query("RETURN 1")).await.is_ok()
    }
}

/// Convert a JSON parameter value into the driver's wire representation.
fn bolt_value(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or(0.0).into(),
        },
        Value::String(s) => s.clone().into(),
        Value::Array(items) => {
            let mut list = BoltList::default();
            for item in items {
                list.push(bolt_value(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::default();
            for (key, item) in map {
                bolt.put(BoltString::from(key.as_str()), bolt_value(item));
            }
            BoltType::Map(bolt)
        }
    }
}

/// Convert a driver row into a JSON record keyed by RETURN alias.
fn row_to_record(row: &neo4rs::Row) -> Result<RecordMap, StoreError> {
    let value: Value = row
        .to()
        .map_err(|e| StoreError::Conversion(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Conversion(format!(
            "expected a record object, got: {other}"
        ))),
    }
}
