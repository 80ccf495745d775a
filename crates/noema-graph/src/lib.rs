//! noema-graph — schema-validated access layer for the knowledge graph.
//!
//! This crate is the single mutation point for the graph: every read and
//! write flows through [`KnowledgeGraph`], which validates payloads
//! against the schema registry, assembles parameterized Cypher, and
//! executes through the [`GraphStore`] boundary. Caller values never
//! reach query text; only registry-validated identifiers are spliced in.

pub mod cypher;
pub mod entities;
pub mod error;
pub mod queries;
pub mod relationships;
pub mod service;
pub mod store;
pub mod tier;

pub use error::{GraphError, Result};
pub use service::KnowledgeGraph;
pub use store::{GraphStore, Neo4jStore, RecordMap, StoreError};
