//! noema-core: Shared types, configuration, and error handling for the
//! noema knowledge graph platform.
//!
//! This crate provides the foundational pieces used across all noema
//! components:
//! - Record shapes (entities, relationships, paths, pages) exchanged with
//!   the graph access layer
//! - Pagination, traversal direction, and knowledge-tier primitives
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{GraphSettings, SchemaSettings, Settings};
pub use error::NoemaError;
