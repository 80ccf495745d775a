//! noema-schema: the versioned type system of the knowledge graph.
//!
//! Entity and relationship type definitions live in two JSON documents
//! (`entity_types.json`, `relationship_types.json`). The registry loads
//! them once at startup, seeding built-in defaults when they are absent,
//! and is immutable afterwards, so it can be shared freely across
//! concurrent operations.
//!
//! Validation is total: a payload is checked against the fully resolved
//! (inheritance-merged) type definition and every violation is reported,
//! never just the first.

pub mod registry;
pub mod types;
pub mod validate;

pub use registry::{SchemaError, SchemaRegistry};
pub use types::{
    EffectiveEntityType, EntityTypeDef, PropertyConstraint, PropertyKind, RelationshipTypeDef,
};
pub use validate::{validate_endpoints, validate_properties};
