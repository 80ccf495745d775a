//! The type registry: loads the two persisted schema documents, seeds
//! built-in defaults when they are missing, and resolves inheritance.
//!
//! The registry is loaded once at startup and never mutated afterwards.
//! Changing the schema documents requires a process restart.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{info, warn};

use crate::types::{
    EffectiveEntityType, EntityTypeDef, PropertyConstraint, PropertyKind, RelationshipTypeDef,
};

const ENTITY_TYPES_FILE: &str = "entity_types.json";
const RELATIONSHIP_TYPES_FILE: &str = "relationship_types.json";

/// Errors from registry loading and type resolution.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Entity type '{0}' does not exist")]
    UnknownEntityType(String),

    #[error("Relationship type '{0}' does not exist")]
    UnknownRelationshipType(String),

    #[error("Parent type '{parent}' of '{type_name}' does not exist")]
    UnknownParentType { type_name: String, parent: String },

    #[error("Inheritance cycle detected while resolving entity type '{0}'")]
    InheritanceCycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Immutable registry of entity and relationship type definitions.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entity_types: BTreeMap<String, EntityTypeDef>,
    relationship_types: BTreeMap<String, RelationshipTypeDef>,
}

impl SchemaRegistry {
    /// Build a registry from in-memory definitions.
    pub fn from_definitions(
        entity_types: BTreeMap<String, EntityTypeDef>,
        relationship_types: BTreeMap<String, RelationshipTypeDef>,
    ) -> Self {
        Self {
            entity_types,
            relationship_types,
        }
    }

    /// Load the registry from `schema_dir`, seeding and persisting the
    /// built-in defaults for any document that is absent.
    pub fn load(schema_dir: &Path) -> Result<Self, SchemaError> {
        let entity_types = load_or_seed(
            &schema_dir.join(ENTITY_TYPES_FILE),
            default_entity_types,
            "entity types",
        )?;
        let relationship_types = load_or_seed(
            &schema_dir.join(RELATIONSHIP_TYPES_FILE),
            default_relationship_types,
            "relationship types",
        )?;
        Ok(Self {
            entity_types,
            relationship_types,
        })
    }

    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeDef> {
        self.entity_types.get(name)
    }

    pub fn relationship_type(&self, name: &str) -> Option<&RelationshipTypeDef> {
        self.relationship_types.get(name)
    }

    pub fn entity_types(&self) -> &BTreeMap<String, EntityTypeDef> {
        &self.entity_types
    }

    pub fn relationship_types(&self) -> &BTreeMap<String, RelationshipTypeDef> {
        &self.relationship_types
    }

    pub fn entity_type_names(&self) -> impl Iterator<Item = &str> {
        self.entity_types.keys().map(String::as_str)
    }

    pub fn relationship_type_names(&self) -> impl Iterator<Item = &str> {
        self.relationship_types.keys().map(String::as_str)
    }

    /// Whether any entity type declares a property with this name.
    /// Used to whitelist property identifiers before they are spliced into
    /// query text.
    pub fn is_known_property(&self, name: &str) -> bool {
        self.entity_types
            .values()
            .any(|def| def.properties.contains_key(name))
    }

    /// Resolve an entity type to its effective definition by walking the
    /// inheritance chain and merging properties root-to-leaf, the leaf
    /// winning on name collisions.
    pub fn resolve_entity_type(&self, name: &str) -> Result<EffectiveEntityType, SchemaError> {
        let mut chain: Vec<&EntityTypeDef> = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut current = name;

        loop {
            if !visited.insert(current) {
                return Err(SchemaError::InheritanceCycle(name.to_string()));
            }
            let def = self.entity_types.get(current).ok_or_else(|| {
                if current == name {
                    SchemaError::UnknownEntityType(name.to_string())
                } else {
                    SchemaError::UnknownParentType {
                        type_name: name.to_string(),
                        parent: current.to_string(),
                    }
                }
            })?;
            chain.push(def);
            match &def.inherits {
                Some(parent) => current = parent.as_str(),
                None => break,
            }
        }

        // chain is leaf-first; apply root-first so the leaf overwrites.
        let mut properties = BTreeMap::new();
        for def in chain.iter().rev() {
            properties.extend(
                def.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        Ok(EffectiveEntityType {
            name: name.to_string(),
            properties,
        })
    }

    /// Resolve a relationship type by name.
    pub fn resolve_relationship_type(
        &self,
        name: &str,
    ) -> Result<&RelationshipTypeDef, SchemaError> {
        self.relationship_types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownRelationshipType(name.to_string()))
    }
}

fn load_or_seed<T: serde::Serialize + serde::de::DeserializeOwned>(
    path: &PathBuf,
    defaults: fn() -> BTreeMap<String, T>,
    what: &str,
) -> Result<BTreeMap<String, T>, SchemaError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let loaded: BTreeMap<String, T> = serde_json::from_str(&contents)?;
        info!(path = %path.display(), count = loaded.len(), "Loaded {what}");
        Ok(loaded)
    } else {
        warn!(path = %path.display(), "Schema document not found, seeding default {what}");
        let seeded = defaults();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(&seeded)?)?;
        info!(path = %path.display(), "Created default {what} document");
        Ok(seeded)
    }
}

/// Built-in entity types: a base type and two derived types.
fn default_entity_types() -> BTreeMap<String, EntityTypeDef> {
    let mut types = BTreeMap::new();

    types.insert(
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
    );

    types.insert(
        "Concept".to_string(),
        EntityTypeDef {
            description: "Represents a mathematical concept".to_string(),
            inherits: Some("Entity".to_string()),
            properties: BTreeMap::from([
                (
                    "domain".to_string(),
                    PropertyConstraint::required(PropertyKind::String),
                ),
                (
                    "tier".to_string(),
                    PropertyConstraint {
                        allowed_values: Some(vec![json!("L1"), json!("L2"), json!("L3")]),
                        ..PropertyConstraint::required(PropertyKind::String)
                    },
                ),
            ]),
        },
    );

    types.insert(
        "Symbol".to_string(),
        EntityTypeDef {
            description: "Represents a mathematical symbol or notation".to_string(),
            inherits: Some("Entity".to_string()),
            properties: BTreeMap::from([
                (
                    "notation".to_string(),
                    PropertyConstraint::required(PropertyKind::String),
                ),
                (
                    "latex".to_string(),
                    PropertyConstraint::of(PropertyKind::String),
                ),
                (
                    "context".to_string(),
                    PropertyConstraint::required(PropertyKind::String),
                ),
            ]),
        },
    );

    types
}

/// Built-in relationship types.
fn default_relationship_types() -> BTreeMap<String, RelationshipTypeDef> {
    let mut types = BTreeMap::new();

    types.insert(
        "REPRESENTS".to_string(),
        RelationshipTypeDef {
            description: "Symbol represents a concept".to_string(),
            source_types: vec!["Symbol".to_string()],
            target_types: vec!["Concept".to_string()],
            properties: BTreeMap::from([
                (
                    "context".to_string(),
                    PropertyConstraint::of(PropertyKind::String),
                ),
                (
                    "confidence".to_string(),
                    PropertyConstraint {
                        min: Some(0.0),
                        max: Some(1.0),
                        ..PropertyConstraint::of(PropertyKind::Number)
                    },
                ),
            ]),
        },
    );

    types.insert(
        "RELATES_TO".to_string(),
        RelationshipTypeDef {
            description: "Concept relates to another concept".to_string(),
            source_types: vec!["Concept".to_string()],
            target_types: vec!["Concept".to_string()],
            properties: BTreeMap::from([
                (
                    "relationship_type".to_string(),
                    PropertyConstraint::required(PropertyKind::String),
                ),
                (
                    "description".to_string(),
                    PropertyConstraint::of(PropertyKind::String),
                ),
            ]),
        },
    );

    types.insert(
        "APPEARS_IN".to_string(),
        RelationshipTypeDef {
            description: "Symbol or concept appears in a document".to_string(),
            source_types: vec!["Symbol".to_string(), "Concept".to_string()],
            target_types: vec!["Document".to_string()],
            properties: BTreeMap::from([
                (
                    "location".to_string(),
                    PropertyConstraint::of(PropertyKind::String),
                ),
                (
                    "context".to_string(),
                    PropertyConstraint::of(PropertyKind::String),
                ),
            ]),
        },
    );

    types
}
