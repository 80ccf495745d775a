//! Schema definition types.
//!
//! Field names mirror the persisted JSON documents, so a registry written
//! by one process loads unchanged in another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The runtime kind a property value must have.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl PropertyKind {
    /// Whether a JSON value has this kind.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Constraints on a single declared property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyConstraint {
    #[serde(rename = "type")]
    pub kind: PropertyKind,

    #[serde(default)]
    pub required: bool,

    /// Allowed literal values, when the property is an enumeration.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,

    /// Inclusive lower bound for numeric properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive upper bound for numeric properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Minimum character count for string properties.
    #[serde(rename = "minLength", default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum character count for string properties.
    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl PropertyConstraint {
    /// A constraint with just a kind; everything else unset.
    pub fn of(kind: PropertyKind) -> Self {
        Self {
            kind,
            required: false,
            allowed_values: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn required(kind: PropertyKind) -> Self {
        Self {
            required: true,
            ..Self::of(kind)
        }
    }
}

/// An entity type: single-parent inheritance plus its own property
/// declarations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityTypeDef {
    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyConstraint>,
}

/// A relationship type: allowed endpoint entity types plus property
/// declarations. Empty endpoint lists mean unrestricted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipTypeDef {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub source_types: Vec<String>,

    #[serde(default)]
    pub target_types: Vec<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, PropertyConstraint>,
}

/// An entity type after resolving its inheritance chain: the union of its
/// own and all ancestors' properties, with the leaf winning on collisions.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEntityType {
    pub name: String,
    pub properties: BTreeMap<String, PropertyConstraint>,
}
