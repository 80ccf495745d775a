//! Property payload validation against resolved type definitions.
//!
//! Validation accumulates every violation rather than stopping at the
//! first, and never mutates the payload. Both declared properties and
//! payload keys are visited in lexical order, so the violation list is
//! reproducible for a given (type, payload) pair.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::{PropertyConstraint, PropertyKind, RelationshipTypeDef};

/// Flat property payload, as supplied by the caller.
pub type Payload = serde_json::Map<String, Value>;

/// Validate a payload against a set of declared properties.
///
/// `context` names the entity or relationship type being validated and
/// only appears in violation messages. The payload is closed: keys not
/// declared for the type are violations, never silently dropped.
pub fn validate_properties(
    context: &str,
    declared: &BTreeMap<String, PropertyConstraint>,
    payload: &Payload,
) -> Vec<String> {
    let mut violations = Vec::new();

    for (name, constraint) in declared {
        if constraint.required && !payload.contains_key(name) {
            violations.push(format!("required property '{name}' is missing"));
        }
    }

    for (name, value) in payload {
        let Some(constraint) = declared_for(declared, name) else {
            violations.push(format!(
                "property '{name}' is not defined in the schema for '{context}'"
            ));
            continue;
        };
        check_constraint(name, constraint, value, &mut violations);
    }

    violations
}

/// Property-name suffixes marking tier-scoped siblings of a base property.
const TIER_SUFFIXES: [&str; 3] = ["_l1", "_l2", "_l3"];

/// Look up the declaration for a payload key. A tier-suffixed sibling
/// (`summary_l2`) of a declared property is validated against the base
/// declaration (`summary`).
fn declared_for<'a>(
    declared: &'a BTreeMap<String, PropertyConstraint>,
    name: &str,
) -> Option<&'a PropertyConstraint> {
    if let Some(constraint) = declared.get(name) {
        return Some(constraint);
    }
    for suffix in TIER_SUFFIXES {
        if let Some(base) = name.strip_suffix(suffix) {
            if !base.is_empty() {
                if let Some(constraint) = declared.get(base) {
                    return Some(constraint);
                }
            }
        }
    }
    None
}

/// Check that the caller-resolved endpoint types of a relationship are
/// members of the allowed source/target sets. Empty sets are unrestricted.
pub fn validate_endpoints(
    rel_name: &str,
    def: &RelationshipTypeDef,
    source_type: &str,
    target_type: &str,
) -> Vec<String> {
    let mut violations = Vec::new();

    if !def.source_types.is_empty() && !def.source_types.iter().any(|t| t == source_type) {
        violations.push(format!(
            "source type '{source_type}' is not allowed for relationship '{rel_name}' (allowed: {})",
            def.source_types.join(", ")
        ));
    }
    if !def.target_types.is_empty() && !def.target_types.iter().any(|t| t == target_type) {
        violations.push(format!(
            "target type '{target_type}' is not allowed for relationship '{rel_name}' (allowed: {})",
            def.target_types.join(", ")
        ));
    }

    violations
}

fn check_constraint(
    name: &str,
    constraint: &PropertyConstraint,
    value: &Value,
    violations: &mut Vec<String>,
) {
    if !constraint.kind.matches(value) {
        violations.push(format!(
            "property '{name}' must be a {}",
            constraint.kind.as_str()
        ));
    }

    if let Some(allowed) = &constraint.allowed_values {
        if !allowed.contains(value) {
            let rendered: Vec<String> = allowed.iter().map(render_literal).collect();
            violations.push(format!(
                "property '{name}' must be one of: {}",
                rendered.join(", ")
            ));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(min) = constraint.min {
            if number < min {
                violations.push(format!("property '{name}' must be at least {min}"));
            }
        }
        if let Some(max) = constraint.max {
            if number > max {
                violations.push(format!("property '{name}' must be at most {max}"));
            }
        }
    }

    if let Some(text) = value.as_str() {
        let chars = text.chars().count();
        if let Some(min_length) = constraint.min_length {
            if chars < min_length {
                violations.push(format!(
                    "property '{name}' must have at least {min_length} characters"
                ));
            }
        }
        if let Some(max_length) = constraint.max_length {
            if chars > max_length {
                violations.push(format!(
                    "property '{name}' must have at most {max_length} characters"
                ));
            }
        }
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
