//! Tier-scoped property projection.
//!
//! Entities may carry alternative values for the same logical property,
//! one per knowledge tier, as `<base>_l1` / `<base>_l2` / `<base>_l3`
//! siblings. Projecting an entity through a tier resolves those siblings:
//! the requested tier's value surfaces under the base name, other tiers'
//! values are dropped, and unsuffixed properties pass through unchanged.

use noema_core::types::{PropertyMap, Tier};

/// Project a property map through the requested tier.
///
/// Keys are visited in lexical order (`serde_json::Map` is a `BTreeMap`);
/// when a stripped name collides with an existing key, the lexically later
/// source key wins.
pub fn project(properties: &PropertyMap, tier: Tier) -> PropertyMap {
    let mut view = PropertyMap::new();
    for (key, value) in properties {
        match split_tier_suffix(key) {
            Some((base, t)) if t == tier => {
                view.insert(base.to_string(), value.clone());
            }
            Some(_) => {}
            None => {
                view.insert(key.clone(), value.clone());
            }
        }
    }
    view
}

/// Split a recognized tier suffix off a property name. A bare suffix
/// (`"_l2"`) is an ordinary property name, not a tiered one.
fn split_tier_suffix(key: &str) -> Option<(&str, Tier)> {
    for tier in Tier::ALL {
        if let Some(base) = key.strip_suffix(tier.suffix()) {
            if !base.is_empty() {
                return Some((base, tier));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> PropertyMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn requested_tier_strips_to_base_name() {
        let view = project(
            &props(json!({
                "id": "c1",
                "name": "Derivative",
                "definition_l1": "rate of change",
                "definition_l2": "limit of the difference quotient",
                "definition_l3": "linear map best approximating f"
            })),
            Tier::L2,
        );

        assert_eq!(view["id"], json!("c1"));
        assert_eq!(view["name"], json!("Derivative"));
        assert_eq!(view["definition"], json!("limit of the difference quotient"));
        assert!(!view.contains_key("definition_l1"));
        assert!(!view.contains_key("definition_l3"));
    }

    #[test]
    fn other_tiers_are_excluded_entirely() {
        let view = project(
            &props(json!({"summary_l3": "deep dive", "name": "x"})),
            Tier::L1,
        );
        assert_eq!(view.len(), 1);
        assert_eq!(view["name"], json!("x"));
    }

    #[test]
    fn projection_is_idempotent() {
        let source = props(json!({
            "id": "c1",
            "definition_l1": "short",
            "definition_l2": "medium",
            "note": "plain"
        }));
        let once = project(&source, Tier::L1);
        let twice = project(&once, Tier::L1);
        assert_eq!(once, twice);
    }

    #[test]
    fn collision_resolves_to_lexically_later_key() {
        // "definition" and "definition_l1" both project to "definition"
        // under L1; the suffixed key sorts later and wins.
        let view = project(
            &props(json!({
                "definition": "unsuffixed",
                "definition_l1": "tiered"
            })),
            Tier::L1,
        );
        assert_eq!(view["definition"], json!("tiered"));
    }

    #[test]
    fn bare_suffix_is_an_ordinary_name() {
        let view = project(&props(json!({"_l1": "odd"})), Tier::L2);
        assert_eq!(view["_l1"], json!("odd"));
    }
}
