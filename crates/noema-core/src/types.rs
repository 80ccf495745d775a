//! Core domain types for the noema knowledge graph.
//!
//! These types describe the records exchanged with the graph access layer:
//! entities, relationships, traversal paths, and the pagination envelope
//! around list operations. They are storage-agnostic; the graph crate is
//! responsible for shaping driver rows into them.

use serde::{Deserialize, Serialize};

/// Flat property payload of an entity or relationship.
///
/// `serde_json::Map` is backed by a `BTreeMap`, so iteration order is
/// lexical by key. Deterministic validation and tier projection rely on
/// this.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

// ── Records ───────────────────────────────────────────────────────

/// A typed node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub entity_type: String,
    pub properties: PropertyMap,
}

/// A typed, directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub id: String,
    pub rel_type: String,
    pub source_id: String,
    pub target_id: String,
    pub properties: PropertyMap,
}

/// An entity reached through a single relationship, together with that
/// relationship's data. Returned by adjacency queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity: EntityRecord,
    pub rel_type: String,
    pub relationship: PropertyMap,
}

/// One relationship along a traversal path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRelationship {
    pub rel_type: String,
    pub properties: PropertyMap,
}

/// A path through the graph. `length` is the number of relationships;
/// a zero-length path contains exactly one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPath {
    pub length: i64,
    pub nodes: Vec<PropertyMap>,
    pub relationships: Vec<PathRelationship>,
}

/// An entity viewed through a knowledge tier: tier-suffixed properties are
/// resolved to their base names, other tiers' properties are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieredEntity {
    pub id: String,
    pub entity_type: Option<String>,
    pub tier: Tier,
    pub properties: PropertyMap,
}

/// A concept in another domain bridged through an intermediate concept:
/// `source -> concept -> target` with domain filters applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainMapping {
    pub source: EntityRecord,
    pub source_rel_type: String,
    pub source_relation: PropertyMap,
    pub target: EntityRecord,
    pub target_rel_type: String,
    pub target_relation: PropertyMap,
}

/// Result of a cross-domain mapping query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrossDomainResult {
    /// No domain filter: every concept directly linked through a
    /// cross-reference relationship.
    Adjacent(Vec<RelatedEntity>),
    /// Domain-filtered: two-hop mappings through the anchor concept.
    Bridged(Vec<DomainMapping>),
}

// ── Pagination ────────────────────────────────────────────────────

/// Default number of items per page when the caller supplies none or an
/// out-of-range value.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard ceiling on page size; anything above it falls back to the default.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A caller-supplied page request, not yet normalized.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp the request into a valid window: negative page becomes 0,
    /// non-positive or over-ceiling page size becomes the default.
    pub fn normalized(self) -> Self {
        let page = if self.page < 0 { 0 } else { self.page };
        let page_size = if self.page_size <= 0 || self.page_size > MAX_PAGE_SIZE {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        };
        Self { page, page_size }
    }

    /// Offset of the first row of this page. Call on a normalized request.
    pub fn skip(self) -> i64 {
        self.page * self.page_size
    }
}

/// Pagination metadata returned alongside every page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// Compute metadata for a normalized request and a total row count.
    /// `total_pages` is 0 exactly when `total_count` is 0.
    pub fn compute(request: PageRequest, total_count: i64) -> Self {
        let PageRequest { page, page_size } = request;
        let total_pages = if total_count > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            page,
            page_size,
            total_count,
            total_pages,
            has_next: page < total_pages - 1,
            has_prev: page > 0,
        }
    }
}

/// A page of results plus its pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

// ── Traversal direction ───────────────────────────────────────────

/// Direction of relationships relative to an anchor entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    /// Parse a caller-supplied direction. Anything unrecognized (including
    /// absence) normalizes to `Both`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("outgoing") => Self::Outgoing,
            Some("incoming") => Self::Incoming,
            _ => Self::Both,
        }
    }
}

// ── Knowledge tiers ───────────────────────────────────────────────

/// A named scoping level selecting among alternative property values
/// carried by the same entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tier {
    L1,
    L2,
    L3,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::L1, Tier::L2, Tier::L3];

    /// Parse a caller-supplied tier label. Anything unrecognized (including
    /// absence) normalizes to `L1`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("L1") => Self::L1,
            Some("L2") => Self::L2,
            Some("L3") => Self::L3,
            _ => Self::L1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        }
    }

    /// Property-name suffix marking a value as belonging to this tier.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::L1 => "_l1",
            Self::L2 => "_l2",
            Self::L3 => "_l3",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_normalizes_negative_page() {
        let req = PageRequest {
            page: -1,
            page_size: 500,
        }
        .normalized();
        assert_eq!(req.page, 0);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn page_request_keeps_valid_window() {
        let req = PageRequest {
            page: 3,
            page_size: 100,
        }
        .normalized();
        assert_eq!(req.page, 3);
        assert_eq!(req.page_size, 100);
        assert_eq!(req.skip(), 300);
    }

    #[test]
    fn page_meta_math() {
        let req = PageRequest {
            page: 0,
            page_size: 20,
        };
        let meta = PageMeta::compute(req, 41);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        let last = PageMeta::compute(
            PageRequest {
                page: 2,
                page_size: 20,
            },
            41,
        );
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn page_meta_empty_result() {
        let meta = PageMeta::compute(PageRequest::default(), 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn page_meta_exact_multiple() {
        let meta = PageMeta::compute(
            PageRequest {
                page: 1,
                page_size: 20,
            },
            40,
        );
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
    }

    #[test]
    fn direction_normalizes() {
        assert_eq!(Direction::from_param(Some("outgoing")), Direction::Outgoing);
        assert_eq!(Direction::from_param(Some("incoming")), Direction::Incoming);
        assert_eq!(Direction::from_param(Some("sideways")), Direction::Both);
        assert_eq!(Direction::from_param(None), Direction::Both);
    }

    #[test]
    fn tier_normalizes() {
        assert_eq!(Tier::from_param(Some("L2")), Tier::L2);
        assert_eq!(Tier::from_param(Some("L9")), Tier::L1);
        assert_eq!(Tier::from_param(None), Tier::L1);
        assert_eq!(Tier::L3.suffix(), "_l3");
    }
}
