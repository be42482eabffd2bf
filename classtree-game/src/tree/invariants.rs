//! Structural checks for tree edges and whole catalogs.
//!
//! The builder runs [`check_edge`] on every candidate before insertion;
//! [`validate_catalog`] re-derives every invariant from a finished catalog.
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::catalog::{Catalog, NodeOrigin};
use crate::constants::{MAX_DEPTH, MIN_DIRECT_COMMON, MIN_DIRECT_HIGHER, MIN_DIRECT_UNCOMMON};
use crate::rarity::RarityTier;
use crate::templates::BaseClassId;

/// Depth and rarity of one endpoint of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeView<'a> {
    pub id: &'a str,
    pub depth: u8,
    pub rarity: RarityTier,
}

impl<'a> NodeView<'a> {
    /// The implicit depth-0 root of a base class tree.
    #[must_use]
    pub const fn root(base: BaseClassId) -> Self {
        Self {
            id: base.key(),
            depth: 0,
            rarity: RarityTier::Common,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{child} ({child_rarity}) is below its parent {parent} ({parent_rarity})")]
    RarityRegression {
        parent: String,
        child: String,
        parent_rarity: RarityTier,
        child_rarity: RarityTier,
    },
    #[error("{child} must be rarer than {parent} ({parent_rarity})")]
    StrictIncreaseMissing {
        parent: String,
        child: String,
        parent_rarity: RarityTier,
    },
    #[error("{node} has depth {depth} outside 1..=10")]
    DepthOutOfRange { node: String, depth: u8 },
    #[error("{child} (depth {child_depth}) does not sit below {parent} (depth {parent_depth})")]
    DepthNotIncreasing {
        parent: String,
        child: String,
        parent_depth: u8,
        child_depth: u8,
    },
    #[error("{node} has depth {depth} but rarity {rarity}")]
    DepthRarityDecoupled {
        node: String,
        depth: u8,
        rarity: RarityTier,
    },
    #[error("structural node {node} is not a direct child (depth {depth})")]
    StructuralNotDirect { node: String, depth: u8 },
    #[error("common path of {base} broken at position {position}: {detail}")]
    CommonPathBroken {
        base: BaseClassId,
        position: usize,
        detail: String,
    },
    #[error("duplicate node id {id}")]
    DuplicateId { id: String },
    #[error("duplicate display name {name}")]
    DuplicateName { name: String },
    #[error("{child} has more than one parent edge")]
    DuplicateParent { child: String },
    #[error("edge {from} -> {to} references an unknown node")]
    DanglingEdge { from: String, to: String },
    #[error("{base} misses its minimums without a reported shortfall")]
    UnreportedShortfall { base: BaseClassId },
}

/// Check one parent-child edge for the node's construction phase.
///
/// # Errors
///
/// Returns the first [`InvariantViolation`] the edge breaks.
pub fn check_edge(
    parent: NodeView<'_>,
    child: NodeView<'_>,
    origin: NodeOrigin,
) -> Result<(), InvariantViolation> {
    if child.depth == 0 || child.depth > MAX_DEPTH {
        return Err(InvariantViolation::DepthOutOfRange {
            node: child.id.to_string(),
            depth: child.depth,
        });
    }
    if child.depth <= parent.depth {
        return Err(InvariantViolation::DepthNotIncreasing {
            parent: parent.id.to_string(),
            child: child.id.to_string(),
            parent_depth: parent.depth,
            child_depth: child.depth,
        });
    }
    if child.rarity < parent.rarity {
        return Err(InvariantViolation::RarityRegression {
            parent: parent.id.to_string(),
            child: child.id.to_string(),
            parent_rarity: parent.rarity,
            child_rarity: child.rarity,
        });
    }
    if parent.rarity.requires_strict_increase()
        && !parent.rarity.is_max()
        && child.rarity <= parent.rarity
    {
        return Err(InvariantViolation::StrictIncreaseMissing {
            parent: parent.id.to_string(),
            child: child.id.to_string(),
            parent_rarity: parent.rarity,
        });
    }
    match origin {
        NodeOrigin::Structural if child.depth != 1 => {
            Err(InvariantViolation::StructuralNotDirect {
                node: child.id.to_string(),
                depth: child.depth,
            })
        }
        NodeOrigin::Growth if child.depth != child.rarity.coupled_depth() => {
            Err(InvariantViolation::DepthRarityDecoupled {
                node: child.id.to_string(),
                depth: child.depth,
                rarity: child.rarity,
            })
        }
        _ => Ok(()),
    }
}

/// Every violation found in a finished catalog; empty means the catalog is sound.
///
/// Missing direct-child minimums only count when the construction report
/// does not already declare them.
#[must_use]
pub fn validate_catalog(catalog: &Catalog) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut views: HashMap<&str, NodeView<'_>> = HashMap::new();
    let mut names = HashSet::new();

    for base in BaseClassId::ALL {
        views.insert(base.key(), NodeView::root(base));
    }
    for entry in &catalog.generated_classes {
        let view = NodeView {
            id: entry.id(),
            depth: entry.level(),
            rarity: entry.class_data.rarity,
        };
        if views.insert(entry.id(), view).is_some() {
            violations.push(InvariantViolation::DuplicateId {
                id: entry.id().to_string(),
            });
        }
        if !names.insert(entry.class_data.name.as_str()) {
            violations.push(InvariantViolation::DuplicateName {
                name: entry.class_data.name.clone(),
            });
        }
    }

    let origins: HashMap<&str, NodeOrigin> = catalog
        .generated_classes
        .iter()
        .map(|entry| (entry.id(), entry.origin))
        .collect();
    let mut children = HashSet::new();
    for edge in &catalog.tree_structure.connections {
        if !children.insert(edge.to.as_str()) {
            violations.push(InvariantViolation::DuplicateParent {
                child: edge.to.clone(),
            });
        }
        let (Some(parent), Some(child), Some(origin)) = (
            views.get(edge.from.as_str()),
            views.get(edge.to.as_str()),
            origins.get(edge.to.as_str()),
        ) else {
            violations.push(InvariantViolation::DanglingEdge {
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
            continue;
        };
        if let Err(violation) = check_edge(*parent, *child, *origin) {
            violations.push(violation);
        }
    }

    for base in BaseClassId::ALL {
        check_common_path(catalog, base, &mut violations);
    }
    check_minimums(catalog, &mut violations);
    violations
}

fn check_common_path(
    catalog: &Catalog,
    base: BaseClassId,
    violations: &mut Vec<InvariantViolation>,
) {
    let mut expected_parent = base.key();
    for (position, id) in catalog.common_path(base).iter().enumerate() {
        let broken = |detail: String| InvariantViolation::CommonPathBroken {
            base,
            position,
            detail,
        };
        let Some(entry) = catalog.node(id) else {
            violations.push(broken(format!("unknown node {id}")));
            return;
        };
        let expected_depth = position + 1;
        if usize::from(entry.level()) != expected_depth {
            violations.push(broken(format!(
                "depth {} where {expected_depth} was expected",
                entry.level()
            )));
        }
        if entry.class_data.rarity != RarityTier::Common {
            violations.push(broken(format!("rarity {}", entry.class_data.rarity)));
        }
        if entry.parent_id() != Some(expected_parent) {
            violations.push(broken(format!("parent is not {expected_parent}")));
        }
        expected_parent = entry.id();
    }
}

fn check_minimums(catalog: &Catalog, violations: &mut Vec<InvariantViolation>) {
    for base in BaseClassId::ALL {
        let (mut common, mut uncommon, mut higher) = (0_u32, 0_u32, 0_u32);
        for entry in catalog.nodes_for(base).filter(|e| e.level() == 1) {
            match entry.class_data.rarity {
                RarityTier::Common => common += 1,
                RarityTier::Uncommon => uncommon += 1,
                _ => higher += 1,
            }
        }
        let met = common >= MIN_DIRECT_COMMON
            && uncommon >= MIN_DIRECT_UNCOMMON
            && higher >= MIN_DIRECT_HIGHER;
        let reported = catalog
            .report
            .base(base)
            .is_some_and(|report| report.shortfalls.iter().any(|s| s.is_structural()));
        if !met && !reported {
            violations.push(InvariantViolation::UnreportedShortfall { base });
        }
    }
}
