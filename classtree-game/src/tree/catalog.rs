use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::constants::{
    COMMON_PATH_LENGTH, MAX_DEPTH, MIN_DIRECT_COMMON, MIN_DIRECT_HIGHER, MIN_DIRECT_UNCOMMON,
};
use crate::generator::GeneratedClass;
use crate::rarity::RarityTier;
use crate::rules::UnlockRule;
use crate::templates::{BaseClass, BaseClassId};

/// Which construction phase produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    /// Forced direct child satisfying a per-base minimum.
    Structural,
    CommonPath,
    Growth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Evolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEdge {
    pub from: String,
    pub to: String,
    pub condition_id: String,
    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub class_data: GeneratedClass,
    pub unlock_rule: UnlockRule,
    pub origin: NodeOrigin,
    /// Set only on player views built through [`Catalog::mark_unlocked`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked: Option<bool>,
}

impl CatalogEntry {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.class_data.id
    }

    #[must_use]
    pub fn base_class(&self) -> Option<BaseClassId> {
        self.class_data.placement.as_ref().map(|p| p.base_class)
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.class_data.placement.as_ref().map_or(0, |p| p.level)
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.class_data
            .placement
            .as_ref()
            .map(|p| p.evolves_from.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStructure {
    pub base_classes: Vec<BaseClassId>,
    pub connections: Vec<TreeEdge>,
}

/// Minimum or target a base class failed to reach before the budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shortfall {
    DirectCommon { required: u32, found: u32 },
    DirectUncommon { required: u32, found: u32 },
    DirectHigher { required: u32, found: u32 },
    CommonPath { required: usize, reached: usize },
    TargetCount { target: usize, reached: usize },
}

impl Shortfall {
    /// Missing direct-child minimums; the rest are soft goals.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DirectCommon { .. } | Self::DirectUncommon { .. } | Self::DirectHigher { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseReport {
    pub base_class: BaseClassId,
    pub target: usize,
    pub generated: usize,
    pub direct_common: u32,
    pub direct_uncommon: u32,
    pub direct_higher: u32,
    pub common_path_len: usize,
    pub shortfalls: Vec<Shortfall>,
}

impl BaseReport {
    #[must_use]
    pub fn new(
        base_class: BaseClassId,
        target: usize,
        generated: usize,
        direct: [u32; 3],
        common_path_len: usize,
    ) -> Self {
        let [direct_common, direct_uncommon, direct_higher] = direct;
        let mut shortfalls = Vec::new();
        if direct_common < MIN_DIRECT_COMMON {
            shortfalls.push(Shortfall::DirectCommon {
                required: MIN_DIRECT_COMMON,
                found: direct_common,
            });
        }
        if direct_uncommon < MIN_DIRECT_UNCOMMON {
            shortfalls.push(Shortfall::DirectUncommon {
                required: MIN_DIRECT_UNCOMMON,
                found: direct_uncommon,
            });
        }
        if direct_higher < MIN_DIRECT_HIGHER {
            shortfalls.push(Shortfall::DirectHigher {
                required: MIN_DIRECT_HIGHER,
                found: direct_higher,
            });
        }
        if common_path_len < COMMON_PATH_LENGTH {
            shortfalls.push(Shortfall::CommonPath {
                required: COMMON_PATH_LENGTH,
                reached: common_path_len,
            });
        }
        if generated < target {
            shortfalls.push(Shortfall::TargetCount {
                target,
                reached: generated,
            });
        }
        Self {
            base_class,
            target,
            generated,
            direct_common,
            direct_uncommon,
            direct_higher,
            common_path_len,
            shortfalls,
        }
    }
}

/// Discard counters; observable so tests can assert the retry policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub iterations: usize,
    pub accepted: usize,
    pub duplicate_ids: usize,
    pub duplicate_parents: usize,
    pub name_exhausted: usize,
    pub rule_id_exhausted: usize,
    pub template_failures: usize,
    pub invariant_rejections: usize,
    pub no_parent_available: usize,
}

impl BuildStats {
    #[must_use]
    pub const fn discarded(&self) -> usize {
        self.duplicate_ids
            + self.duplicate_parents
            + self.name_exhausted
            + self.rule_id_exhausted
            + self.template_failures
            + self.invariant_rejections
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionReport {
    pub iteration_budget: usize,
    pub budget_exhausted: bool,
    pub stats: BuildStats,
    pub bases: Vec<BaseReport>,
}

impl ConstructionReport {
    /// True when no base class has an outstanding shortfall.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.bases.iter().all(|base| base.shortfalls.is_empty())
    }

    /// True when every base class met its direct-child minimums.
    #[must_use]
    pub fn minimums_met(&self) -> bool {
        self.bases
            .iter()
            .all(|base| !base.shortfalls.iter().any(Shortfall::is_structural))
    }

    pub fn shortfalls(&self) -> impl Iterator<Item = (BaseClassId, &Shortfall)> {
        self.bases
            .iter()
            .flat_map(|base| base.shortfalls.iter().map(move |s| (base.base_class, s)))
    }

    #[must_use]
    pub fn base(&self, base_class: BaseClassId) -> Option<&BaseReport> {
        self.bases.iter().find(|b| b.base_class == base_class)
    }
}

/// Everything one tree build produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub base_classes: Vec<BaseClass>,
    pub generated_classes: Vec<CatalogEntry>,
    pub unlock_rules: Vec<UnlockRule>,
    pub tree_structure: TreeStructure,
    pub common_paths: BTreeMap<BaseClassId, Vec<String>>,
    pub report: ConstructionReport,
}

impl Catalog {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&CatalogEntry> {
        self.generated_classes.iter().find(|entry| entry.id() == id)
    }

    pub fn nodes_for(&self, base_class: BaseClassId) -> impl Iterator<Item = &CatalogEntry> {
        self.generated_classes
            .iter()
            .filter(move |entry| entry.base_class() == Some(base_class))
    }

    #[must_use]
    pub fn common_path(&self, base_class: BaseClassId) -> &[String] {
        self.common_paths
            .get(&base_class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Flag every node as unlocked or not for a player view. A node counts
    /// as unlocked when either its class id or its rule id is in `unlocked_ids`.
    pub fn mark_unlocked(&mut self, unlocked_ids: &HashSet<String>) {
        for entry in &mut self.generated_classes {
            let unlocked = unlocked_ids.contains(&entry.class_data.id)
                || unlocked_ids.contains(&entry.unlock_rule.id);
            entry.unlocked = Some(unlocked);
        }
    }

    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.generated_classes
            .iter()
            .filter(|entry| entry.unlocked == Some(true))
            .count()
    }

    #[must_use]
    pub fn per_base_counts(&self) -> BTreeMap<BaseClassId, usize> {
        let mut counts: BTreeMap<BaseClassId, usize> =
            BaseClassId::ALL.into_iter().map(|base| (base, 0)).collect();
        for base in self.generated_classes.iter().filter_map(CatalogEntry::base_class) {
            *counts.entry(base).or_default() += 1;
        }
        counts
    }

    /// Node counts indexed by depth (index 0 is depth 1).
    #[must_use]
    pub fn depth_histogram(&self) -> [usize; MAX_DEPTH as usize] {
        let mut histogram = [0; MAX_DEPTH as usize];
        for entry in &self.generated_classes {
            if let Some(slot) = usize::from(entry.level())
                .checked_sub(1)
                .and_then(|idx| histogram.get_mut(idx))
            {
                *slot += 1;
            }
        }
        histogram
    }

    #[must_use]
    pub fn rarity_histogram(&self) -> BTreeMap<RarityTier, usize> {
        let mut histogram = BTreeMap::new();
        for entry in &self.generated_classes {
            *histogram.entry(entry.class_data.rarity).or_default() += 1;
        }
        histogram
    }
}
