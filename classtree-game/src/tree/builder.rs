//! Grows five base class trees under the structural rules.
//!
//! Every loop pass does one unit of work for one base class, in priority
//! order:
//!
//! 1. force a missing direct child (Common, Uncommon, then two Higher),
//! 2. maybe extend the all-Common path toward depth 10,
//! 3. otherwise hang a sampled child off a weighted existing node.
//!
//! Candidates that collide on id or parent, or fail [`check_edge`], are
//! dropped and counted in [`BuildStats`]. The loop stops when every base is
//! satisfied or the iteration budget runs out; in the latter case the catalog
//! is returned as-is with its shortfalls listed in the report.
use log::{debug, info, warn};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

use super::catalog::{
    BaseReport, BuildStats, Catalog, CatalogEntry, ConstructionReport, EdgeKind, NodeOrigin,
    TreeEdge, TreeStructure,
};
use super::config::{TreeConfig, TreeConfigError};
use super::invariants::{NodeView, check_edge};
use crate::constants::{
    COMMON_PATH_LENGTH, GENERATED_RULE_EVENTS, MAX_DEPTH, MIN_DIRECT_COMMON, MIN_DIRECT_HIGHER,
    MIN_DIRECT_UNCOMMON, NAME_SUFFIX_MAX, RULE_ID_ATTEMPTS,
};
use crate::generator::{GenerateRequest, TreePlacement, generate_class};
use crate::numbers::usize_to_f64;
use crate::rarity::{RarityTier, sample_rarity};
use crate::retry::{retry_bounded, retry_until};
use crate::rules::{Aggregation, RuleMatch, RuleOrigin, UnlockRule};
use crate::templates::{BaseClassId, CLASS_TEMPLATES, ClassTemplate, base_classes};

const FIRST_HIGHER_TIERS: [RarityTier; 3] =
    [RarityTier::Magic, RarityTier::Rare, RarityTier::Epic];

/// Builds catalogs from a validated [`TreeConfig`].
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    config: TreeConfig,
}

impl TreeBuilder {
    /// # Errors
    ///
    /// Returns [`TreeConfigError`] when the configuration fails validation.
    pub fn new(config: TreeConfig) -> Result<Self, TreeConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Run the construction loop to completion or budget exhaustion.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Catalog {
        self.build_within(self.config.iteration_budget(), rng)
    }

    fn build_within<R: Rng + ?Sized>(&self, budget: usize, rng: &mut R) -> Catalog {
        let target = self.config.per_base_target();
        let mut state = BuildState::new(&self.config);
        let mut cursor = 0_usize;

        while state.stats.iterations < budget {
            let deficient = state.pick(&mut cursor, |b| b.structural_need().is_some());
            let step = match deficient {
                Some(idx) => Step::Structural(idx),
                None => match state.pick(&mut cursor, |b| !b.is_done(target)) {
                    Some(idx) => Step::Grow(idx),
                    None => break,
                },
            };
            state.stats.iterations += 1;
            match step {
                Step::Structural(idx) => state.add_structural(idx, rng),
                Step::Grow(idx) => state.grow(idx, rng),
            }
        }

        let budget_exhausted = state.bases.iter().any(|b| !b.is_done(target));
        state.into_catalog(target, budget, budget_exhausted)
    }
}

/// Build a catalog with default tuning and the given total size.
///
/// # Errors
///
/// Returns [`TreeConfigError`] if the derived configuration is invalid.
pub fn build_class_tree<R: Rng + ?Sized>(
    target_total_nodes: usize,
    rng: &mut R,
) -> Result<Catalog, TreeConfigError> {
    let builder = TreeBuilder::new(TreeConfig::with_target(target_total_nodes))?;
    Ok(builder.build(rng))
}

enum Step {
    Structural(usize),
    Grow(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StructuralNeed {
    Common,
    Uncommon,
    FirstHigher,
    SecondHigher,
}

#[derive(Debug, Clone)]
struct Slot {
    id: String,
    depth: u8,
    rarity: RarityTier,
}

impl Slot {
    fn view(&self) -> NodeView<'_> {
        NodeView {
            id: &self.id,
            depth: self.depth,
            rarity: self.rarity,
        }
    }
}

/// A node the builder intends to create, before generation.
struct Plan {
    template: &'static ClassTemplate,
    parent: Slot,
    depth: u8,
    rarity: RarityTier,
    origin: NodeOrigin,
}

struct BaseState {
    base: BaseClassId,
    nodes: Vec<Slot>,
    /// Direct children by bucket: Common, Uncommon, Higher.
    direct: [u32; 3],
    common_path: Vec<String>,
}

impl BaseState {
    const fn new(base: BaseClassId) -> Self {
        Self {
            base,
            nodes: Vec::new(),
            direct: [0; 3],
            common_path: Vec::new(),
        }
    }

    fn root(&self) -> Slot {
        let view = NodeView::root(self.base);
        Slot {
            id: view.id.to_string(),
            depth: view.depth,
            rarity: view.rarity,
        }
    }

    fn structural_need(&self) -> Option<StructuralNeed> {
        let [common, uncommon, higher] = self.direct;
        if common < MIN_DIRECT_COMMON {
            Some(StructuralNeed::Common)
        } else if uncommon < MIN_DIRECT_UNCOMMON {
            Some(StructuralNeed::Uncommon)
        } else if higher == 0 {
            Some(StructuralNeed::FirstHigher)
        } else if higher < MIN_DIRECT_HIGHER {
            Some(StructuralNeed::SecondHigher)
        } else {
            None
        }
    }

    fn is_done(&self, target: usize) -> bool {
        self.nodes.len() >= target && self.structural_need().is_none()
    }

    fn common_path_tail(&self) -> Option<&str> {
        self.common_path.last().map(String::as_str)
    }

    fn record(&mut self, slot: Slot, origin: NodeOrigin) {
        if slot.depth == 1 {
            let bucket = match slot.rarity {
                RarityTier::Common => 0,
                RarityTier::Uncommon => 1,
                _ => 2,
            };
            self.direct[bucket] += 1;
        }
        if origin == NodeOrigin::CommonPath {
            self.common_path.push(slot.id.clone());
        }
        self.nodes.push(slot);
    }
}

struct BuildState<'c> {
    config: &'c TreeConfig,
    bases: Vec<BaseState>,
    used_ids: HashSet<String>,
    used_names: HashSet<String>,
    parent_of: HashMap<String, String>,
    rule_ids: HashSet<String>,
    entries: Vec<CatalogEntry>,
    edges: Vec<TreeEdge>,
    stats: BuildStats,
}

impl<'c> BuildState<'c> {
    fn new(config: &'c TreeConfig) -> Self {
        Self {
            config,
            bases: BaseClassId::ALL.into_iter().map(BaseState::new).collect(),
            used_ids: BaseClassId::ALL
                .iter()
                .map(|base| base.key().to_string())
                .collect(),
            used_names: HashSet::new(),
            parent_of: HashMap::new(),
            rule_ids: HashSet::new(),
            entries: Vec::new(),
            edges: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Round-robin over the bases matching `wanted`.
    fn pick(&self, cursor: &mut usize, wanted: impl Fn(&BaseState) -> bool) -> Option<usize> {
        let eligible: Vec<usize> = self
            .bases
            .iter()
            .enumerate()
            .filter(|(_, base)| wanted(base))
            .map(|(idx, _)| idx)
            .collect();
        let idx = *eligible.get(*cursor % eligible.len().max(1))?;
        *cursor = cursor.wrapping_add(1);
        Some(idx)
    }

    fn add_structural<R: Rng + ?Sized>(&mut self, idx: usize, rng: &mut R) {
        let base = &self.bases[idx];
        let (Some(need), Some(template)) = (base.structural_need(), CLASS_TEMPLATES.choose(rng))
        else {
            return;
        };
        let rarity = match need {
            StructuralNeed::Common => RarityTier::Common,
            StructuralNeed::Uncommon => RarityTier::Uncommon,
            StructuralNeed::FirstHigher => *FIRST_HIGHER_TIERS
                .choose(rng)
                .unwrap_or(&RarityTier::Magic),
            StructuralNeed::SecondHigher => *RarityTier::ALL[RarityTier::HIGHER_FROM.ordinal()..]
                .choose(rng)
                .unwrap_or(&RarityTier::Magic),
        };
        let plan = Plan {
            template,
            parent: base.root(),
            depth: 1,
            rarity,
            origin: NodeOrigin::Structural,
        };
        self.commit(idx, plan, rng);
    }

    fn grow<R: Rng + ?Sized>(&mut self, idx: usize, rng: &mut R) {
        let path_len = self.bases[idx].common_path.len();
        if path_len < COMMON_PATH_LENGTH
            && rng.gen_bool(self.extend_chance(path_len))
            && let Some(template) = CLASS_TEMPLATES.choose(rng)
        {
            let plan = self.common_path_plan(idx, template);
            self.commit(idx, plan, rng);
            return;
        }
        match self.growth_plan(idx, rng) {
            Some(plan) => self.commit(idx, plan, rng),
            None => {
                self.stats.no_parent_available += 1;
                debug!("no eligible parent in {} tree", self.bases[idx].base);
            }
        }
    }

    fn extend_chance(&self, path_len: usize) -> f64 {
        if path_len == 0 {
            return self.config.common_path_start_chance;
        }
        let progress = usize_to_f64(path_len) / usize_to_f64(COMMON_PATH_LENGTH);
        if progress < 0.5 {
            self.config.common_path_extend_early
        } else if progress < 0.8 {
            self.config.common_path_extend_mid
        } else {
            self.config.common_path_extend_late
        }
    }

    fn common_path_plan(&self, idx: usize, template: &'static ClassTemplate) -> Plan {
        let base = &self.bases[idx];
        let parent = base
            .common_path_tail()
            .and_then(|tail| base.nodes.iter().find(|slot| slot.id == tail))
            .cloned()
            .unwrap_or_else(|| base.root());
        Plan {
            template,
            depth: parent.depth + 1,
            parent,
            rarity: RarityTier::Common,
            origin: NodeOrigin::CommonPath,
        }
    }

    fn growth_plan<R: Rng + ?Sized>(&self, idx: usize, rng: &mut R) -> Option<Plan> {
        let base = &self.bases[idx];
        let path_incomplete = base.common_path.len() < COMMON_PATH_LENGTH;
        let tail = base.common_path_tail();
        let candidates: Vec<&Slot> = base
            .nodes
            .iter()
            .filter(|slot| slot.depth < MAX_DEPTH && !slot.rarity.is_max())
            .collect();
        let weights: Vec<f64> = candidates
            .iter()
            .map(|slot| {
                let mut weight = 1.0 / (f64::from(slot.depth) + 1.0);
                if path_incomplete && tail == Some(slot.id.as_str()) {
                    weight *= self.config.common_path_tail_boost;
                } else if base.common_path.contains(&slot.id) {
                    weight *= self.config.common_path_boost;
                }
                weight
            })
            .collect();
        let chooser = WeightedIndex::new(&weights).ok()?;
        let parent = candidates.get(chooser.sample(rng)).copied()?.clone();

        let template = CLASS_TEMPLATES.choose(rng)?;
        let mut depth = parent.depth + 1;
        if parent.depth < MAX_DEPTH - 1 && rng.gen_bool(self.config.level_skip_chance) {
            depth += 1;
        }
        depth = depth.min(MAX_DEPTH).max(parent.rarity.coupled_depth());

        let rarity = growth_rarity(rng, parent.rarity);
        let (depth, rarity) = couple(depth, rarity);
        Some(Plan {
            template,
            parent,
            depth,
            rarity,
            origin: NodeOrigin::Growth,
        })
    }

    fn commit<R: Rng + ?Sized>(&mut self, idx: usize, plan: Plan, rng: &mut R) {
        if self.try_insert(idx, plan, rng) {
            self.stats.accepted += 1;
        }
    }

    fn try_insert<R: Rng + ?Sized>(&mut self, idx: usize, plan: Plan, rng: &mut R) -> bool {
        let template = plan.template;
        let base_class = self.bases[idx].base;
        let rule_ids = &self.rule_ids;
        let minted = retry_until(
            RULE_ID_ATTEMPTS,
            |_| format!("unlock_gen_{:08x}", rng.r#gen::<u32>()),
            |id| !rule_ids.contains(id),
        );
        let Some(rule_id) = minted.value else {
            self.stats.rule_id_exhausted += 1;
            debug!("no free rule id after {} attempts", minted.attempts);
            return false;
        };

        let request = GenerateRequest::new(template.key, &rule_id).exactly(plan.rarity);
        let mut class = match generate_class(&request, rng) {
            Ok(class) => class,
            Err(err) => {
                self.stats.template_failures += 1;
                warn!("skipping {base_class} node: {err}");
                return false;
            }
        };
        if self.used_ids.contains(&class.id) {
            self.stats.duplicate_ids += 1;
            debug!("discarding duplicate id {}", class.id);
            return false;
        }
        // Backstop: `used_ids` already covers every id in `parent_of`.
        if self.parent_of.contains_key(&class.id) {
            self.stats.duplicate_parents += 1;
            debug!("discarding {}: already has a parent", class.id);
            return false;
        }
        let child = NodeView {
            id: &class.id,
            depth: plan.depth,
            rarity: class.rarity,
        };
        if let Err(violation) = check_edge(plan.parent.view(), child, plan.origin) {
            self.stats.invariant_rejections += 1;
            warn!("discarding {base_class} node: {violation}");
            return false;
        }
        let Some(name) = self.unique_name(&class.name) else {
            self.stats.name_exhausted += 1;
            debug!("no free display name for {}", class.name);
            return false;
        };

        class.name = format!("{name} ({} Lv.{})", base_class.display_name(), plan.depth);
        class.placement = Some(TreePlacement {
            base_class,
            level: plan.depth,
            evolves_from: plan.parent.id.clone(),
        });
        let rule = mint_rule(rule_id, template, &class.id, &plan, rng);

        self.used_names.insert(name);
        self.used_ids.insert(class.id.clone());
        self.parent_of.insert(class.id.clone(), plan.parent.id.clone());
        self.rule_ids.insert(rule.id.clone());
        self.edges.push(TreeEdge {
            from: plan.parent.id,
            to: class.id.clone(),
            condition_id: rule.id.clone(),
            kind: EdgeKind::Evolution,
            level: plan.depth,
        });
        self.bases[idx].record(
            Slot {
                id: class.id.clone(),
                depth: plan.depth,
                rarity: class.rarity,
            },
            plan.origin,
        );
        self.entries.push(CatalogEntry {
            class_data: class,
            unlock_rule: rule,
            origin: plan.origin,
            unlocked: None,
        });
        true
    }

    /// `name`, or `name N` for the first free N in 1..=999.
    fn unique_name(&self, name: &str) -> Option<String> {
        retry_bounded(NAME_SUFFIX_MAX + 1, |suffix| {
            let candidate = if suffix == 0 {
                name.to_string()
            } else {
                format!("{name} {suffix}")
            };
            (!self.used_names.contains(&candidate)).then_some(candidate)
        })
        .value
    }

    fn into_catalog(self, target: usize, budget: usize, budget_exhausted: bool) -> Catalog {
        let bases: Vec<BaseReport> = self
            .bases
            .iter()
            .map(|state| {
                BaseReport::new(
                    state.base,
                    target,
                    state.nodes.len(),
                    state.direct,
                    state.common_path.len(),
                )
            })
            .collect();
        let report = ConstructionReport {
            iteration_budget: budget,
            budget_exhausted,
            stats: self.stats,
            bases,
        };

        info!(
            "class tree built: {} nodes in {} iterations ({} discarded)",
            self.entries.len(),
            report.stats.iterations,
            report.stats.discarded()
        );
        for (base, shortfall) in report.shortfalls() {
            warn!("{base} tree incomplete: {shortfall:?}");
        }

        Catalog {
            base_classes: base_classes(),
            unlock_rules: self.entries.iter().map(|e| e.unlock_rule.clone()).collect(),
            generated_classes: self.entries,
            tree_structure: TreeStructure {
                base_classes: BaseClassId::ALL.to_vec(),
                connections: self.edges,
            },
            common_paths: self
                .bases
                .into_iter()
                .map(|state| (state.base, state.common_path))
                .collect(),
            report,
        }
    }
}

/// Growth children sample with the parent as floor and no tier preference.
fn growth_rarity<R: Rng + ?Sized>(rng: &mut R, parent: RarityTier) -> RarityTier {
    sample_rarity(rng, None, Some(parent))
}

/// Tie depth and rarity together: the deeper of the two wins.
fn couple(depth: u8, rarity: RarityTier) -> (u8, RarityTier) {
    if rarity.coupled_depth() > depth {
        return (rarity.coupled_depth(), rarity);
    }
    match RarityTier::for_depth(depth) {
        Some(tier) if tier > rarity => (depth, tier),
        _ => (depth, rarity),
    }
}

fn mint_rule<R: Rng + ?Sized>(
    id: String,
    template: &ClassTemplate,
    class_id: &str,
    plan: &Plan,
    rng: &mut R,
) -> UnlockRule {
    let event_name = GENERATED_RULE_EVENTS
        .choose(rng)
        .copied()
        .unwrap_or("explore");
    let agg = if rng.gen_bool(0.5) {
        Aggregation::Count
    } else {
        Aggregation::DistinctCount
    };
    let (low, high) = plan.rarity.unlock_threshold_range();
    UnlockRule {
        id,
        matcher: RuleMatch {
            event_name: event_name.to_string(),
        },
        agg,
        threshold: u64::from(rng.gen_range(low..=high)),
        result_template: template.key.to_string(),
        preferred_rarity: Some(plan.rarity),
        origin: Some(RuleOrigin {
            generated_class_id: class_id.to_string(),
            parent_class: plan.parent.id.clone(),
            level: plan.depth,
        }),
    }
}
