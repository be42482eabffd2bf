use anyhow::{Context, Result, bail, ensure};
use std::hash::Hasher;
use twox_hash::XxHash64;

use classtree_game::constants::COMMON_PATH_LENGTH;
use classtree_game::{
    BaseClassId, Catalog, ClassTreeEngine, MemoryLedger, PlayerAggregates, RarityTier, RngStreams,
    Shortfall, TreeBuilder, TreeConfig, UnlockLedger, sample_rarity, validate_catalog,
};

const SAMPLER_DRAWS: usize = 1_000;
const SMALL_TARGET: usize = 10;

/// Inputs handed to every scenario check.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioCtx {
    pub seed: u64,
    pub target: usize,
}

pub type ScenarioCheck = fn(&ScenarioCtx) -> Result<()>;

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: ScenarioCheck,
}

impl TestScenario {
    const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        check: ScenarioCheck,
    ) -> Self {
        Self {
            key,
            name,
            description,
            check,
        }
    }

    /// Run the check once.
    ///
    /// # Errors
    ///
    /// Returns the first expectation the check found broken.
    pub fn run(&self, ctx: &ScenarioCtx) -> Result<()> {
        (self.check)(ctx)
    }
}

pub fn all_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "tree-invariants",
            "Tree Invariants",
            "Full build passes every structural check and meets its minimums",
            tree_invariants,
        ),
        TestScenario::new(
            "common-path",
            "Common Path Integrity",
            "Each all-Common chain walks depth 1..10 or is reported short",
            common_path,
        ),
        TestScenario::new(
            "small-target",
            "Small Target Build",
            "Ten-node builds keep direct-child minimums or flag them",
            small_target,
        ),
        TestScenario::new(
            "sampler-floor",
            "Rarity Sampler Floors",
            "Sampled rarities never undercut a floor and climb past strict tiers",
            sampler_floor,
        ),
        TestScenario::new(
            "unlock-flow",
            "Unlock Flow",
            "Threshold crossing unlocks exactly one class per rule",
            unlock_flow,
        ),
        TestScenario::new(
            "deterministic-build",
            "Deterministic Build",
            "Same seed rebuilds a byte-identical catalog",
            deterministic_build,
        ),
    ]
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    all_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

pub fn get_scenario(key: &str) -> Option<TestScenario> {
    all_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

pub fn scenario_keys() -> Vec<String> {
    all_scenarios()
        .into_iter()
        .map(|scenario| scenario.key.to_string())
        .collect()
}

/// Build one catalog from the seed's tree stream.
///
/// # Errors
///
/// Returns an error if the configuration is rejected.
pub fn build_catalog(seed: u64, target: usize) -> Result<Catalog> {
    let mut streams = RngStreams::from_user_seed(seed);
    let builder =
        TreeBuilder::new(TreeConfig::with_target(target)).context("invalid tree configuration")?;
    Ok(builder.build(streams.tree()))
}

fn catalog_digest(catalog: &Catalog) -> Result<u64> {
    let bytes = serde_json::to_vec(catalog).context("serializing catalog")?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    Ok(hasher.finish())
}

fn tree_invariants(ctx: &ScenarioCtx) -> Result<()> {
    let catalog = build_catalog(ctx.seed, ctx.target)?;
    let violations = validate_catalog(&catalog);
    if let Some(first) = violations.first() {
        bail!("{} violation(s), first: {first}", violations.len());
    }
    ensure!(
        catalog.report.minimums_met(),
        "direct-child minimums missed: {:?}",
        catalog.report.shortfalls().collect::<Vec<_>>()
    );
    Ok(())
}

fn common_path(ctx: &ScenarioCtx) -> Result<()> {
    let catalog = build_catalog(ctx.seed, ctx.target)?;
    for base in BaseClassId::ALL {
        let path = catalog.common_path(base);
        if path.len() < COMMON_PATH_LENGTH {
            let reported = catalog.report.base(base).is_some_and(|report| {
                report
                    .shortfalls
                    .iter()
                    .any(|s| matches!(s, Shortfall::CommonPath { .. }))
            });
            ensure!(
                reported,
                "{base} common path stopped at {} without a shortfall",
                path.len()
            );
        }

        let mut parent = base.key().to_string();
        for (idx, id) in path.iter().enumerate() {
            let entry = catalog
                .node(id)
                .with_context(|| format!("{base} path names unknown node {id}"))?;
            ensure!(
                usize::from(entry.level()) == idx + 1,
                "{id} sits at depth {} instead of {}",
                entry.level(),
                idx + 1
            );
            ensure!(
                entry.class_data.rarity == RarityTier::Common,
                "{id} on the common path is {}",
                entry.class_data.rarity
            );
            ensure!(
                entry.parent_id() == Some(parent.as_str()),
                "{id} does not hang below {parent}"
            );
            parent.clone_from(id);
        }
    }
    Ok(())
}

fn small_target(ctx: &ScenarioCtx) -> Result<()> {
    let catalog = build_catalog(ctx.seed, SMALL_TARGET)?;
    let violations = validate_catalog(&catalog);
    if let Some(first) = violations.first() {
        bail!("{} violation(s), first: {first}", violations.len());
    }
    for base in BaseClassId::ALL {
        let report = catalog
            .report
            .base(base)
            .with_context(|| format!("no report for {base}"))?;
        let met =
            report.direct_common >= 1 && report.direct_uncommon >= 1 && report.direct_higher >= 2;
        let flagged = report.shortfalls.iter().any(Shortfall::is_structural);
        ensure!(met || flagged, "{base} misses minimums silently");
    }
    Ok(())
}

fn sampler_floor(ctx: &ScenarioCtx) -> Result<()> {
    let mut streams = RngStreams::from_user_seed(ctx.seed);
    let rng = streams.unlock();
    for floor in RarityTier::ALL {
        for _ in 0..SAMPLER_DRAWS {
            let rolled = sample_rarity(rng, None, Some(floor));
            ensure!(rolled >= floor, "{rolled} undercut floor {floor}");
            if floor.requires_strict_increase() && !floor.is_max() {
                ensure!(rolled > floor, "{rolled} did not climb past {floor}");
            }
        }
    }
    Ok(())
}

fn unlock_flow(ctx: &ScenarioCtx) -> Result<()> {
    let ledger = MemoryLedger::new();
    let mut aggregates = PlayerAggregates::new();
    aggregates.add_count("kill_monster", 5_000);
    aggregates.add_count("read_book", 9_999);
    ledger.save_aggregates("tester", &aggregates)?;

    let mut engine = ClassTreeEngine::new(ledger, ctx.seed);
    let first = engine.check_unlocks("tester")?;
    ensure!(first.len() == 1, "expected one unlock, got {}", first.len());
    let second = engine.check_unlocks("tester")?;
    ensure!(second.is_empty(), "rule fired twice: {second:?}");

    let classes = engine.ledger().unlocked_classes("tester")?;
    let class = classes.first().context("unlocked class was not stored")?;
    ensure!(
        class.unlock_condition_id == "unlock_kill_5000",
        "unlocked via {}",
        class.unlock_condition_id
    );
    ensure!(
        class.id.starts_with("class_slayer_"),
        "unexpected class id {}",
        class.id
    );
    ensure!(
        class.skills.len() == class.rarity.skill_count(),
        "{} carries {} skills",
        class.rarity,
        class.skills.len()
    );

    let unlocked = engine.ingest_event("tester", "read_book", &serde_json::Map::new())?;
    ensure!(unlocked.len() == 1, "read_book threshold did not unlock");
    Ok(())
}

fn deterministic_build(ctx: &ScenarioCtx) -> Result<()> {
    let first = catalog_digest(&build_catalog(ctx.seed, ctx.target)?)?;
    let second = catalog_digest(&build_catalog(ctx.seed, ctx.target)?)?;
    ensure!(
        first == second,
        "seed {} digests differ: {first:016x} vs {second:016x}",
        ctx.seed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_keys_are_unique() {
        let keys = scenario_keys();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn lookup_by_key() {
        assert_eq!(
            get_scenario("unlock-flow").map(|s| s.name),
            Some("Unlock Flow")
        );
        assert!(get_scenario("smoke").is_none());
    }

    #[test]
    fn every_scenario_passes_for_a_fixed_seed() {
        let ctx = ScenarioCtx {
            seed: 1337,
            target: 120,
        };
        for scenario in all_scenarios() {
            scenario
                .run(&ctx)
                .unwrap_or_else(|err| panic!("{}: {err:#}", scenario.key));
        }
    }
}
