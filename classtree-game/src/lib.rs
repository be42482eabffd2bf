//! Class Tree Game Engine
//!
//! Procedural class evolution trees for a role-playing game: a ten-tier
//! rarity sampler, a class generator, a constrained tree builder and the
//! rule engine that unlocks classes from player behavior. Storage is left to
//! the caller through [`UnlockLedger`].

pub mod aggregate;
pub mod constants;
pub mod debug;
pub mod generator;
pub mod ledger;
pub mod numbers;
pub mod rarity;
pub mod retry;
pub mod rules;
pub mod seed;
pub mod skills;
pub mod templates;
pub mod tree;
pub mod unlock;

use log::info;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

// Re-export commonly used types
pub use aggregate::{EventAggregate, PlayerAggregates, distinct_key};
pub use debug::{RuleSummary, TemplateSummary, UnlockOverview, unlock_overview};
pub use generator::{
    GenerateError, GenerateRequest, GeneratedClass, TreePlacement, generate_class,
};
pub use ledger::{MemoryLedger, UnlockLedger};
pub use rarity::{RarityTier, UnknownRarity, enforce_floor, rarity_weights, sample_rarity};
pub use retry::{Attempted, retry_bounded, retry_until};
pub use rules::{
    Aggregation, RuleMatch, RuleOrigin, UnknownRule, UnlockRule, rule_by_id, static_rules,
};
pub use seed::{RngStreams, derive_stream_seed};
pub use skills::{Skill, SkillSet, compose_skills};
pub use templates::{
    BaseClass, BaseClassId, CLASS_TEMPLATES, ClassTemplate, SkillKind, StatBlock, base_classes,
    find_template,
};
pub use tree::{
    BuildStats, Catalog, CatalogEntry, ConstructionReport, InvariantViolation, NodeOrigin,
    Shortfall, TreeBuilder, TreeConfig, TreeConfigError, TreeEdge, build_class_tree,
    validate_catalog,
};
pub use unlock::{evaluate, rule_satisfied};

/// Failures surfaced by [`ClassTreeEngine`].
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    #[error("unlock ledger failed")]
    Ledger(#[source] E),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Config(#[from] TreeConfigError),
}

/// Ties event ingestion, unlock evaluation and tree views to one ledger.
pub struct ClassTreeEngine<L>
where
    L: UnlockLedger,
{
    ledger: L,
    rules: Vec<UnlockRule>,
    streams: RngStreams,
}

impl<L> ClassTreeEngine<L>
where
    L: UnlockLedger,
{
    /// Engine over the static rule catalog with streams derived from `seed`.
    pub fn new(ledger: L, seed: u64) -> Self {
        Self::with_rules(ledger, static_rules(), RngStreams::from_user_seed(seed))
    }

    pub const fn with_rules(ledger: L, rules: Vec<UnlockRule>, streams: RngStreams) -> Self {
        Self {
            ledger,
            rules,
            streams,
        }
    }

    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn rules(&self) -> &[UnlockRule] {
        &self.rules
    }

    /// Look up one rule of this engine's catalog.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownRule`] when the id is not in the catalog.
    pub fn rule(&self, rule_id: &str) -> Result<&UnlockRule, UnknownRule> {
        rule_by_id(&self.rules, rule_id)
    }

    /// Fold one event into the player's aggregates, then check for unlocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails or an unlock names an unknown template.
    pub fn ingest_event(
        &mut self,
        player: &str,
        event_name: &str,
        metadata: &Map<String, Value>,
    ) -> Result<Vec<String>, EngineError<L::Error>> {
        let mut aggregates = self
            .ledger
            .load_aggregates(player)
            .map_err(EngineError::Ledger)?;
        aggregates.record_event(event_name, metadata);
        self.ledger
            .save_aggregates(player, &aggregates)
            .map_err(EngineError::Ledger)?;
        self.check_unlocks(player)
    }

    /// Evaluate every rule for the player and persist new unlocks.
    ///
    /// Returns the ids of classes the ledger accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails or an unlock names an unknown template.
    pub fn check_unlocks(&mut self, player: &str) -> Result<Vec<String>, EngineError<L::Error>> {
        let aggregates = self
            .ledger
            .load_aggregates(player)
            .map_err(EngineError::Ledger)?;
        let already = self
            .ledger
            .unlocked_rule_ids(player)
            .map_err(EngineError::Ledger)?;
        let classes = evaluate(&self.rules, &aggregates, &already, self.streams.unlock())?;

        let mut unlocked = Vec::with_capacity(classes.len());
        for class in classes {
            let stored = self
                .ledger
                .record_unlock(player, &class.unlock_condition_id, &class)
                .map_err(EngineError::Ledger)?;
            if stored {
                info!(
                    "player {player} unlocked {} via {}",
                    class.id, class.unlock_condition_id
                );
                unlocked.push(class.id);
            }
        }
        Ok(unlocked)
    }

    /// Build a fresh catalog and flag the nodes this player has unlocked.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the ledger fails.
    pub fn class_tree(
        &mut self,
        player: &str,
        config: TreeConfig,
    ) -> Result<Catalog, EngineError<L::Error>> {
        let builder = TreeBuilder::new(config)?;
        let mut catalog = builder.build(self.streams.tree());

        let mut unlocked: HashSet<String> = self
            .ledger
            .unlocked_rule_ids(player)
            .map_err(EngineError::Ledger)?;
        let classes = self
            .ledger
            .unlocked_classes(player)
            .map_err(EngineError::Ledger)?;
        unlocked.extend(classes.into_iter().map(|class| class.id));
        catalog.mark_unlocked(&unlocked);
        Ok(catalog)
    }

    /// Rule catalog and unlock counts across all players.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot list unlocks.
    pub fn unlock_overview(&self) -> Result<UnlockOverview, EngineError<L::Error>> {
        let unlocked = self
            .ledger
            .all_unlocked_classes()
            .map_err(EngineError::Ledger)?;
        Ok(unlock_overview(&self.rules, &unlocked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn craft_rule_needs_distinct_items() {
        let mut engine = ClassTreeEngine::new(MemoryLedger::new(), 3);
        for _ in 0..150 {
            let unlocked = engine
                .ingest_event("ada", "craft_item", &meta(json!({"item_id": "nail"})))
                .unwrap();
            assert!(unlocked.is_empty());
        }
        let mut newly = Vec::new();
        for id in 0..100 {
            newly.extend(
                engine
                    .ingest_event("ada", "craft_item", &meta(json!({"crafted_item_id": id})))
                    .unwrap(),
            );
        }
        assert_eq!(newly.len(), 1);
        let classes = engine.ledger().unlocked_classes("ada").unwrap();
        assert_eq!(classes[0].unlock_condition_id, "unlock_craft_100_unique");
        assert!(classes[0].id.starts_with("class_tinkerer_"));
    }

    #[test]
    fn bulk_counts_unlock_once() {
        let ledger = MemoryLedger::new();
        let mut aggregates = PlayerAggregates::new();
        aggregates.add_count("kill_monster", 5_000);
        ledger.save_aggregates("bo", &aggregates).unwrap();

        let mut engine = ClassTreeEngine::new(ledger, 9);
        assert_eq!(engine.check_unlocks("bo").unwrap().len(), 1);
        assert!(engine.check_unlocks("bo").unwrap().is_empty());
        let overview = engine.unlock_overview().unwrap();
        assert_eq!(overview.unlocked_classes, 1);
        assert_eq!(overview.unlocks_by_template.get("slayer"), Some(&1));
    }

    #[test]
    fn class_tree_marks_player_unlocks() {
        let mut engine = ClassTreeEngine::new(MemoryLedger::new(), 21);
        let catalog = engine.class_tree("ada", TreeConfig::with_target(25)).unwrap();
        assert_eq!(catalog.unlocked_count(), 0);
        assert!(catalog.generated_classes.iter().all(|e| e.unlocked == Some(false)));
    }

    #[test]
    fn generated_rules_can_drive_unlocks() {
        let mut streams = RngStreams::from_user_seed(5);
        let catalog = TreeBuilder::new(TreeConfig::with_target(10))
            .unwrap()
            .build(streams.tree());
        let target = catalog.generated_classes[0].unlock_rule.clone();

        let ledger = MemoryLedger::new();
        let mut aggregates = PlayerAggregates::new();
        aggregates.insert(
            target.event_name(),
            EventAggregate {
                count: target.threshold,
                distinct_count: target.threshold,
                ..EventAggregate::default()
            },
        );
        ledger.save_aggregates("cy", &aggregates).unwrap();

        let mut engine = ClassTreeEngine::with_rules(ledger, catalog.unlock_rules, streams);
        let unlocked = engine.check_unlocks("cy").unwrap();
        assert!(!unlocked.is_empty());
        assert!(
            engine
                .ledger()
                .unlocked_rule_ids("cy")
                .unwrap()
                .contains(&target.id)
        );
    }

    #[test]
    fn unknown_rule_lookup_fails() {
        let engine = ClassTreeEngine::new(MemoryLedger::new(), 1);
        assert!(engine.rule("unlock_read_10000").is_ok());
        assert_eq!(
            engine.rule("missing").unwrap_err(),
            UnknownRule("missing".to_string())
        );
    }

    #[test]
    fn invalid_tree_config_surfaces_as_engine_error() {
        let mut engine = ClassTreeEngine::new(MemoryLedger::new(), 1);
        let config = TreeConfig {
            level_skip_chance: 2.0,
            ..TreeConfig::default()
        };
        assert!(matches!(
            engine.class_tree("ada", config),
            Err(EngineError::Config(_))
        ));
    }
}
