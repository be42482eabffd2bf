//! Persistence seam for per-player aggregates and unlocks.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use crate::aggregate::PlayerAggregates;
use crate::generator::GeneratedClass;

/// Storage for player aggregates and unlocked classes.
pub trait UnlockLedger {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Current aggregates for a player; empty for unknown players.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregates cannot be read.
    fn load_aggregates(&self, player: &str) -> Result<PlayerAggregates, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the aggregates cannot be written.
    fn save_aggregates(
        &self,
        player: &str,
        aggregates: &PlayerAggregates,
    ) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the unlock records cannot be read.
    fn unlocked_rule_ids(&self, player: &str) -> Result<HashSet<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the unlock records cannot be read.
    fn unlocked_classes(&self, player: &str) -> Result<Vec<GeneratedClass>, Self::Error>;

    /// Unlocked classes across every player.
    ///
    /// # Errors
    ///
    /// Returns an error if the unlock records cannot be read.
    fn all_unlocked_classes(&self) -> Result<Vec<GeneratedClass>, Self::Error>;

    /// Store `class` for (player, rule id). Must be idempotent: a second call
    /// for the same pair stores nothing and returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the unlock cannot be persisted.
    fn record_unlock(
        &self,
        player: &str,
        rule_id: &str,
        class: &GeneratedClass,
    ) -> Result<bool, Self::Error>;
}

#[derive(Debug, Clone, Default)]
struct PlayerRecord {
    aggregates: PlayerAggregates,
    /// Unlocks in insertion order, keyed by rule id.
    unlocks: Vec<(String, GeneratedClass)>,
}

/// Single-threaded in-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    players: RefCell<HashMap<String, PlayerRecord>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.borrow().len()
    }
}

impl UnlockLedger for MemoryLedger {
    type Error = Infallible;

    fn load_aggregates(&self, player: &str) -> Result<PlayerAggregates, Self::Error> {
        Ok(self
            .players
            .borrow()
            .get(player)
            .map(|record| record.aggregates.clone())
            .unwrap_or_default())
    }

    fn save_aggregates(
        &self,
        player: &str,
        aggregates: &PlayerAggregates,
    ) -> Result<(), Self::Error> {
        self.players
            .borrow_mut()
            .entry(player.to_string())
            .or_default()
            .aggregates = aggregates.clone();
        Ok(())
    }

    fn unlocked_rule_ids(&self, player: &str) -> Result<HashSet<String>, Self::Error> {
        Ok(self
            .players
            .borrow()
            .get(player)
            .map(|record| record.unlocks.iter().map(|(rule, _)| rule.clone()).collect())
            .unwrap_or_default())
    }

    fn unlocked_classes(&self, player: &str) -> Result<Vec<GeneratedClass>, Self::Error> {
        Ok(self
            .players
            .borrow()
            .get(player)
            .map(|record| record.unlocks.iter().map(|(_, class)| class.clone()).collect())
            .unwrap_or_default())
    }

    fn all_unlocked_classes(&self) -> Result<Vec<GeneratedClass>, Self::Error> {
        let players = self.players.borrow();
        let mut names: Vec<&String> = players.keys().collect();
        names.sort();
        Ok(names
            .into_iter()
            .filter_map(|name| players.get(name))
            .flat_map(|record| record.unlocks.iter().map(|(_, class)| class.clone()))
            .collect())
    }

    fn record_unlock(
        &self,
        player: &str,
        rule_id: &str,
        class: &GeneratedClass,
    ) -> Result<bool, Self::Error> {
        let mut players = self.players.borrow_mut();
        let record = players.entry(player.to_string()).or_default();
        if record.unlocks.iter().any(|(rule, _)| rule == rule_id) {
            return Ok(false);
        }
        record.unlocks.push((rule_id.to_string(), class.clone()));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerateRequest, generate_class};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn class(rule: &str) -> GeneratedClass {
        let mut rng = SmallRng::seed_from_u64(1);
        generate_class(&GenerateRequest::new("slayer", rule), &mut rng).unwrap()
    }

    #[test]
    fn record_unlock_is_idempotent() {
        let ledger = MemoryLedger::new();
        let unlocked = class("r1");
        assert!(ledger.record_unlock("ada", "r1", &unlocked).unwrap());
        assert!(!ledger.record_unlock("ada", "r1", &unlocked).unwrap());
        assert!(ledger.record_unlock("bo", "r1", &unlocked).unwrap());
        assert_eq!(ledger.unlocked_classes("ada").unwrap().len(), 1);
        assert_eq!(ledger.all_unlocked_classes().unwrap().len(), 2);
        assert!(ledger.unlocked_rule_ids("ada").unwrap().contains("r1"));
    }

    #[test]
    fn unknown_players_read_as_empty() {
        let ledger = MemoryLedger::new();
        assert!(ledger.load_aggregates("nobody").unwrap().is_empty());
        assert!(ledger.unlocked_rule_ids("nobody").unwrap().is_empty());
        assert_eq!(ledger.player_count(), 0);
    }

    #[test]
    fn aggregates_round_trip_through_storage() {
        let ledger = MemoryLedger::new();
        let mut aggregates = PlayerAggregates::new();
        aggregates.add_count("explore", 4);
        ledger.save_aggregates("ada", &aggregates).unwrap();
        assert_eq!(ledger.load_aggregates("ada").unwrap(), aggregates);
    }
}
