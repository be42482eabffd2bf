//! Unlock rule definitions and the static rule catalog.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::rarity::RarityTier;

/// How an event's counters are compared against a rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    DistinctCount,
    /// Any kind this build does not understand; never satisfied.
    #[serde(other)]
    Unsupported,
}

impl Aggregation {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::DistinctCount => "distinct_count",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub event_name: String,
}

/// Tree position recorded on rules minted by the tree builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOrigin {
    pub generated_class_id: String,
    pub parent_class: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRule {
    pub id: String,
    #[serde(rename = "match")]
    pub matcher: RuleMatch,
    pub agg: Aggregation,
    pub threshold: u64,
    pub result_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_rarity: Option<RarityTier>,
    #[serde(default, flatten)]
    pub origin: Option<RuleOrigin>,
}

impl UnlockRule {
    #[must_use]
    pub fn new(
        id: &str,
        event_name: &str,
        agg: Aggregation,
        threshold: u64,
        result_template: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            matcher: RuleMatch {
                event_name: event_name.to_string(),
            },
            agg,
            threshold,
            result_template: result_template.to_string(),
            preferred_rarity: None,
            origin: None,
        }
    }

    #[must_use]
    pub const fn with_preferred(mut self, rarity: RarityTier) -> Self {
        self.preferred_rarity = Some(rarity);
        self
    }

    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.matcher.event_name
    }

    /// Human-readable condition, e.g. `count of read_book >= 10000`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} of {} >= {}", self.agg, self.event_name(), self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule not found: {0}")]
pub struct UnknownRule(pub String);

/// Hand-authored rules shipped with the game.
#[must_use]
pub fn static_rules() -> Vec<UnlockRule> {
    vec![
        UnlockRule::new(
            "unlock_read_10000",
            "read_book",
            Aggregation::Count,
            10_000,
            "bookworm",
        )
        .with_preferred(RarityTier::Epic),
        UnlockRule::new(
            "unlock_kill_5000",
            "kill_monster",
            Aggregation::Count,
            5_000,
            "slayer",
        )
        .with_preferred(RarityTier::Rare),
        UnlockRule::new(
            "unlock_craft_100_unique",
            "craft_item",
            Aggregation::DistinctCount,
            100,
            "tinkerer",
        )
        .with_preferred(RarityTier::Uncommon),
    ]
}

/// # Errors
///
/// Returns [`UnknownRule`] when no rule carries `rule_id`.
pub fn rule_by_id<'a>(
    rules: &'a [UnlockRule],
    rule_id: &str,
) -> Result<&'a UnlockRule, UnknownRule> {
    rules
        .iter()
        .find(|rule| rule.id == rule_id)
        .ok_or_else(|| UnknownRule(rule_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_ids_are_unique() {
        let rules = static_rules();
        let mut ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), rules.len());
    }

    #[test]
    fn lookup_reports_missing_rules() {
        let rules = static_rules();
        assert_eq!(
            rule_by_id(&rules, "unlock_kill_5000").unwrap().result_template,
            "slayer"
        );
        assert_eq!(
            rule_by_id(&rules, "nope").unwrap_err(),
            UnknownRule("nope".to_string())
        );
    }

    #[test]
    fn json_shape_uses_match_and_agg_keys() {
        let rule = &static_rules()[2];
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["match"]["event_name"], "craft_item");
        assert_eq!(json["agg"], "distinct_count");
        assert_eq!(json["preferred_rarity"], "Uncommon");
        assert!(json.get("generated_class_id").is_none());
    }

    #[test]
    fn unknown_aggregation_deserializes_as_unsupported() {
        let rule: UnlockRule = serde_json::from_str(
            r#"{"id":"r","match":{"event_name":"e"},"agg":"median","threshold":1,"result_template":"slayer"}"#,
        )
        .unwrap();
        assert_eq!(rule.agg, Aggregation::Unsupported);
        assert!(rule.origin.is_none());
    }

    #[test]
    fn describe_reads_naturally() {
        assert_eq!(static_rules()[0].describe(), "count of read_book >= 10000");
    }
}
