//! Read-only overviews of the rule catalog and unlock activity.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::generator::GeneratedClass;
use crate::rarity::RarityTier;
use crate::rules::{Aggregation, UnlockRule, rule_by_id};
use crate::templates::{CLASS_TEMPLATES, StatBlock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: String,
    pub event_name: String,
    pub agg: Aggregation,
    pub threshold: u64,
    pub result_template: String,
    pub preferred_rarity: Option<RarityTier>,
    pub description: String,
}

impl From<&UnlockRule> for RuleSummary {
    fn from(rule: &UnlockRule) -> Self {
        Self {
            id: rule.id.clone(),
            event_name: rule.event_name().to_string(),
            agg: rule.agg,
            threshold: rule.threshold,
            result_template: rule.result_template.clone(),
            preferred_rarity: rule.preferred_rarity,
            description: rule.describe(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub key: String,
    pub name_prefix: String,
    pub description: String,
    pub base_stats: StatBlock,
    pub skill_themes: Vec<String>,
    pub preferred_rarity: Option<RarityTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockOverview {
    pub rules: Vec<RuleSummary>,
    pub templates: Vec<TemplateSummary>,
    pub unlocked_classes: usize,
    pub unlocks_by_template: BTreeMap<String, usize>,
}

/// Summarise the rule catalog and which templates players have unlocked.
#[must_use]
pub fn unlock_overview(rules: &[UnlockRule], unlocked: &[GeneratedClass]) -> UnlockOverview {
    let templates = CLASS_TEMPLATES
        .iter()
        .map(|template| TemplateSummary {
            key: template.key.to_string(),
            name_prefix: template.name_prefix.to_string(),
            description: template.description.to_string(),
            base_stats: template.base_stats,
            skill_themes: template.skill_themes.iter().map(|t| (*t).to_string()).collect(),
            preferred_rarity: template.preferred_rarity,
        })
        .collect();

    let mut unlocks_by_template = BTreeMap::new();
    for class in unlocked {
        let key = rule_by_id(rules, &class.unlock_condition_id)
            .map(|rule| rule.result_template.clone())
            .unwrap_or_else(|_| template_from_id(&class.id));
        *unlocks_by_template.entry(key).or_insert(0) += 1;
    }

    UnlockOverview {
        rules: rules.iter().map(RuleSummary::from).collect(),
        templates,
        unlocked_classes: unlocked.len(),
        unlocks_by_template,
    }
}

/// Template key embedded in `class_<template>_<adjective>_<hex>`.
fn template_from_id(id: &str) -> String {
    id.strip_prefix("class_")
        .and_then(|rest| rest.split('_').next())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerateRequest, generate_class};
    use crate::rules::static_rules;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn overview_counts_unlocks_per_template() {
        let rules = static_rules();
        let mut rng = SmallRng::seed_from_u64(12);
        let unlocked: Vec<GeneratedClass> = [
            ("bookworm", "unlock_read_10000"),
            ("slayer", "unlock_kill_5000"),
            ("slayer", "orphaned_rule"),
        ]
        .into_iter()
        .map(|(key, rule)| generate_class(&GenerateRequest::new(key, rule), &mut rng).unwrap())
        .collect();

        let overview = unlock_overview(&rules, &unlocked);
        assert_eq!(overview.unlocked_classes, 3);
        assert_eq!(overview.unlocks_by_template.get("slayer"), Some(&2));
        assert_eq!(overview.unlocks_by_template.get("bookworm"), Some(&1));
        assert_eq!(overview.templates.len(), 3);
        assert_eq!(overview.rules[2].description, "distinct_count of craft_item >= 100");
    }

    #[test]
    fn template_summaries_expose_description_and_stats() {
        let overview = unlock_overview(&static_rules(), &[]);
        let slayer = overview
            .templates
            .iter()
            .find(|t| t.key == "slayer")
            .unwrap();
        assert!(slayer.description.starts_with("A warrior forged in battle"));
        assert_eq!(slayer.base_stats, StatBlock::new(150, 50, 20, 5, 12));
        let json = serde_json::to_value(slayer).unwrap();
        assert_eq!(json["base_stats"]["STR"], 20);
    }

    #[test]
    fn template_key_parses_from_class_id() {
        assert_eq!(template_from_id("class_tinkerer_frost_0a1b"), "tinkerer");
        assert_eq!(template_from_id("weird"), "unknown");
    }
}
