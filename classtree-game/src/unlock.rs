//! Rule evaluation against a player's aggregates.
use log::debug;
use rand::Rng;
use std::collections::HashSet;

use crate::aggregate::{EventAggregate, PlayerAggregates};
use crate::generator::{GenerateError, GenerateRequest, GeneratedClass, generate_class};
use crate::rules::{Aggregation, UnlockRule};

/// Whether the aggregate satisfies the rule; absent aggregates count as zero.
#[must_use]
pub fn rule_satisfied(rule: &UnlockRule, aggregate: Option<&EventAggregate>) -> bool {
    let (count, distinct) = aggregate.map_or((0, 0), |agg| (agg.count, agg.distinct_count));
    match rule.agg {
        Aggregation::Count => count >= rule.threshold,
        Aggregation::DistinctCount => distinct >= rule.threshold,
        Aggregation::Unsupported => false,
    }
}

/// Rules that newly evaluate true, skipping those already unlocked.
pub fn satisfied_rules<'a>(
    rules: &'a [UnlockRule],
    aggregates: &'a PlayerAggregates,
    already_unlocked: &'a HashSet<String>,
) -> impl Iterator<Item = &'a UnlockRule> + 'a {
    rules
        .iter()
        .filter(|rule| !already_unlocked.contains(&rule.id))
        .filter(|rule| rule_satisfied(rule, aggregates.get(rule.event_name())))
}

/// Generate one class per newly satisfied rule.
///
/// Each returned class carries the rule id as its `unlock_condition_id`. The
/// caller persists the result keyed by (player, rule id); nothing here
/// prevents a concurrent caller from evaluating the same rule twice.
///
/// # Errors
///
/// Returns [`GenerateError::UnknownTemplate`] if a satisfied rule names a
/// template that does not exist.
pub fn evaluate<R: Rng + ?Sized>(
    rules: &[UnlockRule],
    aggregates: &PlayerAggregates,
    already_unlocked: &HashSet<String>,
    rng: &mut R,
) -> Result<Vec<GeneratedClass>, GenerateError> {
    satisfied_rules(rules, aggregates, already_unlocked)
        .map(|rule| {
            debug!("rule {} satisfied ({})", rule.id, rule.describe());
            let request = GenerateRequest::new(&rule.result_template, &rule.id)
                .preferring(rule.preferred_rarity);
            generate_class(&request, rng)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::static_rules;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn read_rule() -> UnlockRule {
        UnlockRule::new("r_read", "read_book", Aggregation::Count, 10_000, "bookworm")
    }

    #[test]
    fn threshold_is_inclusive() {
        let rule = read_rule();
        let mut agg = EventAggregate {
            count: 9_999,
            ..EventAggregate::default()
        };
        assert!(!rule_satisfied(&rule, Some(&agg)));
        agg.count = 10_000;
        assert!(rule_satisfied(&rule, Some(&agg)));
        assert!(!rule_satisfied(&rule, None));
    }

    #[test]
    fn distinct_rules_ignore_raw_count() {
        let rule = UnlockRule::new("r", "craft_item", Aggregation::DistinctCount, 2, "tinkerer");
        let agg = EventAggregate {
            count: 50,
            distinct_count: 1,
            ..EventAggregate::default()
        };
        assert!(!rule_satisfied(&rule, Some(&agg)));
    }

    #[test]
    fn unsupported_never_satisfies() {
        let mut rule = read_rule();
        rule.agg = Aggregation::Unsupported;
        let agg = EventAggregate {
            count: u64::MAX,
            distinct_count: u64::MAX,
            ..EventAggregate::default()
        };
        assert!(!rule_satisfied(&rule, Some(&agg)));
    }

    #[test]
    fn unlock_happens_once_per_rule() {
        let rules = vec![read_rule()];
        let mut aggregates = PlayerAggregates::new();
        aggregates.add_count("read_book", 10_000);
        let mut rng = SmallRng::seed_from_u64(8);

        let first = evaluate(&rules, &aggregates, &HashSet::new(), &mut rng).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].unlock_condition_id, "r_read");

        let unlocked: HashSet<String> = ["r_read".to_string()].into_iter().collect();
        assert!(evaluate(&rules, &aggregates, &unlocked, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn missing_template_propagates() {
        let rules = vec![UnlockRule::new("r", "explore", Aggregation::Count, 1, "bard")];
        let mut aggregates = PlayerAggregates::new();
        aggregates.add_count("explore", 1);
        let mut rng = SmallRng::seed_from_u64(8);
        let err = evaluate(&rules, &aggregates, &HashSet::new(), &mut rng).unwrap_err();
        assert!(matches!(err, GenerateError::UnknownTemplate { .. }));
    }

    #[test]
    fn static_catalog_stays_locked_for_new_players() {
        let mut rng = SmallRng::seed_from_u64(3);
        let out = evaluate(
            &static_rules(),
            &PlayerAggregates::new(),
            &HashSet::new(),
            &mut rng,
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
