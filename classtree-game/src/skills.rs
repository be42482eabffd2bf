//! Skill composition from theme pools.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::SKILL_UPGRADE_CHANCE;
use crate::rarity::RarityTier;
use crate::templates::{SkillKind, SkillTemplate, skills_for_theme};

/// Skills stored inline up to the largest per-tier count.
pub type SkillSet = SmallVec<[Skill; 5]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SkillKind,
    pub rarity: RarityTier,
    pub effect: String,
}

/// Draw the tier's skill count from the union of the theme pools, without
/// repetition. With a 30% chance one selected skill is promoted a tier.
pub fn compose_skills<R: Rng + ?Sized>(
    themes: &[&str],
    rarity: RarityTier,
    rng: &mut R,
) -> SkillSet {
    let pool: Vec<&SkillTemplate> = themes
        .iter()
        .flat_map(|theme| skills_for_theme(theme))
        .collect();
    let count = rarity.skill_count().min(pool.len());
    let picked: Vec<&SkillTemplate> = pool.choose_multiple(rng, count).copied().collect();

    let upgrade_first = picked.len() > 1 && rng.gen_bool(SKILL_UPGRADE_CHANCE);

    picked
        .into_iter()
        .enumerate()
        .map(|(idx, template)| {
            let skill_rarity = if idx == 0 && upgrade_first {
                rarity.next().unwrap_or(rarity)
            } else {
                rarity
            };
            Skill {
                id: format!("skill_{:08x}", rng.r#gen::<u32>()),
                name: template.name.to_string(),
                kind: template.kind,
                rarity: skill_rarity,
                effect: template.effect.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashSet;

    const THEMES: [&str; 3] = ["knowledge", "magic", "wisdom"];

    #[test]
    fn count_follows_tier() {
        let mut rng = SmallRng::seed_from_u64(5);
        for tier in RarityTier::ALL {
            let skills = compose_skills(&THEMES, tier, &mut rng);
            assert_eq!(skills.len(), tier.skill_count());
        }
    }

    #[test]
    fn no_repeated_skill_names() {
        let mut rng = SmallRng::seed_from_u64(17);
        for _ in 0..100 {
            let skills = compose_skills(&THEMES, RarityTier::God, &mut rng);
            let names: HashSet<&str> = skills.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names.len(), skills.len());
        }
    }

    #[test]
    fn upgrades_stay_within_one_tier() {
        let mut rng = SmallRng::seed_from_u64(23);
        let mut upgraded = 0;
        for _ in 0..400 {
            let skills = compose_skills(&THEMES, RarityTier::Rare, &mut rng);
            for skill in &skills {
                assert!(skill.rarity == RarityTier::Rare || skill.rarity == RarityTier::Epic);
            }
            if skills.iter().any(|s| s.rarity == RarityTier::Epic) {
                upgraded += 1;
            }
        }
        assert!(upgraded > 60 && upgraded < 200, "upgraded {upgraded}");
    }

    #[test]
    fn top_tier_never_upgrades() {
        let mut rng = SmallRng::seed_from_u64(29);
        for _ in 0..50 {
            let skills = compose_skills(&THEMES, RarityTier::Forbidden, &mut rng);
            assert!(skills.iter().all(|s| s.rarity == RarityTier::Forbidden));
        }
    }

    #[test]
    fn unknown_themes_yield_nothing() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(compose_skills(&["cooking"], RarityTier::Epic, &mut rng).is_empty());
    }
}
