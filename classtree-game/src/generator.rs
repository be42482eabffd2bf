//! Class instance generation from templates.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::CLASS_ADJECTIVES;
use crate::rarity::{RarityTier, sample_rarity};
use crate::skills::{SkillSet, compose_skills};
use crate::templates::{BaseClassId, ClassTemplate, StatBlock, find_template};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("unknown template key: {key}")]
    UnknownTemplate { key: String },
}

/// Where a generated class sits inside a base class tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePlacement {
    pub base_class: BaseClassId,
    pub level: u8,
    /// Parent node id, or the base class key for level 1.
    pub evolves_from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedClass {
    pub id: String,
    pub name: String,
    pub rarity: RarityTier,
    pub description: String,
    pub base_stats: StatBlock,
    pub growth_per_rank: StatBlock,
    pub skills: SkillSet,
    pub unlock_condition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<TreePlacement>,
}

/// Inputs for one generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub template_key: &'a str,
    pub unlock_rule_id: &'a str,
    pub preferred: Option<RarityTier>,
    pub floor: Option<RarityTier>,
    /// Use `preferred` verbatim instead of sampling.
    pub force_exact: bool,
}

impl<'a> GenerateRequest<'a> {
    #[must_use]
    pub const fn new(template_key: &'a str, unlock_rule_id: &'a str) -> Self {
        Self {
            template_key,
            unlock_rule_id,
            preferred: None,
            floor: None,
            force_exact: false,
        }
    }

    #[must_use]
    pub const fn preferring(mut self, rarity: Option<RarityTier>) -> Self {
        self.preferred = rarity;
        self
    }

    #[must_use]
    pub const fn with_floor(mut self, floor: Option<RarityTier>) -> Self {
        self.floor = floor;
        self
    }

    /// Pin the rarity exactly; used when a structural rule dictates the tier.
    #[must_use]
    pub const fn exactly(mut self, rarity: RarityTier) -> Self {
        self.preferred = Some(rarity);
        self.force_exact = true;
        self
    }
}

/// Produce one class from a template.
///
/// The returned id is `class_<template>_<adjective>_<hhhh>`; it is not
/// guaranteed unique and callers that need uniqueness must check it.
///
/// # Errors
///
/// Returns [`GenerateError::UnknownTemplate`] when the template key is not in
/// the catalog.
pub fn generate_class<R: Rng + ?Sized>(
    request: &GenerateRequest<'_>,
    rng: &mut R,
) -> Result<GeneratedClass, GenerateError> {
    let template = find_template(request.template_key).ok_or_else(|| {
        GenerateError::UnknownTemplate {
            key: request.template_key.to_string(),
        }
    })?;
    let rarity = resolve_rarity(template, request, rng);
    Ok(instantiate(template, rarity, request.unlock_rule_id, rng))
}

fn resolve_rarity<R: Rng + ?Sized>(
    template: &ClassTemplate,
    request: &GenerateRequest<'_>,
    rng: &mut R,
) -> RarityTier {
    match request.preferred {
        Some(exact) if request.force_exact => exact,
        preferred => sample_rarity(rng, preferred.or(template.preferred_rarity), request.floor),
    }
}

fn instantiate<R: Rng + ?Sized>(
    template: &ClassTemplate,
    rarity: RarityTier,
    unlock_rule_id: &str,
    rng: &mut R,
) -> GeneratedClass {
    let multiplier = rarity.stat_multiplier();
    let adjective = CLASS_ADJECTIVES.choose(rng).copied().unwrap_or("Wise");
    let id = format!(
        "class_{}_{}_{:04x}",
        template.key,
        adjective.to_lowercase(),
        rng.r#gen::<u16>()
    );
    let description = if rarity >= RarityTier::Legendary {
        format!("[{rarity}] {}", template.description)
    } else {
        template.description.to_string()
    };

    GeneratedClass {
        id,
        name: format!("{adjective} {}", template.name_prefix),
        rarity,
        description,
        base_stats: template.base_stats.scaled(multiplier),
        growth_per_rank: template.growth_per_rank.scaled(multiplier),
        skills: compose_skills(template.skill_themes, rarity, rng),
        unlock_condition_id: unlock_rule_id.to_string(),
        placement: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::CLASS_TEMPLATES;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn unknown_template_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let err = generate_class(&GenerateRequest::new("bard", "r0"), &mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnknownTemplate {
                key: "bard".to_string()
            }
        );
    }

    #[test]
    fn exact_rarity_is_used_verbatim() {
        let mut rng = SmallRng::seed_from_u64(2);
        for tier in RarityTier::ALL {
            let class = generate_class(
                &GenerateRequest::new("slayer", "r1").exactly(tier),
                &mut rng,
            )
            .unwrap();
            assert_eq!(class.rarity, tier);
            assert_eq!(class.skills.len(), tier.skill_count());
        }
    }

    #[test]
    fn tinkerer_uncommon_scales_dex() {
        let mut rng = SmallRng::seed_from_u64(3);
        let template = find_template("tinkerer").unwrap();
        let class = generate_class(
            &GenerateRequest::new("tinkerer", "r1").exactly(RarityTier::Uncommon),
            &mut rng,
        )
        .unwrap();
        assert!(class.base_stats.dexterity >= template.base_stats.dexterity);
        assert_eq!(class.base_stats.dexterity, 17);
        assert_eq!(class.skills.len(), 2);
        assert_eq!(class.unlock_condition_id, "r1");
    }

    #[test]
    fn stats_are_deterministic_given_rarity() {
        let mut a = SmallRng::seed_from_u64(10);
        let mut b = SmallRng::seed_from_u64(99);
        let left = generate_class(
            &GenerateRequest::new("bookworm", "x").exactly(RarityTier::Mythic),
            &mut a,
        )
        .unwrap();
        let right = generate_class(
            &GenerateRequest::new("bookworm", "y").exactly(RarityTier::Mythic),
            &mut b,
        )
        .unwrap();
        assert_eq!(left.base_stats, right.base_stats);
        assert_eq!(left.growth_per_rank, right.growth_per_rank);
        assert!(left.description.starts_with("[Mythic] "));
    }

    #[test]
    fn floor_is_respected_when_sampling() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..500 {
            let class = generate_class(
                &GenerateRequest::new("tinkerer", "r").with_floor(Some(RarityTier::Epic)),
                &mut rng,
            )
            .unwrap();
            assert!(class.rarity >= RarityTier::Epic);
        }
    }

    #[test]
    fn ids_and_names_follow_template() {
        let mut rng = SmallRng::seed_from_u64(6);
        for template in &CLASS_TEMPLATES {
            let class = generate_class(&GenerateRequest::new(template.key, "r"), &mut rng).unwrap();
            assert!(class.id.starts_with(&format!("class_{}_", template.key)));
            assert!(class.name.ends_with(template.name_prefix));
            assert!(class.placement.is_none());
        }
    }
}
