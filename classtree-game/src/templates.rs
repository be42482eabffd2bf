//! Static catalogs: base classes, class templates and themed skill pools.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::numbers::scale_stat;
use crate::rarity::RarityTier;
use SkillKind::{Active, Passive};

/// Five-stat block shared by base classes, templates and generated classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(rename = "HP")]
    pub hp: i32,
    #[serde(rename = "MP")]
    pub mp: i32,
    #[serde(rename = "STR")]
    pub strength: i32,
    #[serde(rename = "INT")]
    pub intellect: i32,
    #[serde(rename = "DEX")]
    pub dexterity: i32,
}

impl StatBlock {
    #[must_use]
    pub const fn new(hp: i32, mp: i32, strength: i32, intellect: i32, dexterity: i32) -> Self {
        Self {
            hp,
            mp,
            strength,
            intellect,
            dexterity,
        }
    }

    /// Every stat multiplied and truncated toward zero.
    #[must_use]
    pub fn scaled(self, multiplier: f64) -> Self {
        Self {
            hp: scale_stat(self.hp, multiplier),
            mp: scale_stat(self.mp, multiplier),
            strength: scale_stat(self.strength, multiplier),
            intellect: scale_stat(self.intellect, multiplier),
            dexterity: scale_stat(self.dexterity, multiplier),
        }
    }
}

/// The five fixed archetypes every tree is rooted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseClassId {
    Warrior,
    Priest,
    Mage,
    Thief,
    Wanderer,
}

impl BaseClassId {
    pub const ALL: [Self; 5] = [
        Self::Warrior,
        Self::Priest,
        Self::Mage,
        Self::Thief,
        Self::Wanderer,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Warrior => "warrior",
            Self::Priest => "priest",
            Self::Mage => "mage",
            Self::Thief => "thief",
            Self::Wanderer => "wanderer",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Warrior => "Warrior",
            Self::Priest => "Priest",
            Self::Mage => "Mage",
            Self::Thief => "Thief",
            Self::Wanderer => "Wanderer",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|base| base.key() == key)
    }

    #[must_use]
    pub fn definition(self) -> BaseClass {
        let (description, base_stats) = match self {
            Self::Warrior => (
                "Master of combat and strength",
                StatBlock::new(120, 50, 18, 5, 10),
            ),
            Self::Priest => (
                "Healer and protector of the light",
                StatBlock::new(80, 150, 6, 16, 8),
            ),
            Self::Mage => ("Wielder of arcane magic", StatBlock::new(70, 180, 4, 20, 6)),
            Self::Thief => (
                "Shadow and stealth expert",
                StatBlock::new(90, 80, 10, 8, 18),
            ),
            Self::Wanderer => (
                "Free from class restrictions",
                StatBlock::new(100, 100, 10, 10, 10),
            ),
        };
        BaseClass {
            id: self,
            name: self.display_name().to_string(),
            description: description.to_string(),
            base_stats,
            rarity: RarityTier::Common,
        }
    }
}

impl fmt::Display for BaseClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseClass {
    pub id: BaseClassId,
    pub name: String,
    pub description: String,
    pub base_stats: StatBlock,
    pub rarity: RarityTier,
}

/// All base class definitions in canonical order.
#[must_use]
pub fn base_classes() -> Vec<BaseClass> {
    BaseClassId::ALL
        .into_iter()
        .map(BaseClassId::definition)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Active,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillTemplate {
    pub name: &'static str,
    pub kind: SkillKind,
    pub effect: &'static str,
}

const fn skill(name: &'static str, kind: SkillKind, effect: &'static str) -> SkillTemplate {
    SkillTemplate { name, kind, effect }
}

const KNOWLEDGE: &[SkillTemplate] = &[
    skill("Omniscience", Active, "Reveals entire map and buffs INT by 50% for 60s"),
    skill("Memorize", Passive, "+10% XP from reading activities"),
    skill("Eidetic Memory", Passive, "Never forgets learned recipes or patterns"),
];
const MAGIC: &[SkillTemplate] = &[
    skill("Arcane Mastery", Passive, "+25% spell damage and +15% MP regeneration"),
    skill("Mana Surge", Active, "Instantly restores 50% MP, 2min cooldown"),
    skill("Spell Weaving", Active, "Combines two spells into a more powerful effect"),
];
const WISDOM: &[SkillTemplate] = &[
    skill("Ancient Knowledge", Passive, "+20% experience gain from all sources"),
    skill("Meditation", Active, "Restores HP and MP over 30s, can move while active"),
];
const COMBAT: &[SkillTemplate] = &[
    skill("Bloodlust", Passive, "Each kill increases damage by 2% (stacks up to 10x)"),
    skill("Execute", Active, "Deals 300% damage to enemies below 30% HP"),
    skill("Battle Frenzy", Active, "Doubles attack speed for 15s, 1min cooldown"),
];
const DAMAGE: &[SkillTemplate] = &[
    skill("Critical Strike", Passive, "+15% critical hit chance and +50% critical damage"),
    skill("Sundering Blow", Active, "Ignores 50% of enemy armor, 30s cooldown"),
];
const BERSERKER: &[SkillTemplate] = &[
    skill("Rage", Active, "Takes 20% more damage but deals 50% more damage for 20s"),
    skill("Last Stand", Passive, "When HP drops below 25%, gain 100% damage boost"),
];
const CRAFTING: &[SkillTemplate] = &[
    skill("Master Craftsman", Passive, "All crafted items have +20% quality and durability"),
    skill("Rapid Assembly", Active, "Crafting speed increased by 300% for 5 minutes"),
    skill("Innovation", Passive, "10% chance to create an improved version of any recipe"),
];
const ENGINEERING: &[SkillTemplate] = &[
    skill("Precision Tools", Passive, "Reduces material cost by 15% and failure rate by 25%"),
    skill("Blueprint Mastery", Passive, "Can craft items 5 levels above current skill"),
];
const INNOVATION: &[SkillTemplate] = &[
    skill("Reverse Engineering", Active, "Analyze any item to learn its recipe, 1hr cooldown"),
    skill("Experimental Design", Passive, "Can combine materials in new ways to create unique items"),
];

/// Skill pool for a theme tag; unknown themes have no skills.
#[must_use]
pub fn skills_for_theme(theme: &str) -> &'static [SkillTemplate] {
    match theme {
        "knowledge" => KNOWLEDGE,
        "magic" => MAGIC,
        "wisdom" => WISDOM,
        "combat" => COMBAT,
        "damage" => DAMAGE,
        "berserker" => BERSERKER,
        "crafting" => CRAFTING,
        "engineering" => ENGINEERING,
        "innovation" => INNOVATION,
        _ => &[],
    }
}

/// Blueprint for generated classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassTemplate {
    pub key: &'static str,
    pub name_prefix: &'static str,
    pub description: &'static str,
    pub base_stats: StatBlock,
    pub growth_per_rank: StatBlock,
    pub skill_themes: &'static [&'static str],
    pub preferred_rarity: Option<RarityTier>,
}

pub static CLASS_TEMPLATES: [ClassTemplate; 3] = [
    ClassTemplate {
        key: "bookworm",
        name_prefix: "The Wise",
        description: "A sage shrouded in ink and parchment. Bonuses to knowledge and spell power.",
        base_stats: StatBlock::new(80, 200, 6, 18, 8),
        growth_per_rank: StatBlock::new(10, 30, 1, 4, 1),
        skill_themes: &["knowledge", "magic", "wisdom"],
        preferred_rarity: Some(RarityTier::Epic),
    },
    ClassTemplate {
        key: "slayer",
        name_prefix: "The Slayer",
        description: "A warrior forged in battle. Excels in combat and destruction.",
        base_stats: StatBlock::new(150, 50, 20, 5, 12),
        growth_per_rank: StatBlock::new(25, 5, 5, 1, 2),
        skill_themes: &["combat", "damage", "berserker"],
        preferred_rarity: Some(RarityTier::Rare),
    },
    ClassTemplate {
        key: "tinkerer",
        name_prefix: "The Tinkerer",
        description: "A master craftsman who bends materials to their will. Expert in creation and modification.",
        base_stats: StatBlock::new(100, 120, 8, 15, 16),
        growth_per_rank: StatBlock::new(15, 20, 2, 3, 3),
        skill_themes: &["crafting", "engineering", "innovation"],
        preferred_rarity: Some(RarityTier::Uncommon),
    },
];

#[must_use]
pub fn find_template(key: &str) -> Option<&'static ClassTemplate> {
    CLASS_TEMPLATES.iter().find(|template| template.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_keys_roundtrip() {
        for base in BaseClassId::ALL {
            assert_eq!(BaseClassId::from_key(base.key()), Some(base));
        }
        assert_eq!(BaseClassId::from_key("bard"), None);
    }

    #[test]
    fn every_template_theme_has_skills() {
        for template in &CLASS_TEMPLATES {
            for theme in template.skill_themes {
                assert!(!skills_for_theme(theme).is_empty(), "theme {theme} empty");
            }
        }
    }

    #[test]
    fn stat_block_serializes_with_uppercase_keys() {
        let json = serde_json::to_value(StatBlock::new(1, 2, 3, 4, 5)).unwrap();
        assert_eq!(json["HP"], 1);
        assert_eq!(json["DEX"], 5);
    }

    #[test]
    fn scaling_truncates_each_stat() {
        let scaled = StatBlock::new(100, 120, 8, 15, 16).scaled(1.1);
        assert_eq!(scaled, StatBlock::new(110, 132, 8, 16, 17));
    }
}
