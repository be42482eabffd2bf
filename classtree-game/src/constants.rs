//! Centralized balance and tuning constants for class tree generation.
//!
//! Probabilities that callers may want to tune per build live in
//! [`crate::tree::TreeConfig`]; the values here define the fixed math of the
//! rarity ladder and the unlock catalog.

// Tree shape ---------------------------------------------------------------
pub const MAX_DEPTH: u8 = 10;
pub const COMMON_PATH_LENGTH: usize = MAX_DEPTH as usize;
pub const MIN_DIRECT_COMMON: u32 = 1;
pub const MIN_DIRECT_UNCOMMON: u32 = 1;
pub const MIN_DIRECT_HIGHER: u32 = 2;
/// Direct children every base class needs before general growth starts.
pub const STRUCTURAL_MINIMUM_PER_BASE: usize =
    (MIN_DIRECT_COMMON + MIN_DIRECT_UNCOMMON + MIN_DIRECT_HIGHER) as usize;
pub(crate) const NAME_SUFFIX_MAX: u32 = 999;
pub(crate) const RULE_ID_ATTEMPTS: u32 = 8;

// Rarity sampling ----------------------------------------------------------
pub(crate) const PREFERRED_RARITY_BOOST: f64 = 1.5;
pub(crate) const NORMALIZED_WEIGHT_TOTAL: f64 = 100.0;

// Skill composition --------------------------------------------------------
pub(crate) const SKILL_UPGRADE_CHANCE: f64 = 0.3;

// Unlock rules -------------------------------------------------------------
pub const GENERATED_RULE_EVENTS: [&str; 9] = [
    "read_book",
    "kill_monster",
    "craft_item",
    "explore",
    "meditate",
    "complete_quest",
    "defeat_boss",
    "discover_secret",
    "master_skill",
];

/// Metadata keys consulted, in order, when picking the distinct value of an event.
pub const DISTINCT_KEY_PRIORITY: [&str; 4] = ["book_id", "item_id", "monster_id", "crafted_item_id"];

// Naming -------------------------------------------------------------------
pub const CLASS_ADJECTIVES: [&str; 20] = [
    "Wise",
    "Vigilant",
    "Silent",
    "Ancient",
    "Eternal",
    "Mystic",
    "Shadow",
    "Golden",
    "Crimson",
    "Azure",
    "Frost",
    "Flame",
    "Storm",
    "Thunder",
    "Divine",
    "Infernal",
    "Celestial",
    "Abyssal",
    "Primal",
    "Arcane",
];
