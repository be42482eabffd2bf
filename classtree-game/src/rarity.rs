//! Ten-tier rarity ladder and the weighted sampler used to roll child rarities.
//!
//! Tiers are totally ordered by declaration; every comparison in the tree
//! rules goes through [`RarityTier::ordinal`] or the derived `Ord`.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{NORMALIZED_WEIGHT_TOTAL, PREFERRED_RARITY_BOOST};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RarityTier {
    Common,
    Uncommon,
    Magic,
    Rare,
    Epic,
    Unique,
    Legendary,
    Mythic,
    God,
    Forbidden,
}

/// Sampling weight per tier, indexed by ordinal.
pub type RarityWeights = [f64; RarityTier::COUNT];

impl RarityTier {
    pub const COUNT: usize = 10;
    pub const MAX: Self = Self::Forbidden;
    /// Tiers at or above this one must strictly increase along an edge.
    pub const STRICT_FROM: Self = Self::Unique;
    /// Lowest tier counted in the "Higher" bucket of direct children.
    pub const HIGHER_FROM: Self = Self::Magic;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Common,
        Self::Uncommon,
        Self::Magic,
        Self::Rare,
        Self::Epic,
        Self::Unique,
        Self::Legendary,
        Self::Mythic,
        Self::God,
        Self::Forbidden,
    ];

    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Next tier up, or `None` at the top of the ladder.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    #[must_use]
    pub const fn is_max(self) -> bool {
        matches!(self, Self::Forbidden)
    }

    /// Magic or above.
    #[must_use]
    pub const fn is_higher(self) -> bool {
        self.ordinal() >= Self::HIGHER_FROM.ordinal()
    }

    #[must_use]
    pub const fn requires_strict_increase(self) -> bool {
        self.ordinal() >= Self::STRICT_FROM.ordinal()
    }

    #[must_use]
    pub const fn base_weight(self) -> f64 {
        match self {
            Self::Common => 54.899,
            Self::Uncommon => 25.0,
            Self::Magic => 8.0,
            Self::Rare => 4.0,
            Self::Epic => 3.0,
            Self::Unique => 2.5,
            Self::Legendary => 2.0,
            Self::Mythic => 0.5,
            Self::God => 0.1,
            Self::Forbidden => 0.001,
        }
    }

    #[must_use]
    pub const fn stat_multiplier(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Uncommon => 1.1,
            Self::Magic => 1.2,
            Self::Rare => 1.35,
            Self::Epic => 1.5,
            Self::Unique => 1.7,
            Self::Legendary => 2.0,
            Self::Mythic => 2.5,
            Self::God => 3.0,
            Self::Forbidden => 4.0,
        }
    }

    /// Number of skills a class of this tier receives.
    #[must_use]
    pub const fn skill_count(self) -> usize {
        match self {
            Self::Common | Self::Uncommon => 2,
            Self::Magic | Self::Rare | Self::Epic => 3,
            Self::Unique | Self::Legendary | Self::Mythic => 4,
            Self::God | Self::Forbidden => 5,
        }
    }

    /// Inclusive threshold range for generated unlock rules.
    #[must_use]
    pub const fn unlock_threshold_range(self) -> (u32, u32) {
        match self {
            Self::Common => (10, 50),
            Self::Uncommon => (50, 200),
            Self::Magic => (200, 500),
            Self::Rare => (500, 1_000),
            Self::Epic => (1_000, 3_000),
            Self::Unique => (3_000, 5_000),
            Self::Legendary => (5_000, 8_000),
            Self::Mythic => (8_000, 12_000),
            Self::God => (12_000, 20_000),
            Self::Forbidden => (20_000, 50_000),
        }
    }

    /// Depth a node of this tier occupies when depth and rarity are coupled.
    #[must_use]
    pub const fn coupled_depth(self) -> u8 {
        self as u8 + 1
    }

    /// Tier matching a coupled depth (1 = Common .. 10 = Forbidden).
    #[must_use]
    pub fn for_depth(depth: u8) -> Option<Self> {
        usize::from(depth).checked_sub(1).and_then(Self::from_ordinal)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Magic => "Magic",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Unique => "Unique",
            Self::Legendary => "Legendary",
            Self::Mythic => "Mythic",
            Self::God => "God",
            Self::Forbidden => "Forbidden",
        }
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rarity tier '{0}'")]
pub struct UnknownRarity(pub String);

impl FromStr for RarityTier {
    type Err = UnknownRarity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownRarity(needle.to_string()))
    }
}

/// Static weights with the floor and preference adjustments applied.
///
/// Tiers below `floor` are zeroed and their mass is spread over the survivors
/// in proportion to their own weights. A `preferred` tier that survived gets a
/// 1.5x boost, after which the table is renormalized to sum to 100.
#[must_use]
pub fn rarity_weights(preferred: Option<RarityTier>, floor: Option<RarityTier>) -> RarityWeights {
    let mut weights: RarityWeights = RarityTier::ALL.map(RarityTier::base_weight);

    if let Some(floor) = floor {
        let cut = floor.ordinal();
        let removed: f64 = weights[..cut].iter().sum();
        let remaining: f64 = weights[cut..].iter().filter(|w| **w > 0.0).sum();
        for weight in &mut weights[..cut] {
            *weight = 0.0;
        }
        if remaining > 0.0 && removed > 0.0 {
            let scale = (remaining + removed) / remaining;
            for weight in &mut weights[cut..] {
                *weight *= scale;
            }
        }
    }

    if let Some(preferred) = preferred
        && weights[preferred.ordinal()] > 0.0
    {
        weights[preferred.ordinal()] *= PREFERRED_RARITY_BOOST;
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            for weight in &mut weights {
                *weight = *weight / total * NORMALIZED_WEIGHT_TOTAL;
            }
        }
    }

    weights
}

/// Roll one tier, never returning below `floor` and honouring the strict
/// increase rule for floors at Unique or above.
pub fn sample_rarity<R: Rng + ?Sized>(
    rng: &mut R,
    preferred: Option<RarityTier>,
    floor: Option<RarityTier>,
) -> RarityTier {
    let weights = rarity_weights(preferred, floor);
    sample_from_weights(rng, &weights, floor)
}

/// Draw from an explicit weight table, then apply floor enforcement.
///
/// A table without positive weights yields `floor`, or the top tier when no
/// floor is given.
pub fn sample_from_weights<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &RarityWeights,
    floor: Option<RarityTier>,
) -> RarityTier {
    let min_ordinal = floor.map_or(0, RarityTier::ordinal);
    let candidates: Vec<(RarityTier, f64)> = RarityTier::ALL
        .into_iter()
        .zip(weights.iter().copied())
        .filter(|(tier, weight)| tier.ordinal() >= min_ordinal && *weight > 0.0)
        .collect();
    let total: f64 = candidates.iter().map(|(_, weight)| weight).sum();
    if candidates.is_empty() || !total.is_finite() || total <= 0.0 {
        return floor.unwrap_or(RarityTier::MAX);
    }

    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    let mut selected = None;
    for (tier, weight) in &candidates {
        cumulative += weight;
        if roll < cumulative {
            selected = Some(*tier);
            break;
        }
    }
    // Float drift can leave the roll past the last bucket.
    let selected = selected
        .or_else(|| candidates.last().map(|(tier, _)| *tier))
        .unwrap_or(RarityTier::MAX);

    enforce_floor(selected, floor)
}

/// Force `selected` to respect `floor`: never below it, and strictly above it
/// once the floor reaches Unique (unless the floor is already the top tier).
#[must_use]
pub fn enforce_floor(selected: RarityTier, floor: Option<RarityTier>) -> RarityTier {
    let Some(floor) = floor else {
        return selected;
    };
    if selected < floor {
        return strict_step(floor);
    }
    if floor.requires_strict_increase() && selected <= floor {
        return floor.next().unwrap_or(floor);
    }
    selected
}

fn strict_step(floor: RarityTier) -> RarityTier {
    if floor.requires_strict_increase() {
        floor.next().unwrap_or(floor)
    } else {
        floor
    }
}
