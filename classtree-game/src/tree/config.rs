use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::STRUCTURAL_MINIMUM_PER_BASE;
use crate::templates::BaseClassId;

/// Tunable knobs for one tree build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "TreeConfig::default_target_total_nodes")]
    pub target_total_nodes: usize,
    /// Loop passes allowed per requested node.
    #[serde(default = "TreeConfig::default_iteration_budget_factor")]
    pub iteration_budget_factor: usize,
    #[serde(default = "TreeConfig::default_common_path_start_chance")]
    pub common_path_start_chance: f64,
    /// Extension chance while the path is under half complete.
    #[serde(default = "TreeConfig::default_common_path_extend_early")]
    pub common_path_extend_early: f64,
    #[serde(default = "TreeConfig::default_common_path_extend_mid")]
    pub common_path_extend_mid: f64,
    /// Extension chance once the path is at least 80% complete.
    #[serde(default = "TreeConfig::default_common_path_extend_late")]
    pub common_path_extend_late: f64,
    #[serde(default = "TreeConfig::default_level_skip_chance")]
    pub level_skip_chance: f64,
    #[serde(default = "TreeConfig::default_common_path_boost")]
    pub common_path_boost: f64,
    #[serde(default = "TreeConfig::default_common_path_tail_boost")]
    pub common_path_tail_boost: f64,
}

impl TreeConfig {
    const fn default_target_total_nodes() -> usize {
        250
    }

    const fn default_iteration_budget_factor() -> usize {
        10
    }

    const fn default_common_path_start_chance() -> f64 {
        0.70
    }

    const fn default_common_path_extend_early() -> f64 {
        0.75
    }

    const fn default_common_path_extend_mid() -> f64 {
        0.65
    }

    const fn default_common_path_extend_late() -> f64 {
        0.60
    }

    const fn default_level_skip_chance() -> f64 {
        0.20
    }

    const fn default_common_path_boost() -> f64 {
        2.0
    }

    const fn default_common_path_tail_boost() -> f64 {
        3.0
    }

    #[must_use]
    pub fn with_target(target_total_nodes: usize) -> Self {
        Self {
            target_total_nodes,
            ..Self::default()
        }
    }

    /// Nodes each base class aims for; the total is split evenly.
    #[must_use]
    pub const fn per_base_target(&self) -> usize {
        self.target_total_nodes / BaseClassId::ALL.len()
    }

    /// Hard cap on loop passes. Never smaller than what the structural
    /// minimums alone require.
    #[must_use]
    pub fn iteration_budget(&self) -> usize {
        let floor = STRUCTURAL_MINIMUM_PER_BASE * BaseClassId::ALL.len();
        self.target_total_nodes
            .max(floor)
            .saturating_mul(self.iteration_budget_factor)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `TreeConfigError` when a probability is outside `[0, 1]`, the
    /// iteration factor is zero, or a boost is below 1.
    pub fn validate(&self) -> Result<(), TreeConfigError> {
        if self.iteration_budget_factor == 0 {
            return Err(TreeConfigError::MinViolation {
                field: "iteration_budget_factor",
                min: 1.0,
                value: 0.0,
            });
        }
        let probabilities = [
            ("common_path_start_chance", self.common_path_start_chance),
            ("common_path_extend_early", self.common_path_extend_early),
            ("common_path_extend_mid", self.common_path_extend_mid),
            ("common_path_extend_late", self.common_path_extend_late),
            ("level_skip_chance", self.level_skip_chance),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(TreeConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        for (field, value) in [
            ("common_path_boost", self.common_path_boost),
            ("common_path_tail_boost", self.common_path_tail_boost),
        ] {
            if !(value >= 1.0 && value.is_finite()) {
                return Err(TreeConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            target_total_nodes: Self::default_target_total_nodes(),
            iteration_budget_factor: Self::default_iteration_budget_factor(),
            common_path_start_chance: Self::default_common_path_start_chance(),
            common_path_extend_early: Self::default_common_path_extend_early(),
            common_path_extend_mid: Self::default_common_path_extend_mid(),
            common_path_extend_late: Self::default_common_path_extend_late(),
            level_skip_chance: Self::default_level_skip_chance(),
            common_path_boost: Self::default_common_path_boost(),
            common_path_tail_boost: Self::default_common_path_tail_boost(),
        }
    }
}

/// Errors raised when tree configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum TreeConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = TreeConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.per_base_target(), 50);
        assert_eq!(cfg.iteration_budget(), 2_500);
    }

    #[test]
    fn empty_json_yields_defaults() {
        let cfg: TreeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, TreeConfig::default());
        let partial: TreeConfig = serde_json::from_str(r#"{"target_total_nodes": 10}"#).unwrap();
        assert_eq!(partial.per_base_target(), 2);
        assert_eq!(partial.common_path_boost, 2.0);
    }

    #[test]
    fn small_targets_keep_a_workable_budget() {
        let cfg = TreeConfig::with_target(10);
        assert_eq!(cfg.iteration_budget(), 200);
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let cfg = TreeConfig {
            level_skip_chance: 1.5,
            ..TreeConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(TreeConfigError::RangeViolation {
                field: "level_skip_chance",
                min: 0.0,
                max: 1.0,
                value: 1.5,
            })
        );
    }

    #[test]
    fn rejects_weak_boost_and_zero_budget() {
        let weak = TreeConfig {
            common_path_tail_boost: 0.5,
            ..TreeConfig::default()
        };
        assert!(matches!(
            weak.validate(),
            Err(TreeConfigError::MinViolation {
                field: "common_path_tail_boost",
                ..
            })
        ));
        let zero = TreeConfig {
            iteration_budget_factor: 0,
            ..TreeConfig::default()
        };
        assert!(zero.validate().is_err());
    }
}
