//! Research data structures.

use serde::{Deserialize, Serialize};

use crate::resources::{Cost, ResourceType};

/// Effect of a researched technology. Every effect grows linearly with level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResearchEffect {
    /// Multiplier on a single resource.
    ResourceMultiplier {
        /// Affected resource.
        resource: ResourceType,
        /// Level-1 multiplier.
        factor: f64,
    },

    /// Multiplier on every producible resource.
    GlobalMultiplier {
        /// Level-1 multiplier.
        factor: f64,
    },

    /// Multiplier on every race's resource bonus.
    RaceBonusMultiplier {
        /// Level-1 multiplier.
        factor: f64,
    },

    /// Flat per-second generation of every producible resource.
    IdleResourceGeneration {
        /// Level-1 amount per second.
        amount: f64,
    },
}

/// Data-driven research definition.
///
/// # Example RON
///
/// ```ron
/// ResearchData(
///     id: "improved_tools",
///     name: "Improved Tools",
///     description: "Better tools for everyone.",
///     cost: {"ancient_knowledge": 10.0},
///     cost_scaling: 1.5,
///     max_level: 10,
///     effects: [GlobalMultiplier(factor: 1.1)],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchData {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Price of the first level.
    pub cost: Cost,

    /// Price ratio between consecutive levels.
    #[serde(default = "default_cost_scaling")]
    pub cost_scaling: f64,

    /// Level cap.
    pub max_level: u32,

    /// Player level at which the research unlocks.
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,

    /// Completed prestiges required before the research unlocks.
    #[serde(default)]
    pub requires_prestige: u32,

    /// Strength of each level relative to the first.
    #[serde(default = "default_effect_scaling")]
    pub effect_scaling: f64,

    /// Effects applied once researched.
    #[serde(default)]
    pub effects: Vec<ResearchEffect>,
}

const fn default_cost_scaling() -> f64 {
    1.5
}

const fn default_unlock_level() -> u32 {
    1
}

const fn default_effect_scaling() -> f64 {
    1.0
}

impl ResearchData {
    /// `1 + (factor - 1) * level * effect_scaling * bonus`.
    ///
    /// `bonus` scales the improvement term and is 1 without research-effect abilities.
    #[must_use]
    pub fn scaled_multiplier(&self, factor: f64, level: u32, bonus: f64) -> f64 {
        1.0 + (factor - 1.0) * f64::from(level) * self.effect_scaling * bonus
    }

    /// Flat generation at `level`: `amount * effect_scaling^(level - 1)`.
    #[must_use]
    pub fn idle_generation(&self, level: u32) -> f64 {
        if level == 0 {
            return 0.0;
        }
        let exponent = i32::try_from(level - 1).unwrap_or(i32::MAX);
        self.effects
            .iter()
            .map(|effect| match effect {
                ResearchEffect::IdleResourceGeneration { amount } => {
                    amount * self.effect_scaling.powi(exponent)
                }
                _ => 0.0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_research() {
        let research: ResearchData = ron::from_str(
            r#"ResearchData(
                id: "reality_manipulation",
                name: "Reality Manipulation",
                cost: {"ancient_knowledge": 1000.0},
                max_level: 5,
                effect_scaling: 2.0,
                effects: [IdleResourceGeneration(amount: 1.0), GlobalMultiplier(factor: 1.5)],
            )"#,
        )
        .unwrap();
        assert_eq!(research.cost_scaling, 1.5);
        assert_eq!(research.unlock_level, 1);
        assert_eq!(research.idle_generation(0), 0.0);
        assert_eq!(research.idle_generation(1), 1.0);
        assert_eq!(research.idle_generation(3), 4.0);
        // effect_scaling is 2.0 here
        assert_eq!(research.scaled_multiplier(1.5, 2, 1.0), 3.0);
        assert_eq!(research.scaled_multiplier(1.5, 2, 2.0), 5.0);
    }
}
