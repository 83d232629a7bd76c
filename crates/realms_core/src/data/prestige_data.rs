//! Prestige upgrade data structures.

use serde::{Deserialize, Serialize};

use crate::resources::Cost;

/// Effect of a prestige upgrade, applied per level owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrestigeEffect {
    /// Multiplies the permanent "all" multiplier once per level bought.
    PermanentMultiplier {
        /// Multiplier per level.
        factor: f64,
    },

    /// Offline progress rate per level. Replaces the default rate when owned.
    OfflineProgress {
        /// Rate per level.
        rate: f64,
    },

    /// Share of ancient knowledge kept through prestige, per level.
    KnowledgeRetention {
        /// Fraction per level.
        fraction: f64,
    },

    /// Share of every other producible resource kept through prestige, per level.
    ResourceRetention {
        /// Fraction per level.
        fraction: f64,
    },

    /// Extra starting gold after prestige, per level.
    StartingGold {
        /// Gold per level.
        amount: f64,
    },

    /// Added to the time warp multiplier, per level.
    TimeWarpBoost {
        /// Multiplier increment per level.
        amount: f64,
    },
}

/// Data-driven prestige upgrade definition.
///
/// # Example RON
///
/// ```ron
/// PrestigeUpgradeData(
///     id: "cosmic_insight",
///     name: "Cosmic Insight",
///     cost: {"prestige_points": 1.0},
///     cost_scaling: 2.0,
///     max_level: 10,
///     effects: [PermanentMultiplier(factor: 1.1)],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrestigeUpgradeData {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Price of the first level, normally in prestige points.
    pub cost: Cost,

    /// Price ratio between consecutive levels.
    #[serde(default = "default_cost_scaling")]
    pub cost_scaling: f64,

    /// Level cap.
    pub max_level: u32,

    /// Effects per level owned.
    #[serde(default)]
    pub effects: Vec<PrestigeEffect>,
}

const fn default_cost_scaling() -> f64 {
    1.0
}

impl PrestigeUpgradeData {
    /// Sum `select(effect) * level` over the effects `select` matches.
    #[must_use]
    pub fn per_level_sum(&self, level: u32, select: impl Fn(&PrestigeEffect) -> Option<f64>) -> f64 {
        if level == 0 {
            return 0.0;
        }
        self.effects.iter().filter_map(select).sum::<f64>() * f64::from(level)
    }
}
