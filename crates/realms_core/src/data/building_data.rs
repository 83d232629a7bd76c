//! Building data structures for data-driven building definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resources::{Cost, MultiplierTarget, ResourceType};

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     id: "quarry",
///     name: "Quarry",
///     description: "Cuts stone from the hills.",
///     base_cost: {"gold": 100.0, "wood": 50.0},
///     max_level: 10,
///     production: {"stone": 1.0},
///     level_scaling: 1.2,
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingData {
    /// Unique string identifier for this building type.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Price of the first building.
    pub base_cost: Cost,

    /// Player level at which the building unlocks.
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,

    /// Completed prestiges required before the building unlocks.
    #[serde(default)]
    pub requires_prestige: u32,

    /// Level cap.
    #[serde(default = "default_max_level")]
    pub max_level: u32,

    /// Owned-count cap. `None` means unbounded.
    #[serde(default)]
    pub max_count: Option<u32>,

    /// Base production per building per second.
    #[serde(default)]
    pub production: BTreeMap<ResourceType, f64>,

    /// Production ratio between consecutive levels.
    #[serde(default = "default_level_scaling")]
    pub level_scaling: f64,

    /// Global multipliers granted while at least one is owned.
    #[serde(default)]
    pub global_multipliers: BTreeMap<MultiplierTarget, f64>,

    /// Per-level scaling for global multipliers. Falls back to `level_scaling`.
    #[serde(default)]
    pub multiplier_level_scaling: Option<f64>,

    /// Linear price growth per owned building.
    #[serde(default = "default_cost_growth")]
    pub cost_growth: f64,

    /// Level-1 upgrade price as a multiple of the base cost.
    #[serde(default = "default_upgrade_cost_factor")]
    pub upgrade_cost_factor: f64,

    /// Upgrade price ratio between consecutive levels.
    #[serde(default = "default_upgrade_cost_ratio")]
    pub upgrade_cost_ratio: f64,
}

const fn default_unlock_level() -> u32 {
    1
}

const fn default_max_level() -> u32 {
    10
}

const fn default_level_scaling() -> f64 {
    1.0
}

const fn default_cost_growth() -> f64 {
    0.2
}

const fn default_upgrade_cost_factor() -> f64 {
    2.0
}

const fn default_upgrade_cost_ratio() -> f64 {
    2.0
}

impl BuildingData {
    /// Whether this building produces `resource`.
    #[must_use]
    pub fn produces(&self, resource: ResourceType) -> bool {
        self.production.contains_key(&resource)
    }

    /// Production of `resource` per second for `count` buildings at `level`.
    #[must_use]
    pub fn production_rate(&self, resource: ResourceType, count: u32, level: u32) -> f64 {
        self.production.get(&resource).map_or(0.0, |base| {
            base * f64::from(count) * self.level_scaling.powi(level_exponent(level))
        })
    }

    /// Combined global multiplier this building applies to `resource` at `level`.
    ///
    /// Level bonuses are added to multipliers of at least 1 and compound
    /// relatively on multipliers below 1.
    #[must_use]
    pub fn global_multiplier(&self, resource: ResourceType, level: u32) -> f64 {
        let scaling = self.multiplier_level_scaling.unwrap_or(self.level_scaling);
        let level_bonus = (scaling - 1.0) * f64::from(level.saturating_sub(1));
        self.global_multipliers
            .iter()
            .filter(|(target, _)| target.applies_to(resource))
            .map(|(_, &base)| {
                if base >= 1.0 {
                    base + level_bonus
                } else {
                    base * (1.0 + level_bonus)
                }
            })
            .product()
    }
}

fn level_exponent(level: u32) -> i32 {
    i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_building() -> BuildingData {
        BuildingData {
            id: "marketplace".to_string(),
            name: "Marketplace".to_string(),
            description: String::new(),
            base_cost: Cost::single(ResourceType::Gold, 500.0),
            unlock_level: 3,
            requires_prestige: 0,
            max_level: 10,
            max_count: None,
            production: BTreeMap::from([(ResourceType::Gold, 2.0)]),
            level_scaling: 1.5,
            global_multipliers: BTreeMap::from([
                (MultiplierTarget::Resource(ResourceType::Gold), 1.1),
                (MultiplierTarget::Resource(ResourceType::Food), 0.9),
            ]),
            multiplier_level_scaling: Some(1.1),
            cost_growth: 0.2,
            upgrade_cost_factor: 2.0,
            upgrade_cost_ratio: 2.0,
        }
    }

    #[test]
    fn test_production_rate_compounds_per_level() {
        let building = create_test_building();
        assert_eq!(building.production_rate(ResourceType::Gold, 3, 1), 6.0);
        assert_eq!(building.production_rate(ResourceType::Gold, 2, 3), 2.0 * 2.0 * 2.25);
        assert_eq!(building.production_rate(ResourceType::Wood, 3, 1), 0.0);
    }

    #[test]
    fn test_global_multiplier_level_bonus() {
        let building = create_test_building();
        assert_eq!(building.global_multiplier(ResourceType::Gold, 1), 1.1);
        // Additive above one, relative below one.
        assert!((building.global_multiplier(ResourceType::Gold, 3) - 1.3).abs() < 1e-12);
        assert!((building.global_multiplier(ResourceType::Food, 3) - 0.9 * 1.2).abs() < 1e-12);
        assert_eq!(building.global_multiplier(ResourceType::Stone, 5), 1.0);
    }
}
