//! Race and race-ability definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resources::{Cost, ResourceType};

/// Data-driven race definition.
///
/// # Example RON
///
/// ```ron
/// RaceData(
///     id: "dwarf",
///     name: "Dwarves",
///     description: "Masters of mining and crafting.",
///     base_cost: {"gold": 50.0},
///     resource_bonuses: {"gold": 1.2, "stone": 1.5},
///     abilities: [
///         AbilityData(
///             id: "master_smiths",
///             name: "Master Smiths",
///             description: "All buildings work 25% harder.",
///             effects: [BuildingEfficiency(factor: 1.25)],
///             requirements: AbilityRequirements(
///                 race_level: 100,
///                 prestige_level: 3,
///                 resources: {"gold": 10000000.0, "crystal": 10000.0},
///             ),
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceData {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Price of the first unit.
    pub base_cost: Cost,

    /// Per-resource production bonus. A race only produces resources listed here.
    #[serde(default)]
    pub resource_bonuses: BTreeMap<ResourceType, f64>,

    /// Player level at which the race unlocks.
    #[serde(default = "default_unlock_level")]
    pub unlock_level: u32,

    /// Completed prestiges required before the race unlocks.
    #[serde(default)]
    pub requires_prestige: u32,

    /// Level cap. `None` means unbounded.
    #[serde(default)]
    pub max_level: Option<u32>,

    /// Owned-count cap. `None` means unbounded.
    #[serde(default)]
    pub max_count: Option<u32>,

    /// Linear price growth per owned unit.
    #[serde(default = "default_cost_growth")]
    pub cost_growth: f64,

    /// Level-1 upgrade price as a multiple of the base cost.
    #[serde(default = "default_upgrade_cost_factor")]
    pub upgrade_cost_factor: f64,

    /// Upgrade price ratio between consecutive levels.
    #[serde(default = "default_upgrade_cost_ratio")]
    pub upgrade_cost_ratio: f64,

    /// Special abilities, unlocked and toggled per race.
    #[serde(default)]
    pub abilities: Vec<AbilityData>,
}

const fn default_unlock_level() -> u32 {
    1
}

const fn default_cost_growth() -> f64 {
    0.15
}

const fn default_upgrade_cost_factor() -> f64 {
    5.0
}

const fn default_upgrade_cost_ratio() -> f64 {
    2.0
}

impl RaceData {
    /// Production bonus for `resource`, if the race produces it.
    #[must_use]
    pub fn bonus(&self, resource: ResourceType) -> Option<f64> {
        self.resource_bonuses.get(&resource).copied()
    }

    /// Find an ability by id.
    #[must_use]
    pub fn ability(&self, id: &str) -> Option<&AbilityData> {
        self.abilities.iter().find(|a| a.id == id)
    }
}

/// A race special ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityData {
    /// Identifier, unique within the race.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Effects applied while the ability is active.
    pub effects: Vec<AbilityEffect>,

    /// One-time unlock requirements.
    #[serde(default)]
    pub requirements: AbilityRequirements,
}

/// Requirements for unlocking an ability. The resources are spent on unlock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilityRequirements {
    /// Minimum race level.
    #[serde(default)]
    pub race_level: u32,

    /// Minimum completed prestiges.
    #[serde(default)]
    pub prestige_level: u32,

    /// Resources deducted at the moment of unlock.
    #[serde(default)]
    pub resources: Cost,
}

/// Effect of an active race ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityEffect {
    /// Multiply one resource's global multiplier.
    ResourceMultiplier {
        /// Affected resource.
        resource: ResourceType,
        /// Multiplier.
        factor: f64,
    },

    /// Multiply every resource's global multiplier.
    AllResourcesMultiplier {
        /// Multiplier.
        factor: f64,
    },

    /// Multiply a resource's global multiplier when any owned building produces it.
    BuildingEfficiency {
        /// Multiplier.
        factor: f64,
    },

    /// Add `bonus * count` to the owning race's ability bonus.
    PerUnitBonus {
        /// Bonus per owned unit.
        bonus: f64,
    },

    /// Add `gold / 1000 * bonus` to the owning race's gold ability bonus.
    GoldStorageBonus {
        /// Bonus per thousand gold held.
        bonus: f64,
    },

    /// Flat generation of every resource, scaled by player level.
    PassiveGeneration {
        /// Rate per player level per second.
        rate: f64,
    },

    /// Production bonus during the first `alignment_duration` seconds of every wall-clock hour.
    TimedProductionBonus {
        /// Multiplier inside the window.
        factor: f64,
        /// Window length in seconds.
        #[serde(default = "default_alignment_duration")]
        alignment_duration: f64,
    },

    /// Chance per tick to double that tick's production.
    ProductionDoublingChance {
        /// Probability in `[0, 1]`.
        chance: f64,
    },

    /// Chance per second to grant a lump of a random resource.
    RandomResourceGeneration {
        /// Probability per simulated second.
        chance_per_second: f64,
    },

    /// Credit every other resource with a share of the fastest resource's rate.
    ResourceConversion {
        /// Share of the top rate per second.
        rate: f64,
    },

    /// Drain the selected source resource into the selected target.
    ResourceTransmutation {
        /// Target credited per unit of source drained.
        efficiency: f64,
    },

    /// Credit crystal with a share of the stone produced this tick.
    StoneToCrystalConversion {
        /// Crystal per stone.
        ratio: f64,
    },

    /// Produce every resource again at a fraction of its base rate.
    ParallelProduction {
        /// Fraction of the base rate.
        fraction: f64,
    },

    /// Prestige points proportional to total earnings.
    PassivePrestigeGeneration {
        /// Points per gold earned per second.
        rate: f64,
    },

    /// Multiply research costs.
    ResearchCostReduction {
        /// Cost multiplier.
        factor: f64,
    },

    /// Multiply the bonus term of research multipliers.
    ResearchEffectBonus {
        /// Bonus multiplier.
        factor: f64,
    },
}

const fn default_alignment_duration() -> f64 {
    300.0
}
