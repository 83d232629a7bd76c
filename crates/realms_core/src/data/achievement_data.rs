//! Achievement definitions: categories, requirements, and rewards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resources::{Cost, ResourceType};

/// Achievement category. Save files group milestone flags by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    /// Resource balances.
    ResourceMilestones,
    /// Race counts.
    RaceMilestones,
    /// Lifetime production attributed to a race.
    RaceSkillMilestones,
    /// Building counts and levels.
    BuildingMilestones,
    /// Completed prestiges.
    PrestigeMilestones,
    /// Play time.
    TimeMilestones,
}

impl AchievementCategory {
    /// Every category, in evaluation order.
    pub const ALL: [Self; 6] = [
        Self::ResourceMilestones,
        Self::RaceMilestones,
        Self::BuildingMilestones,
        Self::PrestigeMilestones,
        Self::TimeMilestones,
        Self::RaceSkillMilestones,
    ];
}

impl fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResourceMilestones => "resource_milestones",
            Self::RaceMilestones => "race_milestones",
            Self::RaceSkillMilestones => "race_skill_milestones",
            Self::BuildingMilestones => "building_milestones",
            Self::PrestigeMilestones => "prestige_milestones",
            Self::TimeMilestones => "time_milestones",
        };
        f.write_str(name)
    }
}

/// Predicate for completing an achievement. Thresholds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AchievementRequirement {
    /// Hold at least these balances simultaneously.
    Resources(Cost),

    /// Own `count` of one race.
    RaceCount {
        /// Race id.
        race: String,
        /// Minimum count.
        count: u32,
    },

    /// Every unlocked race owned at least `count` times.
    AllRaces {
        /// Minimum count.
        count: u32,
    },

    /// Any building type owned `count` times.
    AnyBuilding {
        /// Minimum count.
        count: u32,
    },

    /// Any owned building type at `level`.
    AnyBuildingLevel {
        /// Minimum level.
        level: u32,
    },

    /// Every owned building type at `level`. Needs at least one owned building.
    AllBuildingsLevel {
        /// Minimum level.
        level: u32,
    },

    /// Own `count` of one building.
    BuildingCount {
        /// Building id.
        building: String,
        /// Minimum count.
        count: u32,
    },

    /// Completed prestiges.
    PrestigeCount {
        /// Minimum prestiges.
        count: u32,
    },

    /// Real play time in seconds.
    PlayTime {
        /// Minimum seconds.
        seconds: f64,
    },

    /// Lifetime production of one resource attributed to an unlocked race.
    RaceSkill {
        /// Race id.
        race: String,
        /// Resource tracked.
        resource: ResourceType,
        /// Minimum amount.
        amount: f64,
        /// Minimum player level.
        #[serde(default)]
        player_level: u32,
        /// Minimum completed prestiges.
        #[serde(default)]
        prestige_level: u32,
    },

    /// Lifetime production of every producible resource attributed to an unlocked race.
    RaceSkillAllResources {
        /// Race id.
        race: String,
        /// Minimum amount per resource.
        amount: f64,
        /// Minimum player level.
        #[serde(default)]
        player_level: u32,
        /// Minimum completed prestiges.
        #[serde(default)]
        prestige_level: u32,
    },

    /// Reach a player level within a play-time budget.
    SpeedRun {
        /// Minimum player level.
        player_level: u32,
        /// Maximum play time in seconds.
        max_play_time: f64,
    },
}

/// Permanent reward for an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AchievementReward {
    /// Multiplier on one resource.
    ResourceMultiplier {
        /// Affected resource.
        resource: ResourceType,
        /// Multiplier.
        factor: f64,
    },

    /// Multiplier on every producible resource.
    AllProduction {
        /// Multiplier.
        factor: f64,
    },

    /// Multiplier on every race's resource bonus.
    AllRaceEfficiency {
        /// Multiplier.
        factor: f64,
    },

    /// Multiplier on one race's production of one resource.
    RaceResourceBonus {
        /// Race id.
        race: String,
        /// Affected resource.
        resource: ResourceType,
        /// Multiplier.
        factor: f64,
    },

    /// Multiplier on one race's production of everything.
    RaceEfficiency {
        /// Race id.
        race: String,
        /// Multiplier.
        factor: f64,
    },

    /// Multiplier on building purchase and upgrade prices.
    BuildingCostReduction {
        /// Cost multiplier.
        factor: f64,
    },
}

/// Data-driven achievement definition.
///
/// # Example RON
///
/// ```ron
/// AchievementData(
///     id: "first_building",
///     name: "Architect",
///     category: building_milestones,
///     requirement: AnyBuilding(count: 1),
///     rewards: [BuildingCostReduction(factor: 0.95)],
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementData {
    /// Unique string identifier across all categories.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text.
    #[serde(default)]
    pub description: String,

    /// Category the milestone flag is stored under.
    pub category: AchievementCategory,

    /// Completion predicate.
    pub requirement: AchievementRequirement,

    /// Rewards granted once completed.
    #[serde(default)]
    pub rewards: Vec<AchievementReward>,
}
