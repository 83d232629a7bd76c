//! Data structures for game configuration.
//!
//! This module contains pure data structures that define races, buildings,
//! research, prestige upgrades, and achievements. All structs are designed to
//! be deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types. File
//! loading is handled by the host crates. A built-in table is compiled in and
//! available through [`GameConfig::builtin`].

mod achievement_data;
mod building_data;
mod prestige_data;
mod race_data;
mod research_data;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::resources::ResourceType;

pub use achievement_data::{
    AchievementCategory, AchievementData, AchievementRequirement, AchievementReward,
};
pub use building_data::BuildingData;
pub use prestige_data::{PrestigeEffect, PrestigeUpgradeData};
pub use race_data::{AbilityData, AbilityEffect, AbilityRequirements, RaceData};
pub use research_data::{ResearchData, ResearchEffect};

const BUILTIN_RON: &str = include_str!("../../../../assets/data/realms.ron");

/// Global balance constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConstants {
    /// Base income per race unit per level per second.
    #[serde(default = "default_base_income_rate")]
    pub base_income_rate: f64,

    /// Gold at the start of a new game and after prestige.
    #[serde(default = "default_starting_gold")]
    pub starting_gold: f64,

    /// Total gold earned per player level.
    #[serde(default = "default_level_step")]
    pub level_step: f64,

    /// Total earnings required for the first prestige point.
    #[serde(default = "default_prestige_requirement_base")]
    pub prestige_requirement_base: f64,

    /// Earnings ratio per additional prestige point.
    #[serde(default = "default_prestige_scaling")]
    pub prestige_scaling: f64,

    /// Global production bonus per completed prestige.
    #[serde(default = "default_prestige_bonus_base")]
    pub prestige_bonus_base: f64,

    /// Share of offline time simulated on load.
    #[serde(default = "default_offline_progress_rate")]
    pub offline_progress_rate: f64,

    /// Time warp length in seconds.
    #[serde(default = "default_time_warp_duration")]
    pub time_warp_duration: f64,

    /// Seconds between time warp activations.
    #[serde(default = "default_time_warp_cooldown")]
    pub time_warp_cooldown: f64,

    /// Elapsed-time multiplier while warped, before prestige boosts.
    #[serde(default = "default_time_warp_multiplier")]
    pub time_warp_multiplier: f64,

    /// Notification ring capacity.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,

    /// Random resource lump per player level.
    #[serde(default = "default_random_generation_amount")]
    pub random_generation_amount: f64,

    /// Random lump bonus per completed prestige.
    #[serde(default = "default_random_generation_prestige_bonus")]
    pub random_generation_prestige_bonus: f64,

    /// Share of the transmutation source drained per second.
    #[serde(default = "default_transmutation_rate")]
    pub transmutation_rate: f64,

    /// Period of the timed production window in wall-clock seconds.
    #[serde(default = "default_alignment_period")]
    pub alignment_period: f64,
}

const fn default_base_income_rate() -> f64 {
    1.0
}

const fn default_starting_gold() -> f64 {
    100.0
}

const fn default_level_step() -> f64 {
    1000.0
}

const fn default_prestige_requirement_base() -> f64 {
    1_000_000.0
}

const fn default_prestige_scaling() -> f64 {
    5.0
}

const fn default_prestige_bonus_base() -> f64 {
    0.1
}

const fn default_offline_progress_rate() -> f64 {
    0.5
}

const fn default_time_warp_duration() -> f64 {
    3600.0
}

const fn default_time_warp_cooldown() -> f64 {
    86_400.0
}

const fn default_time_warp_multiplier() -> f64 {
    2.0
}

const fn default_notification_capacity() -> usize {
    20
}

const fn default_random_generation_amount() -> f64 {
    10.0
}

const fn default_random_generation_prestige_bonus() -> f64 {
    0.5
}

const fn default_transmutation_rate() -> f64 {
    0.01
}

const fn default_alignment_period() -> f64 {
    3600.0
}

impl Default for BalanceConstants {
    fn default() -> Self {
        Self {
            base_income_rate: default_base_income_rate(),
            starting_gold: default_starting_gold(),
            level_step: default_level_step(),
            prestige_requirement_base: default_prestige_requirement_base(),
            prestige_scaling: default_prestige_scaling(),
            prestige_bonus_base: default_prestige_bonus_base(),
            offline_progress_rate: default_offline_progress_rate(),
            time_warp_duration: default_time_warp_duration(),
            time_warp_cooldown: default_time_warp_cooldown(),
            time_warp_multiplier: default_time_warp_multiplier(),
            notification_capacity: default_notification_capacity(),
            random_generation_amount: default_random_generation_amount(),
            random_generation_prestige_bonus: default_random_generation_prestige_bonus(),
            transmutation_rate: default_transmutation_rate(),
            alignment_period: default_alignment_period(),
        }
    }
}

/// Complete game configuration.
///
/// Loaded once at startup and never mutated afterwards. Table order is the
/// order entities are scanned in every tick.
///
/// # Example RON
///
/// ```ron
/// GameConfig(
///     balance: BalanceConstants(starting_gold: 100.0),
///     races: [...],
///     buildings: [...],
///     research: [...],
///     prestige_upgrades: [...],
///     achievements: [...],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConfig {
    /// Balance constants.
    #[serde(default)]
    pub balance: BalanceConstants,

    /// Race table.
    #[serde(default)]
    pub races: Vec<RaceData>,

    /// Building table.
    #[serde(default)]
    pub buildings: Vec<BuildingData>,

    /// Research table.
    #[serde(default)]
    pub research: Vec<ResearchData>,

    /// Prestige upgrade table.
    #[serde(default)]
    pub prestige_upgrades: Vec<PrestigeUpgradeData>,

    /// Achievement table.
    #[serde(default)]
    pub achievements: Vec<AchievementData>,
}

impl GameConfig {
    /// Parse a configuration from RON text.
    ///
    /// `origin` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not a valid config.
    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// The configuration compiled into the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded table fails to parse or validate.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(BUILTIN_RON, "<builtin>")?.validated()
    }

    /// Consume the config, returning it only if [`validate`](Self::validate) is clean.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] listing every problem found.
    pub fn validated(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(GameError::InvalidConfig(errors))
        }
    }

    /// Find a race by id.
    #[must_use]
    pub fn race(&self, id: &str) -> Option<&RaceData> {
        self.races.iter().find(|r| r.id == id)
    }

    /// Find a building by id.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&BuildingData> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Find a research by id.
    #[must_use]
    pub fn research(&self, id: &str) -> Option<&ResearchData> {
        self.research.iter().find(|r| r.id == id)
    }

    /// Find a prestige upgrade by id.
    #[must_use]
    pub fn prestige_upgrade(&self, id: &str) -> Option<&PrestigeUpgradeData> {
        self.prestige_upgrades.iter().find(|u| u.id == id)
    }

    /// Find an achievement by id.
    #[must_use]
    pub fn achievement(&self, id: &str) -> Option<&AchievementData> {
        self.achievements.iter().find(|a| a.id == id)
    }

    /// Achievements in `category`, in table order.
    pub fn achievements_in(
        &self,
        category: AchievementCategory,
    ) -> impl Iterator<Item = &AchievementData> {
        self.achievements
            .iter()
            .filter(move |a| a.category == category)
    }

    /// Validate internal consistency of the configuration.
    ///
    /// Checks for:
    /// - Duplicate ids within each table
    /// - Race references in achievements
    /// - Positive scaling factors and caps
    /// - Prestige points never appearing as produced output
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_unique("race", self.races.iter().map(|r| r.id.as_str()), &mut errors);
        check_unique("building", self.buildings.iter().map(|b| b.id.as_str()), &mut errors);
        check_unique("research", self.research.iter().map(|r| r.id.as_str()), &mut errors);
        check_unique(
            "prestige upgrade",
            self.prestige_upgrades.iter().map(|u| u.id.as_str()),
            &mut errors,
        );
        check_unique(
            "achievement",
            self.achievements.iter().map(|a| a.id.as_str()),
            &mut errors,
        );

        for race in &self.races {
            check_unique(
                &format!("ability of race '{}'", race.id),
                race.abilities.iter().map(|a| a.id.as_str()),
                &mut errors,
            );
            if race.upgrade_cost_ratio <= 0.0 || race.upgrade_cost_factor <= 0.0 {
                errors.push(format!("Race '{}' has a non-positive upgrade cost", race.id));
            }
            if race.cost_growth < 0.0 {
                errors.push(format!("Race '{}' has negative cost growth", race.id));
            }
            if race.resource_bonuses.contains_key(&ResourceType::PrestigePoints) {
                errors.push(format!("Race '{}' produces prestige points", race.id));
            }
            if race.max_level == Some(0) {
                errors.push(format!("Race '{}' has a max level of 0", race.id));
            }
        }

        for building in &self.buildings {
            if building.level_scaling <= 0.0 || building.upgrade_cost_ratio <= 0.0 {
                errors.push(format!(
                    "Building '{}' has a non-positive scaling factor",
                    building.id
                ));
            }
            if building.cost_growth < 0.0 {
                errors.push(format!("Building '{}' has negative cost growth", building.id));
            }
            if building.production.contains_key(&ResourceType::PrestigePoints) {
                errors.push(format!("Building '{}' produces prestige points", building.id));
            }
            if building.max_level == 0 {
                errors.push(format!("Building '{}' has a max level of 0", building.id));
            }
        }

        for research in &self.research {
            if research.cost_scaling <= 0.0 {
                errors.push(format!(
                    "Research '{}' has a non-positive cost scaling",
                    research.id
                ));
            }
        }

        for upgrade in &self.prestige_upgrades {
            if upgrade.cost_scaling <= 0.0 {
                errors.push(format!(
                    "Prestige upgrade '{}' has a non-positive cost scaling",
                    upgrade.id
                ));
            }
        }

        for achievement in &self.achievements {
            let mut races: Vec<&str> = Vec::new();
            match &achievement.requirement {
                AchievementRequirement::RaceCount { race, .. }
                | AchievementRequirement::RaceSkill { race, .. }
                | AchievementRequirement::RaceSkillAllResources { race, .. } => races.push(race),
                AchievementRequirement::BuildingCount { building, .. } => {
                    if self.building(building).is_none() {
                        errors.push(format!(
                            "Achievement '{}' references unknown building '{}'",
                            achievement.id, building
                        ));
                    }
                }
                _ => {}
            }
            for reward in &achievement.rewards {
                match reward {
                    AchievementReward::RaceResourceBonus { race, .. }
                    | AchievementReward::RaceEfficiency { race, .. } => races.push(race),
                    _ => {}
                }
            }
            for race in races {
                if self.race(race).is_none() {
                    errors.push(format!(
                        "Achievement '{}' references unknown race '{}'",
                        achievement.id, race
                    ));
                }
            }
        }

        let balance = &self.balance;
        if balance.level_step <= 0.0 {
            errors.push("Balance level_step must be positive".to_string());
        }
        if balance.prestige_requirement_base <= 0.0 || balance.prestige_scaling <= 1.0 {
            errors.push(
                "Balance prestige requirement must be positive with scaling above 1".to_string(),
            );
        }
        if balance.notification_capacity == 0 {
            errors.push("Balance notification_capacity must be at least 1".to_string());
        }

        errors
    }
}

fn check_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(format!("Duplicate {kind} id '{id}'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_is_valid() {
        let config = GameConfig::builtin().unwrap();
        assert!(!config.races.is_empty());
        assert!(!config.buildings.is_empty());
        assert!(config.validate().is_empty());
        assert_eq!(config.balance, BalanceConstants::default());
    }

    #[test]
    fn test_builtin_covers_every_achievement_category() {
        let config = GameConfig::builtin().unwrap();
        for category in AchievementCategory::ALL {
            assert!(
                config.achievements_in(category).next().is_some(),
                "no achievements in {category}"
            );
        }
    }

    #[test]
    fn test_balance_defaults_when_omitted() {
        let config = GameConfig::from_ron_str("GameConfig()", "inline").unwrap();
        assert_eq!(config.balance.starting_gold, 100.0);
        assert_eq!(config.balance.prestige_requirement_base, 1_000_000.0);
        assert_eq!(config.balance.time_warp_cooldown, 86_400.0);
        assert_eq!(config.balance.notification_capacity, 20);
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = GameConfig::from_ron_str("GameConfig(races: 3)", "broken.ron").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { ref path, .. } if path == "broken.ron"));
    }

    #[test]
    fn test_validate_reports_bad_references() {
        let config = GameConfig::from_ron_str(
            r#"GameConfig(
                races: [
                    RaceData(id: "elf", name: "Elves", base_cost: {"gold": 50.0}),
                    RaceData(id: "elf", name: "Elves again", base_cost: {"gold": 50.0}),
                ],
                achievements: [
                    AchievementData(
                        id: "orc_lord",
                        name: "Orc Lord",
                        category: race_milestones,
                        requirement: RaceCount(race: "orc", count: 10),
                    ),
                ],
            )"#,
            "inline",
        )
        .unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate race id 'elf'")));
        assert!(errors.iter().any(|e| e.contains("unknown race 'orc'")));
        assert!(matches!(
            config.validated(),
            Err(GameError::InvalidConfig(list)) if list.len() == 2
        ));
    }
}
