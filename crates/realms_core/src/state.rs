//! Mutable game state.
//!
//! [`GameState`] holds every per-entity record plus the global counters.
//! Config tables stay in [`GameConfig`]; only counts, levels, and flags live
//! here. All maps are ordered so hashing and serialization are stable.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::data::{AchievementCategory, GameConfig, RaceData};
use crate::resources::{MultiplierTarget, ResourcePool, ResourceType};

/// Kind of configurable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A race.
    Race,
    /// A building.
    Building,
    /// A research.
    Research,
    /// A prestige upgrade.
    PrestigeUpgrade,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Race => "race",
            Self::Building => "building",
            Self::Research => "research",
            Self::PrestigeUpgrade => "prestige upgrade",
        };
        f.write_str(name)
    }
}

/// Unlock and activation flags for one race ability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityState {
    /// Set once, never cleared except by prestige.
    pub unlocked: bool,
    /// Player-toggled. Only meaningful when unlocked.
    pub active: bool,
}

/// Per-race progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceState {
    /// Owned units.
    pub count: u32,
    /// Upgrade level, starting at 1.
    pub level: u32,
    /// Whether the race can be recruited.
    pub unlocked: bool,
    /// Ability flags keyed by ability id.
    #[serde(default)]
    pub abilities: BTreeMap<String, AbilityState>,
    /// Lifetime production attributed to this race.
    #[serde(default)]
    pub skills: BTreeMap<ResourceType, f64>,
}

impl RaceState {
    fn new(race: &RaceData, unlocked: bool) -> Self {
        Self {
            count: 0,
            level: 1,
            unlocked,
            abilities: race
                .abilities
                .iter()
                .map(|a| (a.id.clone(), AbilityState::default()))
                .collect(),
            skills: ResourceType::ALL.into_iter().map(|r| (r, 0.0)).collect(),
        }
    }

    /// Whether this race contributes production: unlocked and owned.
    #[must_use]
    pub fn is_producing(&self) -> bool {
        self.unlocked && self.count > 0
    }

    /// Whether `ability` is unlocked and toggled on.
    #[must_use]
    pub fn is_ability_active(&self, ability: &str) -> bool {
        self.abilities
            .get(ability)
            .is_some_and(|a| a.unlocked && a.active)
    }

    /// Lifetime production of `resource` attributed to this race.
    #[must_use]
    pub fn skill(&self, resource: ResourceType) -> f64 {
        self.skills.get(&resource).copied().unwrap_or(0.0)
    }
}

/// Per-building progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingState {
    /// Owned buildings.
    pub count: u32,
    /// Upgrade level, starting at 1.
    pub level: u32,
    /// Whether the building can be constructed.
    pub unlocked: bool,
}

impl BuildingState {
    /// Whether this building is unlocked and owned.
    #[must_use]
    pub fn is_producing(&self) -> bool {
        self.unlocked && self.count > 0
    }
}

/// Per-research progress. Level 0 means not yet researched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchState {
    /// Researched level.
    pub level: u32,
    /// Whether the research is available.
    pub unlocked: bool,
}

/// Per-prestige-upgrade progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestigeUpgradeState {
    /// Levels bought.
    pub level: u32,
}

/// Time warp window and cooldown, in clock seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWarpState {
    /// Whether a warp is running.
    pub active: bool,
    /// Clock time the running warp ends.
    pub end_time: f64,
    /// Clock time the next warp may start.
    pub cooldown_end: f64,
}

/// Source and target for the transmutation ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmutation {
    /// Resource drained.
    pub from: ResourceType,
    /// Resource credited.
    pub to: ResourceType,
}

/// Complete mutable game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Resource balances. `PrestigePoints` is the spendable prestige balance.
    pub resources: ResourcePool,
    /// Race progress keyed by race id.
    pub races: BTreeMap<String, RaceState>,
    /// Building progress keyed by building id.
    pub buildings: BTreeMap<String, BuildingState>,
    /// Research progress keyed by research id.
    pub research: BTreeMap<String, ResearchState>,
    /// Prestige upgrade levels keyed by upgrade id.
    pub prestige_upgrades: BTreeMap<String, PrestigeUpgradeState>,
    /// Milestone flags by category.
    pub achievements: BTreeMap<AchievementCategory, BTreeMap<String, bool>>,
    /// `1 + floor(total_earnings / level_step)`.
    pub player_level: u32,
    /// Gold produced since the last prestige.
    pub total_earnings: f64,
    /// Completed prestiges.
    pub prestige_count: u32,
    /// Prestige points ever earned.
    pub total_prestige_points: f64,
    /// Permanent multipliers, kept through prestige.
    pub permanent_multipliers: BTreeMap<MultiplierTarget, f64>,
    /// Real seconds played.
    pub total_play_time: f64,
    /// Seconds of production simulated, including warp scaling and offline catch-up.
    pub total_simulated_time: f64,
    /// Time warp flags.
    pub time_warp: TimeWarpState,
    /// Transmutation pair, if selected.
    pub transmutation: Option<Transmutation>,
}

impl GameState {
    /// Fresh state for a new game.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        let mut resources = ResourcePool::new();
        resources.set(ResourceType::Gold, config.balance.starting_gold);

        let mut state = Self {
            resources,
            races: BTreeMap::new(),
            buildings: BTreeMap::new(),
            research: BTreeMap::new(),
            prestige_upgrades: config
                .prestige_upgrades
                .iter()
                .map(|u| (u.id.clone(), PrestigeUpgradeState::default()))
                .collect(),
            achievements: AchievementCategory::ALL
                .into_iter()
                .map(|category| {
                    let flags = config
                        .achievements_in(category)
                        .map(|a| (a.id.clone(), false))
                        .collect();
                    (category, flags)
                })
                .collect(),
            player_level: 1,
            total_earnings: 0.0,
            prestige_count: 0,
            total_prestige_points: 0.0,
            permanent_multipliers: BTreeMap::from([(MultiplierTarget::All, 1.0)]),
            total_play_time: 0.0,
            total_simulated_time: 0.0,
            time_warp: TimeWarpState::default(),
            transmutation: None,
        };
        state.reset_progression(config);
        state
    }

    /// Reset races, buildings, and research to their defaults, seeding unlock
    /// flags from the level-1 thresholds and the current prestige count.
    ///
    /// Race skills survive the reset.
    pub fn reset_progression(&mut self, config: &GameConfig) {
        let prestige = self.prestige_count;
        let mut races = BTreeMap::new();
        for race in &config.races {
            let unlocked = race.unlock_level <= 1 && prestige >= race.requires_prestige;
            let mut fresh = RaceState::new(race, unlocked);
            if let Some(old) = self.races.get(&race.id) {
                fresh.skills.clone_from(&old.skills);
            }
            races.insert(race.id.clone(), fresh);
        }
        self.races = races;

        self.buildings = config
            .buildings
            .iter()
            .map(|b| {
                let unlocked = b.unlock_level <= 1 && prestige >= b.requires_prestige;
                (
                    b.id.clone(),
                    BuildingState {
                        count: 0,
                        level: 1,
                        unlocked,
                    },
                )
            })
            .collect();

        self.research = config
            .research
            .iter()
            .map(|r| {
                let unlocked = r.unlock_level <= 1 && prestige >= r.requires_prestige;
                (r.id.clone(), ResearchState { level: 0, unlocked })
            })
            .collect();
    }

    /// Spendable prestige points.
    #[must_use]
    pub fn prestige_points(&self) -> f64 {
        self.resources.get(ResourceType::PrestigePoints)
    }

    /// Level of a prestige upgrade (0 if unknown).
    #[must_use]
    pub fn prestige_upgrade_level(&self, id: &str) -> u32 {
        self.prestige_upgrades.get(id).map_or(0, |u| u.level)
    }

    /// Whether the achievement `id` is complete, in any category.
    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements
            .values()
            .any(|flags| flags.get(id).copied().unwrap_or(false))
    }

    /// Number of completed achievements.
    #[must_use]
    pub fn achievement_count(&self) -> usize {
        self.achievements
            .values()
            .flat_map(BTreeMap::values)
            .filter(|done| **done)
            .count()
    }

    /// Deterministic hash of the full state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match bincode::serialize(self) {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(e) => {
                tracing::warn!(error = %e, "State snapshot failed; hashing debug form");
                format!("{self:?}").hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
