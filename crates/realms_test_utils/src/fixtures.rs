//! Test fixtures and helpers.
//!
//! Small hand-built configs, funded states, and simulations on a manual
//! clock for consistent testing.

use std::sync::Arc;

use realms_core::clock::ManualClock;
use realms_core::commands;
use realms_core::cost::CostAction;
use realms_core::data::GameConfig;
use realms_core::resources::ResourceType;
use realms_core::simulation::Simulation;
use realms_core::state::{EntityKind, GameState};
use realms_core::unlocks;

/// Clock reading every fixture simulation starts at.
///
/// Chosen so the timed production window is closed at the start.
pub const START_TIME: f64 = 1_700_000_400.0;

/// Seed every fixture simulation uses.
pub const FIXTURE_SEED: u64 = 42;

/// A compact config covering every entity kind.
///
/// - `human`: 10 gold, produces gold and food
/// - `dwarf`: 50 gold, produces gold and stone; `deep_mining` unlocks at race level 2
/// - `orc`: unlocks at player level 3
/// - `farm`, `quarry` ({gold: 100, wood: 50}), `market` (gold multiplier)
/// - `tools` research, `insight` and `memory` prestige upgrades
pub const SMALL_CONFIG: &str = r#"GameConfig(
    races: [
        RaceData(
            id: "human",
            name: "Humans",
            base_cost: {"gold": 10.0},
            resource_bonuses: {"gold": 1.0, "food": 1.3},
        ),
        RaceData(
            id: "dwarf",
            name: "Dwarves",
            base_cost: {"gold": 50.0},
            resource_bonuses: {"gold": 1.2, "stone": 1.5},
            max_level: Some(20),
            abilities: [
                AbilityData(
                    id: "deep_mining",
                    name: "Deep Mining",
                    effects: [ResourceMultiplier(resource: "stone", factor: 2.0)],
                    requirements: AbilityRequirements(race_level: 2),
                ),
            ],
        ),
        RaceData(
            id: "orc",
            name: "Orcs",
            base_cost: {"gold": 80.0},
            resource_bonuses: {"gold": 1.5},
            unlock_level: 3,
        ),
    ],
    buildings: [
        BuildingData(
            id: "farm",
            name: "Farm",
            base_cost: {"gold": 20.0},
            production: {"food": 1.0, "wood": 0.5},
        ),
        BuildingData(
            id: "quarry",
            name: "Quarry",
            base_cost: {"gold": 100.0, "wood": 50.0},
            production: {"stone": 1.0},
            level_scaling: 1.5,
        ),
        BuildingData(
            id: "market",
            name: "Market",
            base_cost: {"gold": 500.0},
            unlock_level: 2,
            max_level: 5,
            global_multipliers: {"gold": 1.1},
        ),
    ],
    research: [
        ResearchData(
            id: "tools",
            name: "Tools",
            cost: {"gold": 200.0},
            cost_scaling: 1.5,
            max_level: 10,
            effects: [GlobalMultiplier(factor: 1.1)],
        ),
    ],
    prestige_upgrades: [
        PrestigeUpgradeData(
            id: "insight",
            name: "Insight",
            cost: {"prestige_points": 1.0},
            cost_scaling: 2.0,
            max_level: 10,
            effects: [PermanentMultiplier(factor: 1.1)],
        ),
        PrestigeUpgradeData(
            id: "memory",
            name: "Memory",
            cost: {"prestige_points": 1.0},
            max_level: 5,
            effects: [ResourceRetention(fraction: 0.1)],
        ),
    ],
    achievements: [
        AchievementData(
            id: "first_gold",
            name: "Pocket Change",
            category: resource_milestones,
            requirement: Resources({"gold": 1000.0}),
            rewards: [ResourceMultiplier(resource: "gold", factor: 1.05)],
        ),
        AchievementData(
            id: "village",
            name: "Village",
            category: race_milestones,
            requirement: RaceCount(race: "human", count: 5),
            rewards: [RaceEfficiency(race: "human", factor: 1.1)],
        ),
        AchievementData(
            id: "architect",
            name: "Architect",
            category: building_milestones,
            requirement: AnyBuilding(count: 1),
            rewards: [BuildingCostReduction(factor: 0.95)],
        ),
    ],
)"#;

/// Parse [`SMALL_CONFIG`].
///
/// # Panics
///
/// Panics if the fixture text is not a valid config.
#[must_use]
pub fn small_config() -> Arc<GameConfig> {
    let config = GameConfig::from_ron_str(SMALL_CONFIG, "fixture")
        .and_then(GameConfig::validated)
        .expect("fixture config must be valid");
    Arc::new(config)
}

/// The built-in content table.
///
/// # Panics
///
/// Panics if the built-in table is invalid.
#[must_use]
pub fn builtin_config() -> Arc<GameConfig> {
    Arc::new(GameConfig::builtin().expect("built-in config must be valid"))
}

/// A new game on a manual clock at [`START_TIME`].
///
/// The returned clock shares its time with the simulation's.
#[must_use]
pub fn manual_simulation(config: Arc<GameConfig>) -> (Simulation, ManualClock) {
    let clock = ManualClock::new(START_TIME);
    let sim = Simulation::with_clock(config, clock.clone(), FIXTURE_SEED);
    (sim, clock)
}

/// Resume `state` on a manual clock at [`START_TIME`].
#[must_use]
pub fn manual_simulation_from(
    config: Arc<GameConfig>,
    state: GameState,
) -> (Simulation, ManualClock) {
    let clock = ManualClock::new(START_TIME);
    let sim = Simulation::from_state(config, state, clock.clone(), FIXTURE_SEED);
    (sim, clock)
}

/// A fresh state holding `amount` of every producible resource.
#[must_use]
pub fn funded_state(config: &GameConfig, amount: f64) -> GameState {
    let mut state = GameState::new(config);
    for resource in ResourceType::PRODUCIBLE {
        state.resources.set(resource, amount);
    }
    state
}

/// A mid-game state: player level raised by `earnings`, every unlocked race
/// and building bought `units` times and upgraded `levels` times.
///
/// Purchases that fail (caps, locks) are skipped. Resources are topped up
/// to `1e12` afterwards.
#[must_use]
pub fn mid_game_state(config: &GameConfig, earnings: f64, units: u32, levels: u32) -> GameState {
    let mut state = funded_state(config, 1e15);
    state.total_earnings = earnings;
    unlocks::refresh(config, &mut state);

    let ids: Vec<(EntityKind, String)> = config
        .races
        .iter()
        .map(|r| (EntityKind::Race, r.id.clone()))
        .chain(
            config
                .buildings
                .iter()
                .map(|b| (EntityKind::Building, b.id.clone())),
        )
        .collect();
    for (kind, id) in &ids {
        let _ = commands::execute(config, &mut state, *kind, CostAction::Purchase, id, units);
        if levels > 0 {
            let _ = commands::execute(config, &mut state, *kind, CostAction::Upgrade, id, levels);
        }
    }

    for resource in ResourceType::PRODUCIBLE {
        state.resources.set(resource, 1e12);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_config_is_valid() {
        let config = small_config();
        assert_eq!(config.races.len(), 3);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_manual_simulation_shares_clock() {
        let (sim, clock) = manual_simulation(small_config());
        clock.advance(5.0);
        assert_eq!(sim.now(), START_TIME + 5.0);
    }

    #[test]
    fn test_mid_game_state_owns_units() {
        let config = small_config();
        let state = mid_game_state(&config, 5000.0, 10, 2);
        assert!(state.player_level >= 3);
        assert_eq!(state.races["orc"].count, 10);
        assert_eq!(state.races["human"].level, 3);
        assert_eq!(state.buildings["farm"].count, 10);
        assert_eq!(state.resources.get(ResourceType::Gold), 1e12);
    }
}
