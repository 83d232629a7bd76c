//! Achievement evaluation and reward lookups.
//!
//! Milestones are evaluated fresh every tick against the current state.
//! Completed milestones are skipped, so rewards are never granted twice.
//! Rewards are not stored anywhere: multipliers are recomputed from the
//! completed set whenever they are needed.

use tracing::info;

use crate::data::{
    AchievementCategory, AchievementData, AchievementRequirement, AchievementReward, GameConfig,
};
use crate::resources::ResourceType;
use crate::state::GameState;

/// Whether `requirement` holds for `state`. All fields must hold at once.
#[must_use]
pub fn is_met(requirement: &AchievementRequirement, state: &GameState) -> bool {
    match requirement {
        AchievementRequirement::Resources(cost) => state.resources.can_afford(cost),
        AchievementRequirement::RaceCount { race, count } => {
            state.races.get(race).is_some_and(|r| r.count >= *count)
        }
        AchievementRequirement::AllRaces { count } => state
            .races
            .values()
            .filter(|r| r.unlocked)
            .all(|r| r.count >= *count),
        AchievementRequirement::AnyBuilding { count } => {
            state.buildings.values().any(|b| b.count >= *count)
        }
        AchievementRequirement::AnyBuildingLevel { level } => state
            .buildings
            .values()
            .any(|b| b.count > 0 && b.level >= *level),
        AchievementRequirement::AllBuildingsLevel { level } => {
            let mut owned = state.buildings.values().filter(|b| b.is_producing()).peekable();
            owned.peek().is_some() && owned.all(|b| b.level >= *level)
        }
        AchievementRequirement::BuildingCount { building, count } => state
            .buildings
            .get(building)
            .is_some_and(|b| b.count >= *count),
        AchievementRequirement::PrestigeCount { count } => state.prestige_count >= *count,
        AchievementRequirement::PlayTime { seconds } => state.total_play_time >= *seconds,
        AchievementRequirement::RaceSkill {
            race,
            resource,
            amount,
            player_level,
            prestige_level,
        } => {
            gates_hold(state, *player_level, *prestige_level)
                && state
                    .races
                    .get(race)
                    .is_some_and(|r| r.unlocked && r.skill(*resource) >= *amount)
        }
        AchievementRequirement::RaceSkillAllResources {
            race,
            amount,
            player_level,
            prestige_level,
        } => {
            gates_hold(state, *player_level, *prestige_level)
                && state.races.get(race).is_some_and(|r| {
                    r.unlocked
                        && ResourceType::PRODUCIBLE
                            .into_iter()
                            .all(|res| r.skill(res) >= *amount)
                })
        }
        AchievementRequirement::SpeedRun {
            player_level,
            max_play_time,
        } => state.player_level >= *player_level && state.total_play_time <= *max_play_time,
    }
}

fn gates_hold(state: &GameState, player_level: u32, prestige_level: u32) -> bool {
    state.player_level >= player_level && state.prestige_count >= prestige_level
}

fn is_complete(state: &GameState, achievement: &AchievementData) -> bool {
    state
        .achievements
        .get(&achievement.category)
        .and_then(|flags| flags.get(&achievement.id))
        .copied()
        .unwrap_or(false)
}

/// Mark every newly satisfied milestone complete and return them.
///
/// Categories are scanned in [`AchievementCategory::ALL`] order, milestones in
/// table order.
pub fn evaluate<'a>(config: &'a GameConfig, state: &mut GameState) -> Vec<&'a AchievementData> {
    let mut completed = Vec::new();
    for category in AchievementCategory::ALL {
        completed.extend(evaluate_category(config, state, category));
    }
    completed
}

/// Mark newly satisfied milestones of one category complete and return them.
pub fn evaluate_category<'a>(
    config: &'a GameConfig,
    state: &mut GameState,
    category: AchievementCategory,
) -> Vec<&'a AchievementData> {
    let mut completed = Vec::new();
    for achievement in config.achievements_in(category) {
        if is_complete(state, achievement) || !is_met(&achievement.requirement, state) {
            continue;
        }
        state
            .achievements
            .entry(category)
            .or_default()
            .insert(achievement.id.clone(), true);
        info!(achievement = %achievement.id, %category, "Achievement completed");
        completed.push(achievement);
    }
    completed
}

/// Rewards of every completed achievement, in table order.
pub fn completed_rewards<'a>(
    config: &'a GameConfig,
    state: &'a GameState,
) -> impl Iterator<Item = &'a AchievementReward> + 'a {
    config
        .achievements
        .iter()
        .filter(move |a| is_complete(state, a))
        .flat_map(|a| a.rewards.iter())
}

/// Product of `ResourceMultiplier` and `AllProduction` rewards for `resource`.
#[must_use]
pub fn production_multiplier(config: &GameConfig, state: &GameState, resource: ResourceType) -> f64 {
    completed_rewards(config, state)
        .map(|reward| match reward {
            AchievementReward::ResourceMultiplier { resource: r, factor } if *r == resource => {
                *factor
            }
            AchievementReward::AllProduction { factor } if resource.is_producible() => *factor,
            _ => 1.0,
        })
        .product()
}

/// Product of `AllRaceEfficiency` rewards.
#[must_use]
pub fn race_efficiency(config: &GameConfig, state: &GameState) -> f64 {
    completed_rewards(config, state)
        .map(|reward| match reward {
            AchievementReward::AllRaceEfficiency { factor } => *factor,
            _ => 1.0,
        })
        .product()
}

/// Product of the race-specific rewards for `race` producing `resource`.
#[must_use]
pub fn race_skill_multiplier(
    config: &GameConfig,
    state: &GameState,
    race: &str,
    resource: ResourceType,
) -> f64 {
    completed_rewards(config, state)
        .map(|reward| match reward {
            AchievementReward::RaceResourceBonus {
                race: r,
                resource: res,
                factor,
            } if r == race && *res == resource => *factor,
            AchievementReward::RaceEfficiency { race: r, factor } if r == race => *factor,
            _ => 1.0,
        })
        .product()
}

/// Product of `BuildingCostReduction` rewards.
#[must_use]
pub fn building_cost_factor(config: &GameConfig, state: &GameState) -> f64 {
    completed_rewards(config, state)
        .map(|reward| match reward {
            AchievementReward::BuildingCostReduction { factor } => *factor,
            _ => 1.0,
        })
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::from_ron_str(
            r#"GameConfig(
                races: [
                    RaceData(id: "dwarf", name: "Dwarves", base_cost: {"gold": 50.0},
                        resource_bonuses: {"gold": 1.2, "stone": 1.5}),
                    RaceData(id: "orc", name: "Orcs", base_cost: {"gold": 80.0}, unlock_level: 5),
                ],
                buildings: [
                    BuildingData(id: "farm", name: "Farm", base_cost: {"gold": 10.0}),
                    BuildingData(id: "quarry", name: "Quarry", base_cost: {"gold": 100.0}),
                ],
                achievements: [
                    AchievementData(
                        id: "first_gold",
                        name: "Pocket Change",
                        category: resource_milestones,
                        requirement: Resources({"gold": 1000.0}),
                        rewards: [ResourceMultiplier(resource: "gold", factor: 1.1)],
                    ),
                    AchievementData(
                        id: "first_building",
                        name: "Architect",
                        category: building_milestones,
                        requirement: AnyBuilding(count: 1),
                        rewards: [BuildingCostReduction(factor: 0.95)],
                    ),
                    AchievementData(
                        id: "master_builder",
                        name: "Master Builder",
                        category: building_milestones,
                        requirement: AllBuildingsLevel(level: 3),
                        rewards: [AllProduction(factor: 1.2)],
                    ),
                    AchievementData(
                        id: "dwarf_miner",
                        name: "Deep Miner",
                        category: race_skill_milestones,
                        requirement: RaceSkill(race: "dwarf", resource: "stone", amount: 500.0,
                            player_level: 2),
                        rewards: [
                            RaceResourceBonus(race: "dwarf", resource: "stone", factor: 1.5),
                            RaceEfficiency(race: "dwarf", factor: 1.1),
                        ],
                    ),
                    AchievementData(
                        id: "hordes",
                        name: "Hordes",
                        category: race_milestones,
                        requirement: AllRaces(count: 2),
                        rewards: [AllRaceEfficiency(factor: 1.25)],
                    ),
                ],
            )"#,
            "inline",
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = config();
        let mut state = GameState::new(&config);
        state.resources.set(ResourceType::Gold, 999.0);
        assert!(evaluate(&config, &mut state).is_empty());
        state.resources.set(ResourceType::Gold, 1000.0);
        let done = evaluate(&config, &mut state);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "first_gold");
        assert!(state.has_achievement("first_gold"));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let config = config();
        let mut state = GameState::new(&config);
        state.resources.set(ResourceType::Gold, 5000.0);
        state.buildings.get_mut("farm").unwrap().count = 1;
        assert_eq!(evaluate(&config, &mut state).len(), 2);
        let snapshot = state.clone();
        assert!(evaluate(&config, &mut state).is_empty());
        assert_eq!(state, snapshot);
        assert!((production_multiplier(&config, &state, ResourceType::Gold) - 1.1).abs() < 1e-12);
        assert_eq!(building_cost_factor(&config, &state), 0.95);
    }

    #[test]
    fn test_completed_stays_complete_when_predicate_fails() {
        let config = config();
        let mut state = GameState::new(&config);
        state.resources.set(ResourceType::Gold, 1000.0);
        evaluate(&config, &mut state);
        state.resources.set(ResourceType::Gold, 0.0);
        evaluate(&config, &mut state);
        assert!(state.has_achievement("first_gold"));
    }

    #[test]
    fn test_all_buildings_level_needs_an_owned_building() {
        let config = config();
        let mut state = GameState::new(&config);
        let requirement = AchievementRequirement::AllBuildingsLevel { level: 3 };
        assert!(!is_met(&requirement, &state));

        let farm = state.buildings.get_mut("farm").unwrap();
        farm.count = 2;
        farm.level = 3;
        assert!(is_met(&requirement, &state));

        state.buildings.get_mut("quarry").unwrap().count = 1;
        assert!(!is_met(&requirement, &state));
    }

    #[test]
    fn test_race_skill_needs_every_gate() {
        let config = config();
        let mut state = GameState::new(&config);
        state
            .races
            .get_mut("dwarf")
            .unwrap()
            .skills
            .insert(ResourceType::Stone, 600.0);
        assert!(evaluate(&config, &mut state).is_empty());

        state.player_level = 2;
        let done = evaluate(&config, &mut state);
        assert_eq!(done.len(), 1);
        let stone = race_skill_multiplier(&config, &state, "dwarf", ResourceType::Stone);
        let gold = race_skill_multiplier(&config, &state, "dwarf", ResourceType::Gold);
        assert!((stone - 1.65).abs() < 1e-12);
        assert!((gold - 1.1).abs() < 1e-12);
        assert_eq!(race_skill_multiplier(&config, &state, "orc", ResourceType::Stone), 1.0);
    }

    #[test]
    fn test_all_races_ignores_locked_races() {
        let config = config();
        let mut state = GameState::new(&config);
        state.races.get_mut("dwarf").unwrap().count = 2;
        evaluate(&config, &mut state);
        assert!(state.has_achievement("hordes"));
        assert_eq!(race_efficiency(&config, &state), 1.25);
    }
}
