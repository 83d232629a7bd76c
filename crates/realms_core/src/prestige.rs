//! Prestige transition and prestige upgrade effects.
//!
//! Prestige trades total earnings for prestige points. The reset wipes
//! races, buildings, research, and most resources, but keeps prestige
//! points, permanent multipliers, prestige upgrade levels, achievements,
//! race skills, and play time.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{BalanceConstants, GameConfig, PrestigeEffect, PrestigeUpgradeData};
use crate::error::{GameError, Result};
use crate::resources::{MultiplierTarget, ResourcePool, ResourceType};
use crate::state::GameState;

/// Prestige points available for `total_earnings`.
///
/// Zero below the base requirement, then one more point each time earnings
/// reach another multiple of `prestige_scaling`. Thresholds are stepped by
/// repeated multiplication so exact powers land on the higher count.
#[must_use]
pub fn potential_points(balance: &BalanceConstants, total_earnings: f64) -> u32 {
    let base = balance.prestige_requirement_base;
    if !total_earnings.is_finite() || total_earnings < base {
        return 0;
    }
    let mut points = 1;
    let mut threshold = base * balance.prestige_scaling;
    while total_earnings >= threshold && threshold.is_finite() {
        points += 1;
        threshold *= balance.prestige_scaling;
    }
    points
}

/// Sum of `select(effect) * level` over every owned prestige upgrade.
pub fn upgrade_sum(
    config: &GameConfig,
    state: &GameState,
    select: impl Fn(&PrestigeEffect) -> Option<f64> + Copy,
) -> f64 {
    config
        .prestige_upgrades
        .iter()
        .map(|upgrade| upgrade.per_level_sum(state.prestige_upgrade_level(&upgrade.id), select))
        .sum()
}

/// Share of offline time simulated on load.
#[must_use]
pub fn offline_rate(config: &GameConfig, state: &GameState) -> f64 {
    let owned = upgrade_sum(config, state, |effect| match effect {
        PrestigeEffect::OfflineProgress { rate } => Some(*rate),
        _ => None,
    });
    if owned > 0.0 {
        owned
    } else {
        config.balance.offline_progress_rate
    }
}

/// Elapsed-time multiplier while a time warp runs.
#[must_use]
pub fn time_warp_multiplier(config: &GameConfig, state: &GameState) -> f64 {
    config.balance.time_warp_multiplier
        + upgrade_sum(config, state, |effect| match effect {
            PrestigeEffect::TimeWarpBoost { amount } => Some(*amount),
            _ => None,
        })
}

/// Apply the one-off effects of buying `levels` levels of `upgrade`.
pub fn apply_upgrade_levels(upgrade: &PrestigeUpgradeData, levels: u32, state: &mut GameState) {
    let entry = state
        .prestige_upgrades
        .entry(upgrade.id.clone())
        .or_default();
    entry.level += levels;
    for effect in &upgrade.effects {
        if let PrestigeEffect::PermanentMultiplier { factor } = effect {
            let all = state
                .permanent_multipliers
                .entry(MultiplierTarget::All)
                .or_insert(1.0);
            *all *= factor.powf(f64::from(levels));
        }
    }
}

/// Result of a completed prestige.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrestigeOutcome {
    /// Points awarded.
    pub points: u32,
    /// Prestige count after the reset.
    pub prestige_count: u32,
}

fn retained_resources(config: &GameConfig, state: &GameState) -> ResourcePool {
    let knowledge = upgrade_sum(config, state, |effect| match effect {
        PrestigeEffect::KnowledgeRetention { fraction } => Some(*fraction),
        _ => None,
    })
    .min(1.0);
    let general = upgrade_sum(config, state, |effect| match effect {
        PrestigeEffect::ResourceRetention { fraction } => Some(*fraction),
        _ => None,
    })
    .min(1.0);
    let starting_bonus = upgrade_sum(config, state, |effect| match effect {
        PrestigeEffect::StartingGold { amount } => Some(*amount),
        _ => None,
    });

    let mut pool = ResourcePool::new();
    for resource in ResourceType::PRODUCIBLE {
        let share = if resource == ResourceType::AncientKnowledge {
            knowledge
        } else {
            general
        };
        pool.set(resource, state.resources.get(resource) * share);
    }
    pool.add(ResourceType::Gold, config.balance.starting_gold + starting_bonus);
    pool.set(ResourceType::PrestigePoints, state.prestige_points());
    pool
}

/// Perform a prestige reset.
///
/// # Errors
///
/// Returns [`GameError::PrestigeNotAvailable`] if no points would be earned.
/// The state is untouched in that case.
pub fn perform(config: &GameConfig, state: &mut GameState) -> Result<PrestigeOutcome> {
    let points = potential_points(&config.balance, state.total_earnings);
    if points == 0 {
        return Err(GameError::PrestigeNotAvailable);
    }

    let mut resources = retained_resources(config, state);
    resources.add(ResourceType::PrestigePoints, f64::from(points));

    state.resources = resources;
    state.total_prestige_points += f64::from(points);
    state.prestige_count += 1;
    state.total_earnings = 0.0;
    state.player_level = 1;
    state.reset_progression(config);

    info!(
        points,
        prestige_count = state.prestige_count,
        "Prestige performed"
    );
    Ok(PrestigeOutcome {
        points,
        prestige_count: state.prestige_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::from_ron_str(
            r#"GameConfig(
                races: [
                    RaceData(id: "human", name: "Humans", base_cost: {"gold": 30.0},
                        resource_bonuses: {"food": 1.3},
                        abilities: [AbilityData(id: "trade", name: "Trade",
                            effects: [PerUnitBonus(bonus: 0.1)])]),
                    RaceData(id: "fae", name: "Fae", base_cost: {"gold": 500.0},
                        requires_prestige: 1),
                ],
                prestige_upgrades: [
                    PrestigeUpgradeData(id: "insight", name: "Insight",
                        cost: {"prestige_points": 1.0}, cost_scaling: 2.0, max_level: 10,
                        effects: [PermanentMultiplier(factor: 1.1)]),
                    PrestigeUpgradeData(id: "memory", name: "Memory",
                        cost: {"prestige_points": 3.0}, max_level: 5,
                        effects: [KnowledgeRetention(fraction: 0.3), ResourceRetention(fraction: 0.05)]),
                    PrestigeUpgradeData(id: "vaults", name: "Vaults",
                        cost: {"prestige_points": 2.0}, max_level: 5,
                        effects: [StartingGold(amount: 500.0)]),
                    PrestigeUpgradeData(id: "dreams", name: "Dreams",
                        cost: {"prestige_points": 2.0}, max_level: 3,
                        effects: [OfflineProgress(rate: 0.2), TimeWarpBoost(amount: 0.5)]),
                ],
            )"#,
            "inline",
        )
        .unwrap()
    }

    fn level(state: &mut GameState, id: &str, level: u32) {
        state.prestige_upgrades.get_mut(id).unwrap().level = level;
    }

    #[test]
    fn test_potential_points_thresholds() {
        let balance = BalanceConstants::default();
        assert_eq!(potential_points(&balance, 0.0), 0);
        assert_eq!(potential_points(&balance, 999_999.0), 0);
        assert_eq!(potential_points(&balance, 1_000_000.0), 1);
        assert_eq!(potential_points(&balance, 4_999_999.0), 1);
        assert_eq!(potential_points(&balance, 5_000_000.0), 2);
        assert_eq!(potential_points(&balance, 25_000_000.0), 3);
        assert_eq!(potential_points(&balance, f64::NAN), 0);
    }

    #[test]
    fn test_prestige_rejected_below_requirement() {
        let config = config();
        let mut state = GameState::new(&config);
        state.total_earnings = 999_999.0;
        let before = state.clone();
        assert_eq!(perform(&config, &mut state), Err(GameError::PrestigeNotAvailable));
        assert_eq!(state, before);
    }

    #[test]
    fn test_prestige_resets_and_keeps() {
        let config = config();
        let mut state = GameState::new(&config);
        state.total_earnings = 5_000_000.0;
        state.player_level = 5001;
        state.total_play_time = 1234.0;
        state.resources.set(ResourceType::Gold, 9000.0);
        state.resources.set(ResourceType::Wood, 400.0);
        state.resources.set(ResourceType::PrestigePoints, 3.0);
        level(&mut state, "insight", 2);
        {
            let human = state.races.get_mut("human").unwrap();
            human.count = 20;
            human.level = 4;
            human.skills.insert(ResourceType::Food, 77.0);
            human.abilities.get_mut("trade").unwrap().unlocked = true;
        }
        state
            .permanent_multipliers
            .insert(MultiplierTarget::All, 1.21);

        let outcome = perform(&config, &mut state).unwrap();
        assert_eq!(outcome, PrestigeOutcome { points: 2, prestige_count: 1 });

        assert_eq!(state.prestige_points(), 5.0);
        assert_eq!(state.total_prestige_points, 2.0);
        assert_eq!(state.total_earnings, 0.0);
        assert_eq!(state.player_level, 1);
        assert_eq!(state.resources.get(ResourceType::Gold), 100.0);
        assert_eq!(state.resources.get(ResourceType::Wood), 0.0);
        assert_eq!(state.total_play_time, 1234.0);
        assert_eq!(state.prestige_upgrade_level("insight"), 2);
        assert_eq!(state.permanent_multipliers[&MultiplierTarget::All], 1.21);

        let human = &state.races["human"];
        assert_eq!(human.count, 0);
        assert_eq!(human.level, 1);
        assert_eq!(human.skill(ResourceType::Food), 77.0);
        assert!(!human.abilities["trade"].unlocked);
        // Prestige-gated content opens against the new count.
        assert!(state.races["fae"].unlocked);
    }

    #[test]
    fn test_retention_upgrades() {
        let config = config();
        let mut state = GameState::new(&config);
        state.total_earnings = 1_000_000.0;
        state.resources.set(ResourceType::Gold, 1000.0);
        state.resources.set(ResourceType::Stone, 200.0);
        state.resources.set(ResourceType::AncientKnowledge, 50.0);
        level(&mut state, "memory", 2);
        level(&mut state, "vaults", 3);

        perform(&config, &mut state).unwrap();
        // 100 starting + 1500 bonus + 10% of 1000
        assert!((state.resources.get(ResourceType::Gold) - 1700.0).abs() < 1e-9);
        assert!((state.resources.get(ResourceType::Stone) - 20.0).abs() < 1e-9);
        assert!((state.resources.get(ResourceType::AncientKnowledge) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_knowledge_retention_caps_at_everything() {
        let config = config();
        let mut state = GameState::new(&config);
        state.total_earnings = 1_000_000.0;
        state.resources.set(ResourceType::AncientKnowledge, 50.0);
        level(&mut state, "memory", 5);
        perform(&config, &mut state).unwrap();
        assert_eq!(state.resources.get(ResourceType::AncientKnowledge), 50.0);
    }

    #[test]
    fn test_offline_rate_and_warp_multiplier() {
        let config = config();
        let mut state = GameState::new(&config);
        assert_eq!(offline_rate(&config, &state), 0.5);
        assert_eq!(time_warp_multiplier(&config, &state), 2.0);
        level(&mut state, "dreams", 2);
        assert!((offline_rate(&config, &state) - 0.4).abs() < 1e-12);
        assert_eq!(time_warp_multiplier(&config, &state), 3.0);
    }

    #[test]
    fn test_permanent_multiplier_compounds_per_level() {
        let config = config();
        let mut state = GameState::new(&config);
        let insight = config.prestige_upgrade("insight").unwrap();
        apply_upgrade_levels(insight, 2, &mut state);
        assert_eq!(state.prestige_upgrade_level("insight"), 2);
        let all = state.permanent_multipliers[&MultiplierTarget::All];
        assert!((all - 1.21).abs() < 1e-12);
    }
}
