//! Race ability state machine.
//!
//! Each (race, ability) pair moves `Locked -> Inactive <-> Active`. Unlocking
//! is a one-time purchase checked during the unlock scan; toggling is free and
//! only allowed once unlocked. Only active abilities on producing races have
//! any effect.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{AbilityEffect, GameConfig, RaceData};
use crate::error::{GameError, Result};
use crate::state::{EntityKind, GameState, RaceState};
use crate::unlocks::UnlockEvent;

/// Observable status of one ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityStatus {
    /// Requirements not yet met.
    Locked,
    /// Unlocked, switched off.
    Inactive,
    /// Unlocked and switched on.
    Active,
}

/// Status of `ability` on `race`, or `None` if either is unknown.
#[must_use]
pub fn status(state: &GameState, race: &str, ability: &str) -> Option<AbilityStatus> {
    let flags = state.races.get(race)?.abilities.get(ability)?;
    Some(match (flags.unlocked, flags.active) {
        (false, _) => AbilityStatus::Locked,
        (true, false) => AbilityStatus::Inactive,
        (true, true) => AbilityStatus::Active,
    })
}

/// Every effect of every active ability on a producing race, in table order.
pub fn active_effects<'a>(
    config: &'a GameConfig,
    state: &'a GameState,
) -> impl Iterator<Item = (&'a RaceData, &'a RaceState, &'a AbilityEffect)> + 'a {
    config.races.iter().flat_map(move |race| {
        let race_state = state.races.get(&race.id).filter(|rs| rs.is_producing());
        race.abilities
            .iter()
            .filter(move |ability| race_state.is_some_and(|rs| rs.is_ability_active(&ability.id)))
            .flat_map(move |ability| ability.effects.iter())
            .filter_map(move |effect| race_state.map(|rs| (race, rs, effect)))
    })
}

/// Unlock every ability whose requirements now hold, spending its resources.
///
/// Only producing races are considered. Abilities are checked in table order,
/// so an earlier unlock may leave too little for a later one.
pub fn check_unlocks(config: &GameConfig, state: &mut GameState) -> Vec<UnlockEvent> {
    let mut events = Vec::new();
    for race in &config.races {
        for ability in &race.abilities {
            let Some(race_state) = state.races.get(&race.id) else {
                continue;
            };
            if !race_state.is_producing() {
                break;
            }
            let unlocked = race_state
                .abilities
                .get(&ability.id)
                .is_some_and(|a| a.unlocked);
            let req = &ability.requirements;
            if unlocked
                || race_state.level < req.race_level
                || state.prestige_count < req.prestige_level
            {
                continue;
            }
            if state.resources.spend(&req.resources).is_err() {
                continue;
            }
            if let Some(race_state) = state.races.get_mut(&race.id) {
                race_state
                    .abilities
                    .entry(ability.id.clone())
                    .or_default()
                    .unlocked = true;
            }
            info!(race = %race.id, ability = %ability.id, "Race ability unlocked");
            events.push(UnlockEvent::Ability {
                race: race.name.clone(),
                ability: ability.name.clone(),
            });
        }
    }
    events
}

/// Flip an unlocked ability on or off. Returns the new active flag.
///
/// # Errors
///
/// Returns [`GameError::InvalidEntityId`] for an unknown race or ability, and
/// [`GameError::AbilityLocked`] if the ability is not unlocked yet.
pub fn toggle(config: &GameConfig, state: &mut GameState, race: &str, ability: &str) -> Result<bool> {
    let known = config
        .race(race)
        .is_some_and(|r| r.ability(ability).is_some());
    let flags = state
        .races
        .get_mut(race)
        .and_then(|rs| rs.abilities.get_mut(ability))
        .filter(|_| known)
        .ok_or_else(|| GameError::InvalidEntityId {
            kind: EntityKind::Race,
            id: format!("{race}/{ability}"),
        })?;
    if !flags.unlocked {
        return Err(GameError::AbilityLocked {
            race: race.to_string(),
            ability: ability.to_string(),
        });
    }
    flags.active = !flags.active;
    debug!(race, ability, active = flags.active, "Ability toggled");
    Ok(flags.active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceType;

    fn config() -> GameConfig {
        GameConfig::from_ron_str(
            r#"GameConfig(
                races: [
                    RaceData(
                        id: "elf",
                        name: "Elves",
                        base_cost: {"gold": 50.0},
                        resource_bonuses: {"wood": 1.5},
                        abilities: [
                            AbilityData(
                                id: "ancient_grove",
                                name: "Ancient Grove",
                                effects: [ResourceMultiplier(resource: "wood", factor: 3.0)],
                                requirements: AbilityRequirements(
                                    race_level: 2,
                                    resources: {"wood": 100.0},
                                ),
                            ),
                            AbilityData(
                                id: "nature_harmony",
                                name: "Nature's Harmony",
                                effects: [PassiveGeneration(rate: 0.01)],
                                requirements: AbilityRequirements(race_level: 2, prestige_level: 1),
                            ),
                        ],
                    ),
                ],
            )"#,
            "inline",
        )
        .unwrap()
    }

    #[test]
    fn test_unlock_requires_level_prestige_and_resources() {
        let config = config();
        let mut state = GameState::new(&config);
        state.resources.set(ResourceType::Wood, 150.0);

        // Not owned yet.
        assert!(check_unlocks(&config, &mut state).is_empty());

        state.races.get_mut("elf").unwrap().count = 1;
        assert!(check_unlocks(&config, &mut state).is_empty());

        state.races.get_mut("elf").unwrap().level = 2;
        let events = check_unlocks(&config, &mut state);
        assert_eq!(events.len(), 1);
        assert_eq!(status(&state, "elf", "ancient_grove"), Some(AbilityStatus::Inactive));
        assert_eq!(status(&state, "elf", "nature_harmony"), Some(AbilityStatus::Locked));
        assert_eq!(state.resources.get(ResourceType::Wood), 50.0);

        // Idempotent: nothing is spent twice.
        assert!(check_unlocks(&config, &mut state).is_empty());
        assert_eq!(state.resources.get(ResourceType::Wood), 50.0);
    }

    #[test]
    fn test_toggle_state_machine() {
        let config = config();
        let mut state = GameState::new(&config);
        assert!(matches!(
            toggle(&config, &mut state, "elf", "ancient_grove"),
            Err(GameError::AbilityLocked { .. })
        ));
        assert!(matches!(
            toggle(&config, &mut state, "elf", "missing"),
            Err(GameError::InvalidEntityId { .. })
        ));

        state
            .races
            .get_mut("elf")
            .unwrap()
            .abilities
            .get_mut("ancient_grove")
            .unwrap()
            .unlocked = true;
        assert_eq!(toggle(&config, &mut state, "elf", "ancient_grove"), Ok(true));
        assert_eq!(status(&state, "elf", "ancient_grove"), Some(AbilityStatus::Active));
        assert_eq!(toggle(&config, &mut state, "elf", "ancient_grove"), Ok(false));
    }

    #[test]
    fn test_active_effects_need_owned_race() {
        let config = config();
        let mut state = GameState::new(&config);
        {
            let elf = state.races.get_mut("elf").unwrap();
            let grove = elf.abilities.get_mut("ancient_grove").unwrap();
            grove.unlocked = true;
            grove.active = true;
        }
        assert_eq!(active_effects(&config, &state).count(), 0);
        state.races.get_mut("elf").unwrap().count = 3;
        let effects: Vec<_> = active_effects(&config, &state).collect();
        assert_eq!(effects.len(), 1);
        assert_eq!(
            effects[0].2,
            &AbilityEffect::ResourceMultiplier {
                resource: ResourceType::Wood,
                factor: 3.0
            }
        );
    }
}
