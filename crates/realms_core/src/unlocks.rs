//! Player level and unlock scanning.
//!
//! The player level is derived from total earnings. The scan runs every tick
//! and is idempotent: already-unlocked entities are skipped and nothing ever
//! re-locks outside of prestige.

use std::fmt;

use tracing::info;

use crate::abilities;
use crate::data::{BalanceConstants, GameConfig};
use crate::state::GameState;

/// Something that became available during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockEvent {
    /// The player level went up.
    LevelUp(u32),
    /// A race can now be recruited.
    Race(String),
    /// A race ability was unlocked and paid for.
    Ability {
        /// Race display name.
        race: String,
        /// Ability display name.
        ability: String,
    },
    /// A building can now be constructed.
    Building(String),
    /// A research is now available.
    Research(String),
}

impl fmt::Display for UnlockEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelUp(level) => write!(f, "Level up! You are now level {level}"),
            Self::Race(name) => write!(f, "New race unlocked: {name}!"),
            Self::Ability { race, ability } => {
                write!(f, "New race ability unlocked: {race} - {ability}!")
            }
            Self::Building(name) => write!(f, "New building unlocked: {name}!"),
            Self::Research(name) => write!(f, "New research unlocked: {name}!"),
        }
    }
}

/// `1 + floor(total_earnings / level_step)`.
#[must_use]
pub fn player_level_for(balance: &BalanceConstants, total_earnings: f64) -> u32 {
    let steps = (total_earnings.max(0.0) / balance.level_step).floor();
    if steps >= f64::from(u32::MAX - 1) {
        u32::MAX
    } else {
        1 + steps as u32
    }
}

fn is_open(unlock_level: u32, requires_prestige: u32, state: &GameState) -> bool {
    unlock_level <= state.player_level && state.prestige_count >= requires_prestige
}

/// Recompute the player level, then unlock races, abilities, buildings, and
/// research in that order.
pub fn refresh(config: &GameConfig, state: &mut GameState) -> Vec<UnlockEvent> {
    let mut events = Vec::new();

    let level = player_level_for(&config.balance, state.total_earnings);
    if level > state.player_level {
        state.player_level = level;
        info!(level, "Player level up");
        events.push(UnlockEvent::LevelUp(level));
    }

    for race in &config.races {
        let open = is_open(race.unlock_level, race.requires_prestige, state);
        if let Some(race_state) = state.races.get_mut(&race.id) {
            if !race_state.unlocked && open {
                race_state.unlocked = true;
                info!(race = %race.id, "Race unlocked");
                events.push(UnlockEvent::Race(race.name.clone()));
            }
        }
    }

    events.extend(abilities::check_unlocks(config, state));

    for building in &config.buildings {
        let open = is_open(building.unlock_level, building.requires_prestige, state);
        if let Some(building_state) = state.buildings.get_mut(&building.id) {
            if !building_state.unlocked && open {
                building_state.unlocked = true;
                info!(building = %building.id, "Building unlocked");
                events.push(UnlockEvent::Building(building.name.clone()));
            }
        }
    }

    for research in &config.research {
        let open = is_open(research.unlock_level, research.requires_prestige, state);
        if let Some(research_state) = state.research.get_mut(&research.id) {
            if !research_state.unlocked && open {
                research_state.unlocked = true;
                info!(research = %research.id, "Research unlocked");
                events.push(UnlockEvent::Research(research.name.clone()));
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::from_ron_str(
            r#"GameConfig(
                races: [
                    RaceData(id: "human", name: "Humans", base_cost: {"gold": 30.0}),
                    RaceData(id: "orc", name: "Orcs", base_cost: {"gold": 80.0}, unlock_level: 3),
                    RaceData(id: "fae", name: "Fae", base_cost: {"gold": 500.0},
                        unlock_level: 2, requires_prestige: 1),
                ],
                buildings: [
                    BuildingData(id: "farm", name: "Farm", base_cost: {"gold": 10.0}),
                    BuildingData(id: "library", name: "Library", base_cost: {"gold": 10.0},
                        unlock_level: 2),
                ],
                research: [
                    ResearchData(id: "tools", name: "Tools", cost: {"ancient_knowledge": 5.0},
                        max_level: 3, unlock_level: 3),
                ],
            )"#,
            "inline",
        )
        .unwrap()
    }

    #[test]
    fn test_player_level_formula() {
        let balance = BalanceConstants::default();
        assert_eq!(player_level_for(&balance, 0.0), 1);
        assert_eq!(player_level_for(&balance, 999.9), 1);
        assert_eq!(player_level_for(&balance, 1000.0), 2);
        assert_eq!(player_level_for(&balance, 25_500.0), 26);
        assert_eq!(player_level_for(&balance, -5.0), 1);
    }

    #[test]
    fn test_refresh_unlocks_in_order() {
        let config = config();
        let mut state = GameState::new(&config);
        assert!(refresh(&config, &mut state).is_empty());

        state.total_earnings = 2500.0;
        let events = refresh(&config, &mut state);
        assert_eq!(
            events,
            vec![
                UnlockEvent::LevelUp(3),
                UnlockEvent::Race("Orcs".to_string()),
                UnlockEvent::Building("Library".to_string()),
                UnlockEvent::Research("Tools".to_string()),
            ]
        );
        // Prestige-gated race stays locked.
        assert!(!state.races["fae"].unlocked);

        // Second scan is a no-op.
        assert!(refresh(&config, &mut state).is_empty());
    }

    #[test]
    fn test_prestige_gate_opens_without_level_change() {
        let config = config();
        let mut state = GameState::new(&config);
        state.total_earnings = 1500.0;
        refresh(&config, &mut state);
        assert!(!state.races["fae"].unlocked);

        state.prestige_count = 1;
        let events = refresh(&config, &mut state);
        assert_eq!(events, vec![UnlockEvent::Race("Fae".to_string())]);
    }

    #[test]
    fn test_level_never_decreases() {
        let config = config();
        let mut state = GameState::new(&config);
        state.total_earnings = 5000.0;
        refresh(&config, &mut state);
        state.total_earnings = 0.0;
        refresh(&config, &mut state);
        assert_eq!(state.player_level, 6);
        assert!(state.races["orc"].unlocked);
    }

    #[test]
    fn test_event_messages() {
        assert_eq!(
            UnlockEvent::LevelUp(4).to_string(),
            "Level up! You are now level 4"
        );
        assert_eq!(
            UnlockEvent::Building("Quarry".to_string()).to_string(),
            "New building unlocked: Quarry!"
        );
    }
}
