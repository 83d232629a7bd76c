//! Unified player interface for scripted and interactive play.
//!
//! This module defines the `PlayerFacade` trait that hosts, bots, and tests
//! use to drive a game. Everything goes through the same gated commands a
//! player has; nothing writes to the state directly.

use crate::commands::Receipt;
use crate::cost::CostAction;
use crate::data::GameConfig;
use crate::error::Result;
use crate::prestige::PrestigeOutcome;
use crate::resources::ResourceType;
use crate::simulation::{Simulation, TickEvents};
use crate::state::{EntityKind, GameState};

/// Summary of one race, building, research, or prestige upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    /// Entity kind.
    pub kind: EntityKind,
    /// Config id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owned units (always 0 for research and prestige upgrades).
    pub count: u32,
    /// Current level.
    pub level: u32,
    /// Whether the entity can be bought.
    pub unlocked: bool,
}

/// What a player can see and do.
///
/// # Command Flow
///
/// All spending goes through `buy()` and `upgrade()`, which check locks,
/// caps, and affordability before anything changes.
pub trait PlayerFacade {
    /// Advance the game by `seconds` real seconds.
    fn wait(&mut self, seconds: f64) -> TickEvents;

    /// Current balance of `resource`.
    fn resource(&self, resource: ResourceType) -> f64;

    /// Final production per second of `resource`.
    fn rate(&self, resource: ResourceType) -> f64;

    /// Every entity of `kind`, in config order.
    fn entities(&self, kind: EntityKind) -> Vec<EntityInfo>;

    /// Largest affordable quantity of `action` on `id`.
    ///
    /// # Errors
    /// Returns an error if `id` is unknown.
    fn max_affordable(&self, kind: EntityKind, action: CostAction, id: &str) -> Result<u32>;

    /// Buy `quantity` units (or research/prestige levels).
    ///
    /// # Errors
    /// Returns an error if the purchase is not allowed or not affordable.
    fn buy(&mut self, kind: EntityKind, id: &str, quantity: u32) -> Result<Receipt>;

    /// Raise the level by `quantity`.
    ///
    /// # Errors
    /// Returns an error if the upgrade is not allowed or not affordable.
    fn upgrade(&mut self, kind: EntityKind, id: &str, quantity: u32) -> Result<Receipt>;

    /// Flip an unlocked ability.
    ///
    /// # Errors
    /// Returns an error if the ability is unknown or locked.
    fn toggle_ability(&mut self, race: &str, ability: &str) -> Result<bool>;

    /// Points a prestige would award now.
    fn potential_prestige_points(&self) -> u32;

    /// Reset for prestige points.
    ///
    /// # Errors
    /// Returns an error if no points would be earned.
    fn prestige(&mut self) -> Result<PrestigeOutcome>;

    /// Buy as many as currently affordable. `Ok(None)` if that is zero.
    ///
    /// Convenience method for auto-buyers.
    fn buy_max(&mut self, kind: EntityKind, action: CostAction, id: &str) -> Result<Option<Receipt>> {
        let quantity = self.max_affordable(kind, action, id)?;
        if quantity == 0 {
            return Ok(None);
        }
        match action {
            CostAction::Purchase => self.buy(kind, id, quantity).map(Some),
            CostAction::Upgrade => self.upgrade(kind, id, quantity).map(Some),
        }
    }
}

/// Implementation of [`PlayerFacade`] over a [`Simulation`].
pub struct SimulationPlayerFacade<'a> {
    sim: &'a mut Simulation,
}

impl<'a> SimulationPlayerFacade<'a> {
    /// Create a facade for `sim`.
    pub fn new(sim: &'a mut Simulation) -> Self {
        Self { sim }
    }

    /// Get a reference to the underlying simulation.
    ///
    /// Use sparingly - prefer facade methods for bot code.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        self.sim
    }
}

fn entity_infos(config: &GameConfig, state: &GameState, kind: EntityKind) -> Vec<EntityInfo> {
    let info = |id: &str, name: &str, count: u32, level: u32, unlocked: bool| EntityInfo {
        kind,
        id: id.to_string(),
        name: name.to_string(),
        count,
        level,
        unlocked,
    };
    match kind {
        EntityKind::Race => config
            .races
            .iter()
            .filter_map(|r| {
                let s = state.races.get(&r.id)?;
                Some(info(&r.id, &r.name, s.count, s.level, s.unlocked))
            })
            .collect(),
        EntityKind::Building => config
            .buildings
            .iter()
            .filter_map(|b| {
                let s = state.buildings.get(&b.id)?;
                Some(info(&b.id, &b.name, s.count, s.level, s.unlocked))
            })
            .collect(),
        EntityKind::Research => config
            .research
            .iter()
            .filter_map(|r| {
                let s = state.research.get(&r.id)?;
                Some(info(&r.id, &r.name, 0, s.level, s.unlocked))
            })
            .collect(),
        EntityKind::PrestigeUpgrade => config
            .prestige_upgrades
            .iter()
            .map(|u| info(&u.id, &u.name, 0, state.prestige_upgrade_level(&u.id), true))
            .collect(),
    }
}

impl PlayerFacade for SimulationPlayerFacade<'_> {
    fn wait(&mut self, seconds: f64) -> TickEvents {
        self.sim.advance(seconds)
    }

    fn resource(&self, resource: ResourceType) -> f64 {
        self.sim.state().resources.get(resource)
    }

    fn rate(&self, resource: ResourceType) -> f64 {
        self.sim.resource_rate(resource)
    }

    fn entities(&self, kind: EntityKind) -> Vec<EntityInfo> {
        entity_infos(self.sim.config(), self.sim.state(), kind)
    }

    fn max_affordable(&self, kind: EntityKind, action: CostAction, id: &str) -> Result<u32> {
        self.sim.max_affordable(kind, action, id)
    }

    fn buy(&mut self, kind: EntityKind, id: &str, quantity: u32) -> Result<Receipt> {
        self.sim.add_entity(kind, id, quantity)
    }

    fn upgrade(&mut self, kind: EntityKind, id: &str, quantity: u32) -> Result<Receipt> {
        self.sim.upgrade_entity(kind, id, quantity)
    }

    fn toggle_ability(&mut self, race: &str, ability: &str) -> Result<bool> {
        self.sim.toggle_ability(race, ability)
    }

    fn potential_prestige_points(&self) -> u32 {
        self.sim.potential_prestige_points()
    }

    fn prestige(&mut self) -> Result<PrestigeOutcome> {
        self.sim.perform_prestige()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;

    fn sim() -> Simulation {
        let config = GameConfig::from_ron_str(
            r#"GameConfig(
                races: [
                    RaceData(id: "human", name: "Humans", base_cost: {"gold": 10.0},
                        resource_bonuses: {"gold": 1.0}),
                    RaceData(id: "orc", name: "Orcs", base_cost: {"gold": 80.0}, unlock_level: 4),
                ],
            )"#,
            "inline",
        )
        .unwrap();
        Simulation::with_clock(Arc::new(config), ManualClock::new(0.0), 1)
    }

    #[test]
    fn test_buy_max_spends_down() {
        let mut sim = sim();
        let mut facade = SimulationPlayerFacade::new(&mut sim);
        // Six units cost 82.5 in total; the seventh costs 19.
        let receipt = facade
            .buy_max(EntityKind::Race, CostAction::Purchase, "human")
            .unwrap()
            .unwrap();
        assert_eq!(receipt.quantity, 6);
        assert!(facade.resource(ResourceType::Gold) < 17.5 + 1e-9);
        assert_eq!(facade.rate(ResourceType::Gold), 6.0);
    }

    #[test]
    fn test_buy_max_none_when_broke() {
        let mut sim = sim();
        let mut facade = SimulationPlayerFacade::new(&mut sim);
        facade
            .buy_max(EntityKind::Race, CostAction::Purchase, "human")
            .unwrap();
        assert_eq!(
            facade
                .buy_max(EntityKind::Race, CostAction::Purchase, "human")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_entities_report_lock_state() {
        let mut sim = sim();
        let facade = SimulationPlayerFacade::new(&mut sim);
        let races = facade.entities(EntityKind::Race);
        assert_eq!(races.len(), 2);
        assert_eq!(races[0].name, "Humans");
        assert!(races[0].unlocked);
        assert!(!races[1].unlocked);
        assert!(facade.simulation().state().races.contains_key("orc"));
    }
}
