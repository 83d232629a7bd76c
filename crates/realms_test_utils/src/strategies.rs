//! Property-based testing strategies.
//!
//! Random player actions are expressed as indexes into the config tables, so
//! one strategy works for any config.

use proptest::prelude::*;
use realms_core::cost::CostAction;
use realms_core::data::GameConfig;
use realms_core::resources::{Cost, ResourceType};
use realms_core::simulation::Simulation;
use realms_core::state::EntityKind;

/// Any resource, including prestige points.
pub fn arb_resource_type() -> impl Strategy<Value = ResourceType> {
    proptest::sample::select(ResourceType::ALL.to_vec())
}

/// Any producible resource.
pub fn arb_producible_resource() -> impl Strategy<Value = ResourceType> {
    proptest::sample::select(ResourceType::PRODUCIBLE.to_vec())
}

/// A cost of one to three resources, each in `(0, max]`.
pub fn arb_cost(max: f64) -> impl Strategy<Value = Cost> {
    proptest::collection::btree_map(arb_producible_resource(), 0.01..=max, 1..=3)
        .prop_map(|map| map.into_iter().collect())
}

/// Elapsed seconds for one tick.
pub fn arb_tick_seconds() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.001..1.0f64, 1.0..600.0f64]
}

/// Kind of purchasable entity.
pub fn arb_entity_kind() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::Race),
        Just(EntityKind::Building),
        Just(EntityKind::Research),
        Just(EntityKind::PrestigeUpgrade),
    ]
}

/// One player action.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    /// Let time pass.
    Wait(f64),
    /// Buy `quantity` of the `index`-th entity of `kind`.
    Buy {
        /// Entity kind.
        kind: EntityKind,
        /// Table index, wrapped to the table length.
        index: usize,
        /// Units requested.
        quantity: u32,
    },
    /// Upgrade the `index`-th entity of `kind`.
    Upgrade {
        /// Entity kind.
        kind: EntityKind,
        /// Table index, wrapped to the table length.
        index: usize,
        /// Levels requested.
        quantity: u32,
    },
    /// Toggle the `ability`-th ability of the `race`-th race.
    Toggle {
        /// Race index, wrapped.
        race: usize,
        /// Ability index, wrapped.
        ability: usize,
    },
}

/// A random player action.
pub fn arb_player_action() -> impl Strategy<Value = PlayerAction> {
    prop_oneof![
        3 => arb_tick_seconds().prop_map(PlayerAction::Wait),
        2 => (arb_entity_kind(), any::<usize>(), 1u32..10)
            .prop_map(|(kind, index, quantity)| PlayerAction::Buy { kind, index, quantity }),
        1 => (arb_entity_kind(), any::<usize>(), 1u32..5)
            .prop_map(|(kind, index, quantity)| PlayerAction::Upgrade { kind, index, quantity }),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(race, ability)| PlayerAction::Toggle { race, ability }),
    ]
}

fn entity_id(config: &GameConfig, kind: EntityKind, index: usize) -> Option<String> {
    let ids: Vec<&str> = match kind {
        EntityKind::Race => config.races.iter().map(|r| r.id.as_str()).collect(),
        EntityKind::Building => config.buildings.iter().map(|b| b.id.as_str()).collect(),
        EntityKind::Research => config.research.iter().map(|r| r.id.as_str()).collect(),
        EntityKind::PrestigeUpgrade => config
            .prestige_upgrades
            .iter()
            .map(|u| u.id.as_str())
            .collect(),
    };
    if ids.is_empty() {
        return None;
    }
    Some(ids[index % ids.len()].to_string())
}

/// Apply `action` to `sim`. Rejected commands are ignored.
///
/// Returns whether the action changed anything beyond the passage of time.
pub fn apply_action(sim: &mut Simulation, action: &PlayerAction) -> bool {
    let config = sim.shared_config();
    match *action {
        PlayerAction::Wait(seconds) => {
            sim.advance(seconds);
            false
        }
        PlayerAction::Buy { kind, index, quantity } => entity_id(&config, kind, index)
            .is_some_and(|id| {
                let action = match kind {
                    EntityKind::Race | EntityKind::Building => CostAction::Purchase,
                    EntityKind::Research | EntityKind::PrestigeUpgrade => CostAction::Upgrade,
                };
                match action {
                    CostAction::Purchase => sim.add_entity(kind, &id, quantity).is_ok(),
                    CostAction::Upgrade => sim.upgrade_entity(kind, &id, quantity).is_ok(),
                }
            }),
        PlayerAction::Upgrade { kind, index, quantity } => entity_id(&config, kind, index)
            .is_some_and(|id| sim.upgrade_entity(kind, &id, quantity).is_ok()),
        PlayerAction::Toggle { race, ability } => {
            if config.races.is_empty() {
                return false;
            }
            let race = &config.races[race % config.races.len()];
            if race.abilities.is_empty() {
                return false;
            }
            let ability = &race.abilities[ability % race.abilities.len()];
            sim.toggle_ability(&race.id, &ability.id).is_ok()
        }
    }
}
