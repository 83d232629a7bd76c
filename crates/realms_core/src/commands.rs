//! Spending commands: recruiting, constructing, upgrading, researching.
//!
//! Every command is gated by [`cost::pricing`] and [`ResourcePool::spend`]:
//! either the whole bulk price is paid and the entity changes, or nothing
//! happens and an error is returned.
//!
//! [`ResourcePool::spend`]: crate::resources::ResourcePool::spend

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::{self, CostAction};
use crate::data::GameConfig;
use crate::error::{GameError, Result};
use crate::prestige;
use crate::resources::Cost;
use crate::state::{EntityKind, GameState};

/// What a successful command bought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Units or levels gained. May be less than requested at a cap.
    pub quantity: u32,
    /// Resources spent.
    pub cost: Cost,
}

fn check_available(state: &GameState, kind: EntityKind, action: CostAction, id: &str) -> Result<()> {
    let (unlocked, owned) = match kind {
        EntityKind::Race => state
            .races
            .get(id)
            .map_or((false, false), |r| (r.unlocked, r.count > 0)),
        EntityKind::Building => state
            .buildings
            .get(id)
            .map_or((false, false), |b| (b.unlocked, b.count > 0)),
        EntityKind::Research => state
            .research
            .get(id)
            .map_or((false, false), |r| (r.unlocked, true)),
        EntityKind::PrestigeUpgrade => (true, true),
    };
    if !unlocked {
        return Err(GameError::EntityLocked(id.to_string()));
    }
    let needs_unit = matches!(kind, EntityKind::Race | EntityKind::Building);
    if needs_unit && action == CostAction::Upgrade && !owned {
        return Err(GameError::NotOwned(id.to_string()));
    }
    Ok(())
}

fn current_value(state: &GameState, kind: EntityKind, action: CostAction, id: &str) -> u32 {
    match (kind, action) {
        (EntityKind::Race, CostAction::Purchase) => state.races.get(id).map_or(0, |r| r.count),
        (EntityKind::Race, CostAction::Upgrade) => state.races.get(id).map_or(0, |r| r.level),
        (EntityKind::Building, CostAction::Purchase) => {
            state.buildings.get(id).map_or(0, |b| b.count)
        }
        (EntityKind::Building, CostAction::Upgrade) => {
            state.buildings.get(id).map_or(0, |b| b.level)
        }
        (EntityKind::Research, _) => state.research.get(id).map_or(0, |r| r.level),
        (EntityKind::PrestigeUpgrade, _) => state.prestige_upgrade_level(id),
    }
}

/// Buy `quantity` units or levels of entity `id`.
///
/// Requests beyond the entity's cap are clamped to what remains. Uncapped
/// entities are clamped to [`cost::UNCAPPED_SEARCH_LIMIT`] steps.
///
/// # Errors
///
/// - [`GameError::InvalidQuantity`] for a zero quantity
/// - [`GameError::InvalidEntityId`] for an unknown id
/// - [`GameError::EntityLocked`] if the entity is not unlocked
/// - [`GameError::NotOwned`] when upgrading a race or building with no units
/// - [`GameError::AtCapacity`] if nothing remains below the cap
/// - [`GameError::InsufficientResources`] if the bulk price is unaffordable
pub fn execute(
    config: &GameConfig,
    state: &mut GameState,
    kind: EntityKind,
    action: CostAction,
    id: &str,
    quantity: u32,
) -> Result<Receipt> {
    if quantity == 0 {
        return Err(GameError::InvalidQuantity);
    }
    let pricing = cost::pricing(config, state, kind, action, id)?;
    check_available(state, kind, action, id)?;

    let quantity = match pricing.remaining {
        Some(0) => {
            return Err(GameError::AtCapacity {
                id: id.to_string(),
                cap: current_value(state, kind, action, id),
            })
        }
        Some(remaining) => quantity.min(remaining),
        None => quantity.min(cost::UNCAPPED_SEARCH_LIMIT),
    };
    let price = pricing.affordable_bulk_cost(quantity, &state.resources)?;
    state.resources.spend(&price)?;

    match (kind, action) {
        (EntityKind::Race, CostAction::Purchase) => {
            if let Some(race) = state.races.get_mut(id) {
                race.count += quantity;
            }
        }
        (EntityKind::Race, CostAction::Upgrade) => {
            if let Some(race) = state.races.get_mut(id) {
                race.level += quantity;
            }
        }
        (EntityKind::Building, CostAction::Purchase) => {
            if let Some(building) = state.buildings.get_mut(id) {
                building.count += quantity;
            }
        }
        (EntityKind::Building, CostAction::Upgrade) => {
            if let Some(building) = state.buildings.get_mut(id) {
                building.level += quantity;
            }
        }
        (EntityKind::Research, _) => {
            if let Some(research) = state.research.get_mut(id) {
                research.level += quantity;
            }
        }
        (EntityKind::PrestigeUpgrade, _) => {
            if let Some(upgrade) = config.prestige_upgrade(id) {
                prestige::apply_upgrade_levels(upgrade, quantity, state);
            }
        }
    }

    debug!(%kind, id, ?action, quantity, "Command executed");
    Ok(Receipt {
        quantity,
        cost: price,
    })
}
