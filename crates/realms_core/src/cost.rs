//! Cost curves, bulk pricing, and affordability search.
//!
//! Every price in the game is a [`CostCurve`] evaluated at a step: the owned
//! count for purchases, `level - 1` for race and building upgrades, and the
//! current level for research and prestige upgrades. Bulk prices are sums of
//! successive single-step prices, never `unit * n`.

use serde::{Deserialize, Serialize};

use crate::abilities;
use crate::achievements;
use crate::data::{AbilityEffect, BuildingData, GameConfig, PrestigeUpgradeData, RaceData, ResearchData};
use crate::error::{GameError, Result};
use crate::resources::{Cost, ResourcePool};
use crate::state::{EntityKind, GameState};

/// Upper bound on steps searched when an entity has no cap.
pub const UNCAPPED_SEARCH_LIMIT: u32 = 100_000;

/// How the price grows from one step to the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Growth {
    /// `1 + growth * step`.
    Linear(f64),
    /// `ratio ^ step`, with step 0 (or ratio 1) costing exactly the base.
    Geometric(f64),
}

impl Growth {
    /// Price multiplier at `step`.
    #[must_use]
    pub fn factor(self, step: u32) -> f64 {
        match self {
            Self::Linear(growth) => 1.0 + growth * f64::from(step),
            Self::Geometric(ratio) => {
                if step == 0 || ratio == 1.0 {
                    1.0
                } else {
                    ratio.powf(f64::from(step))
                }
            }
        }
    }
}

/// A price curve: base cost, growth shape, and a flat discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    /// Price at step 0 before discount.
    pub base: Cost,
    /// Growth shape.
    pub growth: Growth,
    /// Multiplier applied to every step.
    pub discount: f64,
}

impl CostCurve {
    /// Race recruitment: linear growth per owned unit.
    #[must_use]
    pub fn race_purchase(race: &RaceData) -> Self {
        Self {
            base: race.base_cost.clone(),
            growth: Growth::Linear(race.cost_growth),
            discount: 1.0,
        }
    }

    /// Race upgrade: `upgrade_cost_factor * base`, geometric per level.
    #[must_use]
    pub fn race_upgrade(race: &RaceData) -> Self {
        Self {
            base: race.base_cost.scaled(race.upgrade_cost_factor),
            growth: Growth::Geometric(race.upgrade_cost_ratio),
            discount: 1.0,
        }
    }

    /// Building construction: linear growth per owned building.
    #[must_use]
    pub fn building_purchase(building: &BuildingData, discount: f64) -> Self {
        Self {
            base: building.base_cost.clone(),
            growth: Growth::Linear(building.cost_growth),
            discount,
        }
    }

    /// Building upgrade: `upgrade_cost_factor * base`, geometric per level.
    #[must_use]
    pub fn building_upgrade(building: &BuildingData, discount: f64) -> Self {
        Self {
            base: building.base_cost.scaled(building.upgrade_cost_factor),
            growth: Growth::Geometric(building.upgrade_cost_ratio),
            discount,
        }
    }

    /// Research: geometric per level.
    #[must_use]
    pub fn research(research: &ResearchData, discount: f64) -> Self {
        Self {
            base: research.cost.clone(),
            growth: Growth::Geometric(research.cost_scaling),
            discount,
        }
    }

    /// Prestige upgrade: geometric per level.
    #[must_use]
    pub fn prestige_upgrade(upgrade: &PrestigeUpgradeData) -> Self {
        Self {
            base: upgrade.cost.clone(),
            growth: Growth::Geometric(upgrade.cost_scaling),
            discount: 1.0,
        }
    }

    /// Price of the single step `step`.
    #[must_use]
    pub fn cost_at(&self, step: u32) -> Cost {
        self.base.scaled(self.growth.factor(step) * self.discount)
    }

    /// Price of `n` successive steps starting at `start`.
    #[must_use]
    pub fn bulk_cost(&self, start: u32, n: u32) -> Cost {
        let mut total = Cost::new();
        for i in 0..n {
            total.accumulate(&self.cost_at(start.saturating_add(i)));
        }
        total
    }
}

/// Largest number of successive steps affordable from `resources`.
///
/// Simulates buying one step at a time, deducting each price from a scratch
/// copy of the balances, and stops at the first unaffordable step or after
/// `limit` steps.
pub fn max_affordable(
    resources: &ResourcePool,
    start: u32,
    limit: u32,
    cost_at: impl Fn(u32) -> Cost,
) -> u32 {
    let mut scratch = resources.clone();
    let mut bought = 0;
    while bought < limit {
        let price = cost_at(start.saturating_add(bought));
        if scratch.spend(&price).is_err() {
            break;
        }
        bought += 1;
    }
    bought
}

/// Whether an action buys new units or raises a level.
///
/// Research and prestige upgrades only have levels; both actions raise them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostAction {
    /// Buy more units.
    Purchase,
    /// Raise the level.
    Upgrade,
}

/// A resolved price for one entity action.
#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    /// Price curve.
    pub curve: CostCurve,
    /// Current step on the curve.
    pub step: u32,
    /// Steps left before the cap, or `None` if uncapped.
    pub remaining: Option<u32>,
}

impl Pricing {
    /// Price of the next `n` steps.
    #[must_use]
    pub fn bulk_cost(&self, n: u32) -> Cost {
        self.curve.bulk_cost(self.step, n)
    }

    /// Price of the next `n` steps, if `resources` can cover it.
    ///
    /// Summing stops at the first step the running total cannot cover, so an
    /// oversized request fails after a handful of steps.
    ///
    /// # Errors
    ///
    /// Returns the first shortfall of the partial total.
    pub fn affordable_bulk_cost(&self, n: u32, resources: &ResourcePool) -> Result<Cost> {
        let mut total = Cost::new();
        for i in 0..n {
            total.accumulate(&self.curve.cost_at(self.step.saturating_add(i)));
            if let Some(err) = resources.shortfall(&total) {
                return Err(err);
            }
        }
        Ok(total)
    }

    /// Largest affordable step count, bounded by the cap.
    #[must_use]
    pub fn max_affordable(&self, resources: &ResourcePool) -> u32 {
        let limit = self.remaining.unwrap_or(UNCAPPED_SEARCH_LIMIT);
        max_affordable(resources, self.step, limit, |step| self.curve.cost_at(step))
    }
}

fn remaining(cap: Option<u32>, current: u32) -> Option<u32> {
    cap.map(|cap| cap.saturating_sub(current))
}

fn unknown(kind: EntityKind, id: &str) -> GameError {
    GameError::InvalidEntityId {
        kind,
        id: id.to_string(),
    }
}

/// Product of `ResearchCostReduction` from active abilities.
#[must_use]
pub fn research_cost_factor(config: &GameConfig, state: &GameState) -> f64 {
    abilities::active_effects(config, state)
        .map(|(_, _, effect)| match effect {
            AbilityEffect::ResearchCostReduction { factor } => *factor,
            _ => 1.0,
        })
        .product()
}

/// Resolve the price of `action` on entity `id`, with every discount applied.
///
/// # Errors
///
/// Returns [`GameError::InvalidEntityId`] if `id` is not in the config tables.
pub fn pricing(
    config: &GameConfig,
    state: &GameState,
    kind: EntityKind,
    action: CostAction,
    id: &str,
) -> Result<Pricing> {
    match kind {
        EntityKind::Race => {
            let data = config.race(id).ok_or_else(|| unknown(kind, id))?;
            let race = state.races.get(id).ok_or_else(|| unknown(kind, id))?;
            Ok(match action {
                CostAction::Purchase => Pricing {
                    curve: CostCurve::race_purchase(data),
                    step: race.count,
                    remaining: remaining(data.max_count, race.count),
                },
                CostAction::Upgrade => Pricing {
                    curve: CostCurve::race_upgrade(data),
                    step: race.level.saturating_sub(1),
                    remaining: remaining(data.max_level, race.level),
                },
            })
        }
        EntityKind::Building => {
            let data = config.building(id).ok_or_else(|| unknown(kind, id))?;
            let building = state.buildings.get(id).ok_or_else(|| unknown(kind, id))?;
            let discount = achievements::building_cost_factor(config, state);
            Ok(match action {
                CostAction::Purchase => Pricing {
                    curve: CostCurve::building_purchase(data, discount),
                    step: building.count,
                    remaining: remaining(data.max_count, building.count),
                },
                CostAction::Upgrade => Pricing {
                    curve: CostCurve::building_upgrade(data, discount),
                    step: building.level.saturating_sub(1),
                    remaining: remaining(Some(data.max_level), building.level),
                },
            })
        }
        EntityKind::Research => {
            let data = config.research(id).ok_or_else(|| unknown(kind, id))?;
            let research = state.research.get(id).ok_or_else(|| unknown(kind, id))?;
            Ok(Pricing {
                curve: CostCurve::research(data, research_cost_factor(config, state)),
                step: research.level,
                remaining: remaining(Some(data.max_level), research.level),
            })
        }
        EntityKind::PrestigeUpgrade => {
            let data = config.prestige_upgrade(id).ok_or_else(|| unknown(kind, id))?;
            let level = state.prestige_upgrade_level(id);
            Ok(Pricing {
                curve: CostCurve::prestige_upgrade(data),
                step: level,
                remaining: remaining(Some(data.max_level), level),
            })
        }
    }
}
