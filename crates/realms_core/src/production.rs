//! Resource production.
//!
//! A production step runs in three phases:
//!
//! 1. The special-effect pipeline ([`SPECIAL_EFFECT_PIPELINE`]): an ordered
//!    list of stages, each computing a [`ResourceDelta`] from the current
//!    state. Deltas are applied one stage at a time, so later stages see
//!    earlier stages' output. Balances are clamped at zero.
//! 2. Ordinary generation: `base_rate * global_multiplier * time_modifier`
//!    for every producible resource, doubled for the whole tick on a
//!    successful doubling roll, with gold added to total earnings and every
//!    amount attributed to races for skill tracking.
//! 3. Passive prestige point generation.
//!
//! [`RateModel`] holds the rate formulas and is also used for queries.

use std::collections::BTreeMap;

use rand::Rng;
use rand_pcg::Pcg64Mcg;
use tracing::trace;

use crate::abilities;
use crate::achievements;
use crate::data::{AbilityEffect, GameConfig, RaceData, ResearchData, ResearchEffect};
use crate::resources::{ResourcePool, ResourceType};
use crate::state::{GameState, RaceState};

/// Random number generator used by probabilistic ability effects.
pub type GameRng = Pcg64Mcg;

/// Rate formulas over a read-only view of the game.
#[derive(Debug, Clone, Copy)]
pub struct RateModel<'a> {
    config: &'a GameConfig,
    state: &'a GameState,
    now: f64,
}

impl<'a> RateModel<'a> {
    /// A view at wall-clock time `now`.
    #[must_use]
    pub fn new(config: &'a GameConfig, state: &'a GameState, now: f64) -> Self {
        Self { config, state, now }
    }

    fn active_effects(&self) -> impl Iterator<Item = (&'a RaceData, &'a RaceState, &'a AbilityEffect)> {
        abilities::active_effects(self.config, self.state)
    }

    fn researched(&self) -> impl Iterator<Item = (&'a ResearchData, u32)> + 'a {
        let state = self.state;
        self.config.research.iter().filter_map(move |research| {
            state
                .research
                .get(&research.id)
                .filter(|r| r.unlocked && r.level > 0)
                .map(|r| (research, r.level))
        })
    }

    /// Flat generation from active `PassiveGeneration` abilities.
    #[must_use]
    pub fn passive_generation(&self, resource: ResourceType) -> f64 {
        if !resource.is_producible() {
            return 0.0;
        }
        let level = f64::from(self.state.player_level);
        self.active_effects()
            .map(|(_, _, effect)| match effect {
                AbilityEffect::PassiveGeneration { rate } => rate * level,
                _ => 0.0,
            })
            .sum()
    }

    /// Product of `ResearchEffectBonus` from active abilities.
    #[must_use]
    pub fn research_effect_bonus(&self) -> f64 {
        self.active_effects()
            .map(|(_, _, effect)| match effect {
                AbilityEffect::ResearchEffectBonus { factor } => *factor,
                _ => 1.0,
            })
            .product()
    }

    /// Multiplier on every race's resource bonus, from research and achievements.
    #[must_use]
    pub fn race_bonus_multiplier(&self) -> f64 {
        let bonus = self.research_effect_bonus();
        let research: f64 = self
            .researched()
            .flat_map(|(research, level)| {
                research.effects.iter().map(move |effect| match effect {
                    ResearchEffect::RaceBonusMultiplier { factor } => {
                        research.scaled_multiplier(*factor, level, bonus)
                    }
                    _ => 1.0,
                })
            })
            .product();
        research * achievements::race_efficiency(self.config, self.state)
    }

    /// Additive bonus from the race's own active abilities.
    #[must_use]
    pub fn ability_bonus(&self, race: &RaceData, race_state: &RaceState, resource: ResourceType) -> f64 {
        let extra: f64 = race
            .abilities
            .iter()
            .filter(|ability| race_state.is_ability_active(&ability.id))
            .flat_map(|ability| ability.effects.iter())
            .map(|effect| match effect {
                AbilityEffect::PerUnitBonus { bonus } => bonus * f64::from(race_state.count),
                AbilityEffect::GoldStorageBonus { bonus } if resource == ResourceType::Gold => {
                    self.state.resources.get(ResourceType::Gold) / 1000.0 * bonus
                }
                _ => 0.0,
            })
            .sum();
        1.0 + extra
    }

    /// Each producing race's contribution to the base rate of `resource`.
    ///
    /// Races without a configured bonus for `resource` are omitted.
    #[must_use]
    pub fn race_contributions(&self, resource: ResourceType) -> Vec<(&'a str, f64)> {
        let race_bonus = self.race_bonus_multiplier();
        let income = self.config.balance.base_income_rate;
        self.config
            .races
            .iter()
            .filter_map(|race| {
                let race_state = self.state.races.get(&race.id).filter(|r| r.is_producing())?;
                let bonus = race.bonus(resource)?;
                let contribution = income
                    * f64::from(race_state.count)
                    * f64::from(race_state.level)
                    * bonus
                    * race_bonus
                    * self.ability_bonus(race, race_state, resource)
                    * achievements::race_skill_multiplier(
                        self.config,
                        self.state,
                        &race.id,
                        resource,
                    );
                Some((race.id.as_str(), contribution))
            })
            .collect()
    }

    /// Production of `resource` from owned buildings.
    #[must_use]
    pub fn building_rate(&self, resource: ResourceType) -> f64 {
        self.config
            .buildings
            .iter()
            .filter_map(|building| {
                let state = self.state.buildings.get(&building.id)?;
                state
                    .is_producing()
                    .then(|| building.production_rate(resource, state.count, state.level))
            })
            .sum()
    }

    /// Flat generation from `IdleResourceGeneration` research.
    #[must_use]
    pub fn research_flat_bonus(&self, resource: ResourceType) -> f64 {
        if !resource.is_producible() {
            return 0.0;
        }
        self.researched()
            .map(|(research, level)| research.idle_generation(level))
            .sum()
    }

    /// Unmultiplied production per second.
    #[must_use]
    pub fn base_rate(&self, resource: ResourceType) -> f64 {
        if !resource.is_producible() {
            return 0.0;
        }
        self.passive_generation(resource)
            + self
                .race_contributions(resource)
                .iter()
                .map(|(_, c)| c)
                .sum::<f64>()
            + self.building_rate(resource)
            + self.research_flat_bonus(resource)
    }

    /// Product of building multipliers for `resource`.
    #[must_use]
    pub fn building_multiplier(&self, resource: ResourceType) -> f64 {
        self.config
            .buildings
            .iter()
            .filter_map(|building| {
                let state = self.state.buildings.get(&building.id)?;
                state
                    .is_producing()
                    .then(|| building.global_multiplier(resource, state.level))
            })
            .product()
    }

    /// Product of active ability multipliers for `resource`.
    #[must_use]
    pub fn ability_multiplier(&self, resource: ResourceType) -> f64 {
        let built = self.config.buildings.iter().any(|building| {
            building.produces(resource)
                && self
                    .state
                    .buildings
                    .get(&building.id)
                    .is_some_and(|b| b.is_producing())
        });
        self.active_effects()
            .map(|(_, _, effect)| match effect {
                AbilityEffect::ResourceMultiplier { resource: r, factor } if *r == resource => {
                    *factor
                }
                AbilityEffect::AllResourcesMultiplier { factor } => *factor,
                AbilityEffect::BuildingEfficiency { factor } if built => *factor,
                _ => 1.0,
            })
            .product()
    }

    /// Product of research multipliers for `resource`.
    #[must_use]
    pub fn research_multiplier(&self, resource: ResourceType) -> f64 {
        let bonus = self.research_effect_bonus();
        self.researched()
            .flat_map(|(research, level)| {
                research.effects.iter().map(move |effect| match effect {
                    ResearchEffect::ResourceMultiplier { resource: r, factor } if *r == resource => {
                        research.scaled_multiplier(*factor, level, bonus)
                    }
                    ResearchEffect::GlobalMultiplier { factor } => {
                        research.scaled_multiplier(*factor, level, bonus)
                    }
                    _ => 1.0,
                })
            })
            .product()
    }

    /// `1 + prestige_count * prestige_bonus_base`.
    #[must_use]
    pub fn prestige_multiplier(&self) -> f64 {
        1.0 + f64::from(self.state.prestige_count) * self.config.balance.prestige_bonus_base
    }

    /// Product of permanent multipliers covering `resource`.
    #[must_use]
    pub fn permanent_multiplier(&self, resource: ResourceType) -> f64 {
        self.state
            .permanent_multipliers
            .iter()
            .filter(|(target, _)| target.applies_to(resource))
            .map(|(_, factor)| factor)
            .product()
    }

    /// Product of every independently sourced multiplier for `resource`.
    #[must_use]
    pub fn global_multiplier(&self, resource: ResourceType) -> f64 {
        self.building_multiplier(resource)
            * self.ability_multiplier(resource)
            * achievements::production_multiplier(self.config, self.state, resource)
            * self.research_multiplier(resource)
            * self.prestige_multiplier()
            * self.permanent_multiplier(resource)
    }

    /// Timed production bonus, active during the first `alignment_duration`
    /// seconds of every `alignment_period` of wall-clock time.
    #[must_use]
    pub fn time_modifier(&self, resource: ResourceType) -> f64 {
        if !resource.is_producible() {
            return 1.0;
        }
        let period = self.config.balance.alignment_period;
        let phase = self.now.floor().rem_euclid(period);
        self.active_effects()
            .map(|(_, _, effect)| match effect {
                AbilityEffect::TimedProductionBonus {
                    factor,
                    alignment_duration,
                } if phase < *alignment_duration => *factor,
                _ => 1.0,
            })
            .product()
    }

    /// Final production per second, before doubling and special effects.
    #[must_use]
    pub fn rate(&self, resource: ResourceType) -> f64 {
        let base = self.base_rate(resource);
        if base == 0.0 {
            return 0.0;
        }
        base * self.global_multiplier(resource) * self.time_modifier(resource)
    }
}

/// Resource changes produced by one pipeline stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDelta {
    changes: BTreeMap<ResourceType, f64>,
    messages: Vec<String>,
}

impl ResourceDelta {
    /// Add `amount` (possibly negative) to `resource`.
    pub fn add(&mut self, resource: ResourceType, amount: f64) {
        *self.changes.entry(resource).or_insert(0.0) += amount;
    }

    /// Attach a player-facing message.
    pub fn note(&mut self, message: String) {
        self.messages.push(message);
    }

    /// Net change for `resource`.
    #[must_use]
    pub fn get(&self, resource: ResourceType) -> f64 {
        self.changes.get(&resource).copied().unwrap_or(0.0)
    }

    /// Whether the delta changes nothing and says nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.changes.values().all(|v| *v == 0.0)
    }

    /// Apply to `pool`, clamping every balance at zero. Returns the messages.
    pub fn apply(self, pool: &mut ResourcePool) -> Vec<String> {
        for (resource, amount) in self.changes {
            let next = (pool.get(resource) + amount).max(0.0);
            pool.set(resource, next);
        }
        self.messages
    }
}

/// Read-only input to a pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    /// Config tables.
    pub config: &'a GameConfig,
    /// State as left by the previous stage.
    pub state: &'a GameState,
    /// Wall-clock time.
    pub now: f64,
    /// Simulated seconds in this step.
    pub dt: f64,
}

impl<'a> StageInput<'a> {
    fn model(&self) -> RateModel<'a> {
        RateModel::new(self.config, self.state, self.now)
    }

    fn effects(&self) -> impl Iterator<Item = (&'a RaceData, &'a RaceState, &'a AbilityEffect)> {
        abilities::active_effects(self.config, self.state)
    }
}

/// A special-effect stage.
pub type EffectStage = fn(&StageInput<'_>, &mut GameRng) -> ResourceDelta;

/// Special-effect stages, in the order they run each step.
pub const SPECIAL_EFFECT_PIPELINE: [(&str, EffectStage); 5] = [
    ("random_generation", random_generation),
    ("resource_conversion", resource_conversion),
    ("transmutation", transmutation),
    ("stone_to_crystal", stone_to_crystal),
    ("parallel_production", parallel_production),
];

/// Lumps of a random producible resource, rolled per ability.
pub fn random_generation(input: &StageInput<'_>, rng: &mut GameRng) -> ResourceDelta {
    let mut delta = ResourceDelta::default();
    let balance = &input.config.balance;
    for (race, _, effect) in input.effects() {
        let AbilityEffect::RandomResourceGeneration { chance_per_second } = effect else {
            continue;
        };
        if rng.gen::<f64>() >= chance_per_second * input.dt {
            continue;
        }
        let resource = ResourceType::PRODUCIBLE[rng.gen_range(0..ResourceType::PRODUCIBLE.len())];
        let amount = f64::from(input.state.player_level)
            * balance.random_generation_amount
            * (1.0 + f64::from(input.state.prestige_count) * balance.random_generation_prestige_bonus);
        delta.add(resource, amount);
        delta.note(format!(
            "{} conjured {amount:.0} {}!",
            race.name,
            resource.display_name()
        ));
    }
    delta
}

/// Credit every other resource with a share of the fastest base rate.
pub fn resource_conversion(input: &StageInput<'_>, _rng: &mut GameRng) -> ResourceDelta {
    let mut delta = ResourceDelta::default();
    let rates: Vec<f64> = input
        .effects()
        .filter_map(|(_, _, effect)| match effect {
            AbilityEffect::ResourceConversion { rate } => Some(*rate),
            _ => None,
        })
        .collect();
    if rates.is_empty() {
        return delta;
    }
    let model = input.model();
    let mut top: Option<(ResourceType, f64)> = None;
    for resource in ResourceType::PRODUCIBLE {
        let rate = model.base_rate(resource);
        if rate > top.map_or(0.0, |(_, best)| best) {
            top = Some((resource, rate));
        }
    }
    let Some((source, top_rate)) = top else {
        return delta;
    };
    for rate in rates {
        let amount = top_rate * rate * input.dt;
        for resource in ResourceType::PRODUCIBLE {
            if resource != source {
                delta.add(resource, amount);
            }
        }
    }
    delta
}

/// Drain the selected source into the selected target.
pub fn transmutation(input: &StageInput<'_>, _rng: &mut GameRng) -> ResourceDelta {
    let mut delta = ResourceDelta::default();
    let Some(pair) = input.state.transmutation else {
        return delta;
    };
    if pair.from == pair.to || !pair.from.is_producible() || !pair.to.is_producible() {
        return delta;
    }
    let rate = input.config.balance.transmutation_rate;
    let mut source = input.state.resources.get(pair.from);
    for (_, _, effect) in input.effects() {
        let AbilityEffect::ResourceTransmutation { efficiency } = effect else {
            continue;
        };
        let amount = (source * rate * input.dt).min(source);
        if amount <= 0.0 {
            continue;
        }
        source -= amount;
        delta.add(pair.from, -amount);
        delta.add(pair.to, amount * efficiency);
    }
    delta
}

/// Crystal from a share of this step's stone production.
pub fn stone_to_crystal(input: &StageInput<'_>, _rng: &mut GameRng) -> ResourceDelta {
    let mut delta = ResourceDelta::default();
    let mut stone: Option<f64> = None;
    for (_, _, effect) in input.effects() {
        let AbilityEffect::StoneToCrystalConversion { ratio } = effect else {
            continue;
        };
        let produced =
            *stone.get_or_insert_with(|| input.model().base_rate(ResourceType::Stone) * input.dt);
        if produced > 0.0 {
            delta.add(ResourceType::Crystal, produced * ratio);
        }
    }
    delta
}

/// Every resource produced again at a fraction of its base rate.
pub fn parallel_production(input: &StageInput<'_>, _rng: &mut GameRng) -> ResourceDelta {
    let mut delta = ResourceDelta::default();
    let fractions: Vec<f64> = input
        .effects()
        .filter_map(|(_, _, effect)| match effect {
            AbilityEffect::ParallelProduction { fraction } => Some(*fraction),
            _ => None,
        })
        .collect();
    if fractions.is_empty() {
        return delta;
    }
    let model = input.model();
    for resource in ResourceType::PRODUCIBLE {
        let produced = model.base_rate(resource) * input.dt;
        for fraction in &fractions {
            delta.add(resource, produced * fraction);
        }
    }
    delta
}

/// What one production step did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionReport {
    /// Ordinary generation per resource.
    pub produced: BTreeMap<ResourceType, f64>,
    /// Whether the doubling roll succeeded.
    pub doubled: bool,
    /// Prestige points from passive generation.
    pub prestige_points: f64,
    /// Player-facing messages from special effects.
    pub messages: Vec<String>,
}

fn roll_doubling(config: &GameConfig, state: &GameState, rng: &mut GameRng) -> bool {
    let mut doubled = false;
    for (_, _, effect) in abilities::active_effects(config, state) {
        if let AbilityEffect::ProductionDoublingChance { chance } = effect {
            doubled |= rng.gen::<f64>() < *chance;
        }
    }
    doubled
}

fn attribute_skills(state: &mut GameState, resource: ResourceType, amount: f64, shares: &[(String, f64)]) {
    let total: f64 = shares.iter().map(|(_, c)| c).sum();
    if total <= 0.0 {
        return;
    }
    for (race, contribution) in shares {
        if let Some(race_state) = state.races.get_mut(race) {
            *race_state.skills.entry(resource).or_insert(0.0) += amount * contribution / total;
        }
    }
}

/// Run one production step of `dt` simulated seconds.
///
/// Does nothing for `dt <= 0`.
pub fn advance(
    config: &GameConfig,
    state: &mut GameState,
    dt: f64,
    now: f64,
    rng: &mut GameRng,
) -> ProductionReport {
    let mut report = ProductionReport::default();
    if dt <= 0.0 || !dt.is_finite() {
        return report;
    }

    for (name, stage) in SPECIAL_EFFECT_PIPELINE {
        let delta = stage(
            &StageInput {
                config,
                state: &*state,
                now,
                dt,
            },
            rng,
        );
        if delta.is_empty() {
            continue;
        }
        trace!(stage = name, "Applying special effect stage");
        report.messages.extend(delta.apply(&mut state.resources));
    }

    report.doubled = roll_doubling(config, state, rng);

    let planned: Vec<(ResourceType, f64, Vec<(String, f64)>)> = {
        let model = RateModel::new(config, state, now);
        ResourceType::PRODUCIBLE
            .into_iter()
            .map(|resource| {
                let shares = model
                    .race_contributions(resource)
                    .into_iter()
                    .map(|(race, c)| (race.to_string(), c))
                    .collect();
                (resource, model.rate(resource), shares)
            })
            .collect()
    };

    for (resource, rate, shares) in planned {
        let mut amount = rate * dt;
        if report.doubled {
            amount *= 2.0;
        }
        if amount <= 0.0 {
            continue;
        }
        state.resources.add(resource, amount);
        if resource == ResourceType::Gold {
            state.total_earnings += amount;
        }
        attribute_skills(state, resource, amount, &shares);
        report.produced.insert(resource, amount);
    }

    let prestige_rate: f64 = abilities::active_effects(config, state)
        .map(|(_, _, effect)| match effect {
            AbilityEffect::PassivePrestigeGeneration { rate } => *rate,
            _ => 0.0,
        })
        .sum();
    if prestige_rate > 0.0 {
        let points = state.total_earnings * prestige_rate * dt;
        state.resources.add(ResourceType::PrestigePoints, points);
        state.total_prestige_points += points;
        report.prestige_points = points;
    }

    report
}
