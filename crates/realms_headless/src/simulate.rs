//! Batch auto-play.
//!
//! Runs a strategy against a fresh game on a manual clock for a fixed span
//! of game time and reports where it ended up.

use std::collections::BTreeMap;
use std::sync::Arc;

use realms_core::clock::ManualClock;
use realms_core::data::GameConfig;
use realms_core::player_facade::SimulationPlayerFacade;
use realms_core::resources::ResourceType;
use realms_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::strategies::{Strategy, StrategyExecutor};

/// Options for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulateConfig {
    /// Game seconds to play.
    pub duration: f64,
    /// Seconds between decisions.
    pub step: f64,
    /// Seed for the simulation's random effects.
    pub seed: u64,
    /// Clock reading at the start.
    pub start_time: f64,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self {
            duration: 3600.0,
            step: 1.0,
            seed: realms_core::simulation::DEFAULT_SEED,
            start_time: 0.0,
        }
    }
}

/// Where a batch run ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Strategy name.
    pub strategy: String,
    /// Game seconds played.
    pub play_time: f64,
    /// Decisions made.
    pub steps: u64,
    /// Final player level.
    pub player_level: u32,
    /// Gold produced since the last prestige.
    pub total_earnings: f64,
    /// Completed prestiges.
    pub prestige_count: u32,
    /// Units and levels bought.
    pub purchases: u64,
    /// Upgrade levels gained.
    pub upgrades: u64,
    /// Final balances.
    pub resources: BTreeMap<ResourceType, f64>,
    /// Final production per second.
    pub rates: BTreeMap<ResourceType, f64>,
    /// Completed achievement ids.
    pub achievements: Vec<String>,
    /// Hash of the final state.
    pub state_hash: u64,
}

/// Play `strategy` for `options.duration` game seconds.
pub fn run_simulation(
    config: Arc<GameConfig>,
    strategy: Strategy,
    options: &SimulateConfig,
) -> SimulationSummary {
    let clock = ManualClock::new(options.start_time);
    let mut sim = Simulation::with_clock(config, clock.clone(), options.seed);
    let mut executor = StrategyExecutor::new(strategy);

    let step = if options.step > 0.0 { options.step } else { 1.0 };
    let total_steps = (options.duration.max(0.0) / step).ceil() as u64;
    let report_every = (total_steps / 10).max(1);

    let mut steps = 0u64;
    while steps < total_steps {
        executor.decide(&mut SimulationPlayerFacade::new(&mut sim));
        clock.advance(step);
        sim.advance(step);
        steps += 1;

        if steps % report_every == 0 {
            info!(
                steps,
                level = sim.state().player_level,
                gold = sim.state().resources.get(ResourceType::Gold),
                "Simulation progress"
            );
        }
    }
    executor.decide(&mut SimulationPlayerFacade::new(&mut sim));

    let state = sim.state();
    SimulationSummary {
        strategy: executor.name().to_string(),
        play_time: state.total_play_time,
        steps,
        player_level: state.player_level,
        total_earnings: state.total_earnings,
        prestige_count: state.prestige_count,
        purchases: executor.purchases(),
        upgrades: executor.upgrades(),
        resources: ResourceType::ALL
            .into_iter()
            .map(|r| (r, state.resources.get(r)))
            .collect(),
        rates: ResourceType::PRODUCIBLE
            .into_iter()
            .map(|r| (r, sim.resource_rate(r)))
            .collect(),
        achievements: state
            .achievements
            .values()
            .flat_map(|flags| flags.iter().filter(|(_, done)| **done).map(|(id, _)| id.clone()))
            .collect(),
        state_hash: sim.state_hash(),
    }
}
