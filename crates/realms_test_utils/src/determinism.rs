//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Sources of Non-Determinism
//!
//! - **Wall-clock reads**: the simulation only sees time through an
//!   injected clock. Tests use [`ManualClock`](realms_core::clock::ManualClock).
//!
//! - **HashMap iteration order**: state maps are `BTreeMap`s, and config
//!   tables are scanned in declaration order.
//!
//! - **Randomness**: the doubling and random-generation abilities draw from a
//!   PRNG seeded at construction.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual engines (production, costs, unlocks)
//! 2. **Property tests**: random command sequences replay identically
//! 3. **Parallel tests**: N simulations on separate threads all match

use std::thread;

use realms_core::simulation::Simulation;
use tracing::warn;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, ticks: u64) -> Self {
        let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
        if !is_deterministic {
            warn!(?hashes, ticks, "Runs diverged");
        }
        Self {
            is_deterministic,
            hashes,
            ticks,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use realms_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     3,
///     100,
///     || manual_simulation(small_config()).0,
///     |sim| { sim.advance(1.0); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    DeterminismResult::from_hashes(hashes, ticks)
}

/// Run `num_sims` copies of a [`Simulation`] on separate threads, each
/// advancing `ticks` times by `step_seconds`, and compare final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn verify_parallel_determinism<Setup>(
    num_sims: usize,
    ticks: u64,
    step_seconds: f64,
    setup: Setup,
) -> DeterminismResult
where
    Setup: Fn() -> Simulation + Sync,
{
    let setup = &setup;
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                scope.spawn(move || {
                    let mut sim = setup();
                    for _ in 0..ticks {
                        sim.advance(step_seconds);
                    }
                    sim.state_hash()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult::from_hashes(hashes, ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{manual_simulation, small_config};
    use realms_core::state::EntityKind;

    fn busy_simulation() -> Simulation {
        let (mut sim, _clock) = manual_simulation(small_config());
        sim.add_entity(EntityKind::Race, "human", 5).unwrap();
        sim
    }

    #[test]
    fn test_verify_determinism_detects_divergence() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            3,
            1,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |_| {},
            |s| *s,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let result = verify_determinism(
            3,
            200,
            busy_simulation,
            |sim| {
                sim.advance(1.0);
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_parallel_simulations_match() {
        verify_parallel_determinism(4, 100, 2.5, busy_simulation).assert_deterministic();
    }
}
