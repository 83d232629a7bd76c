//! Property tests for the simulation invariants.
//!
//! Random command sequences are replayed against the small fixture config and
//! the built-in content table; cost properties run against the built-in table.

use std::collections::BTreeSet;

use proptest::prelude::*;
use realms_core::cost::{self, CostAction};
use realms_core::data::GameConfig;
use realms_core::persistence::SaveEncoding;
use realms_core::resources::{Cost, ResourcePool, ResourceType};
use realms_core::state::{EntityKind, GameState};
use realms_core::{achievements, unlocks};
use realms_test_utils::fixtures::{
    builtin_config, funded_state, manual_simulation, manual_simulation_from, small_config,
};
use realms_test_utils::strategies::{
    apply_action, arb_cost, arb_entity_kind, arb_player_action, arb_tick_seconds, PlayerAction,
};

fn unlocked_ids(state: &GameState) -> BTreeSet<String> {
    let races = state
        .races
        .iter()
        .filter(|(_, r)| r.unlocked)
        .map(|(id, _)| format!("race:{id}"));
    let abilities = state.races.iter().flat_map(|(race, r)| {
        r.abilities
            .iter()
            .filter(|(_, a)| a.unlocked)
            .map(move |(ability, _)| format!("ability:{race}/{ability}"))
    });
    let buildings = state
        .buildings
        .iter()
        .filter(|(_, b)| b.unlocked)
        .map(|(id, _)| format!("building:{id}"));
    let research = state
        .research
        .iter()
        .filter(|(_, r)| r.unlocked)
        .map(|(id, _)| format!("research:{id}"));
    races.chain(abilities).chain(buildings).chain(research).collect()
}

fn arb_pool() -> impl Strategy<Value = ResourcePool> {
    proptest::collection::vec(0.0..1000.0f64, ResourceType::ALL.len()).prop_map(|amounts| {
        let mut pool = ResourcePool::new();
        for (resource, amount) in ResourceType::ALL.into_iter().zip(amounts) {
            pool.set(resource, amount);
        }
        pool
    })
}

fn close(a: &Cost, b: &Cost) -> bool {
    ResourceType::ALL.into_iter().all(|r| {
        let (x, y) = (a.get(r), b.get(r));
        (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0)
    })
}

/// Sum of single-step prices, moving the entity one step at a time.
fn stepwise_cost(
    config: &GameConfig,
    kind: EntityKind,
    action: CostAction,
    id: &str,
    start: u32,
    n: u32,
) -> Cost {
    let mut state = GameState::new(config);
    let mut total = Cost::new();
    for i in 0..n {
        let step = start + i;
        match (kind, action) {
            (EntityKind::Race, CostAction::Purchase) => state.races.get_mut(id).unwrap().count = step,
            (EntityKind::Race, CostAction::Upgrade) => {
                state.races.get_mut(id).unwrap().level = step + 1;
            }
            (EntityKind::Building, CostAction::Purchase) => {
                state.buildings.get_mut(id).unwrap().count = step;
            }
            (EntityKind::Building, CostAction::Upgrade) => {
                state.buildings.get_mut(id).unwrap().level = step + 1;
            }
            (EntityKind::Research, _) => state.research.get_mut(id).unwrap().level = step,
            (EntityKind::PrestigeUpgrade, _) => {
                state.prestige_upgrades.get_mut(id).unwrap().level = step;
            }
        }
        let single = cost::pricing(config, &state, kind, action, id).unwrap().bulk_cost(1);
        total.accumulate(&single);
    }
    total
}

fn ids(config: &GameConfig, kind: EntityKind) -> Vec<String> {
    match kind {
        EntityKind::Race => config.races.iter().map(|r| r.id.clone()).collect(),
        EntityKind::Building => config.buildings.iter().map(|b| b.id.clone()).collect(),
        EntityKind::Research => config.research.iter().map(|r| r.id.clone()).collect(),
        EntityKind::PrestigeUpgrade => config
            .prestige_upgrades
            .iter()
            .map(|u| u.id.clone())
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_waiting_never_decreases_resources(
        actions in proptest::collection::vec(arb_player_action(), 1..40),
        waits in proptest::collection::vec(arb_tick_seconds(), 1..10),
    ) {
        let (mut sim, _clock) = manual_simulation(small_config());
        for action in &actions {
            apply_action(&mut sim, action);
        }
        for dt in waits {
            let before = sim.state().resources.clone();
            sim.advance(dt);
            for resource in ResourceType::ALL {
                prop_assert!(
                    sim.state().resources.get(resource) >= before.get(resource),
                    "{resource} fell from {} to {}",
                    before.get(resource),
                    sim.state().resources.get(resource)
                );
            }
        }
    }

    #[test]
    fn prop_builtin_production_never_decreases_resources(
        actions in proptest::collection::vec(
            arb_player_action().prop_filter("conversions stay off", |a| {
                !matches!(a, PlayerAction::Toggle { .. })
            }),
            1..40,
        ),
        waits in proptest::collection::vec(arb_tick_seconds(), 1..10),
    ) {
        let config = builtin_config();
        let state = funded_state(&config, 10_000.0);
        let (mut sim, _clock) = manual_simulation_from(config, state);
        for action in &actions {
            apply_action(&mut sim, action);
        }
        for dt in waits {
            let before = sim.state().resources.clone();
            let events = sim.advance(dt);
            // Ability unlocks pay their one-time cost during the scan.
            if events
                .unlocks
                .iter()
                .any(|e| matches!(e, unlocks::UnlockEvent::Ability { .. }))
            {
                continue;
            }
            for resource in ResourceType::ALL {
                prop_assert!(
                    sim.state().resources.get(resource) >= before.get(resource),
                    "{resource} fell from {} to {}",
                    before.get(resource),
                    sim.state().resources.get(resource)
                );
            }
        }
    }

    #[test]
    fn prop_spend_mutates_only_when_affordable(pool in arb_pool(), cost in arb_cost(1500.0)) {
        let mut after = pool.clone();
        let affordable = pool.can_afford(&cost);
        let result = after.spend(&cost);
        prop_assert_eq!(result.is_ok(), affordable);
        if affordable {
            for resource in ResourceType::ALL {
                let expected = pool.get(resource) - cost.get(resource);
                prop_assert!((after.get(resource) - expected).abs() < 1e-9);
                prop_assert!(after.get(resource) >= 0.0);
            }
        } else {
            prop_assert_eq!(after, pool);
        }
    }

    #[test]
    fn prop_unlocks_are_never_revoked(
        actions in proptest::collection::vec(arb_player_action(), 1..60),
    ) {
        let (mut sim, _clock) = manual_simulation(small_config());
        sim.advance(0.0);
        let mut seen = unlocked_ids(sim.state());
        for action in &actions {
            apply_action(&mut sim, action);
            let now = unlocked_ids(sim.state());
            prop_assert!(seen.is_subset(&now), "lost unlocks: {:?}", seen.difference(&now).collect::<Vec<_>>());
            seen = now;
        }
    }

    #[test]
    fn prop_bulk_cost_is_sum_of_single_steps(
        kind in arb_entity_kind(),
        upgrade in any::<bool>(),
        index in any::<usize>(),
        start in 0u32..40,
        n in prop_oneof![Just(1u32), Just(5u32), Just(50u32)],
    ) {
        let config = builtin_config();
        let ids = ids(&config, kind);
        let id = &ids[index % ids.len()];
        let action = if upgrade { CostAction::Upgrade } else { CostAction::Purchase };

        let mut state = GameState::new(&config);
        match (kind, action) {
            (EntityKind::Race, CostAction::Purchase) => state.races.get_mut(id).unwrap().count = start,
            (EntityKind::Race, CostAction::Upgrade) => state.races.get_mut(id).unwrap().level = start + 1,
            (EntityKind::Building, CostAction::Purchase) => state.buildings.get_mut(id).unwrap().count = start,
            (EntityKind::Building, CostAction::Upgrade) => state.buildings.get_mut(id).unwrap().level = start + 1,
            (EntityKind::Research, _) => state.research.get_mut(id).unwrap().level = start,
            (EntityKind::PrestigeUpgrade, _) => state.prestige_upgrades.get_mut(id).unwrap().level = start,
        }
        let bulk = cost::pricing(&config, &state, kind, action, id).unwrap().bulk_cost(n);
        let stepwise = stepwise_cost(&config, kind, action, id, start, n);
        prop_assert!(close(&bulk, &stepwise), "{kind} {id}: {bulk:?} != {stepwise:?}");
    }

    #[test]
    fn prop_achievement_evaluation_is_idempotent(
        actions in proptest::collection::vec(arb_player_action(), 1..40),
    ) {
        let config = small_config();
        let (mut sim, _clock) = manual_simulation(config.clone());
        for action in &actions {
            apply_action(&mut sim, action);
        }
        let mut state = sim.state().clone();
        achievements::evaluate(&config, &mut state);
        let once = state.clone();
        let second = achievements::evaluate(&config, &mut state);
        prop_assert!(second.is_empty());
        prop_assert_eq!(state, once);
    }

    #[test]
    fn prop_unlock_refresh_is_idempotent(
        actions in proptest::collection::vec(arb_player_action(), 1..40),
    ) {
        let config = small_config();
        let (mut sim, _clock) = manual_simulation(config.clone());
        for action in &actions {
            apply_action(&mut sim, action);
        }
        let mut state = sim.state().clone();
        unlocks::refresh(&config, &mut state);
        let once = state.clone();
        prop_assert!(unlocks::refresh(&config, &mut state).is_empty());
        prop_assert_eq!(state, once);
    }

    #[test]
    fn prop_save_round_trip_restores_state(
        actions in proptest::collection::vec(arb_player_action(), 1..40),
        encoding in prop_oneof![
            Just(SaveEncoding::Json),
            Just(SaveEncoding::Deflate),
            Just(SaveEncoding::Base64),
        ],
    ) {
        let config = small_config();
        let (mut sim, _clock) = manual_simulation(config.clone());
        for action in &actions {
            apply_action(&mut sim, action);
        }
        let bytes = sim.serialize(encoding).unwrap();

        let (mut loaded, _clock) = manual_simulation(config);
        let report = loaded.deserialize(&bytes).unwrap();
        prop_assert_eq!(report.simulated_seconds, 0.0);
        prop_assert_eq!(loaded.state(), sim.state());
    }
}

#[test]
fn test_actions_can_fail_without_side_effects() {
    let (mut sim, _clock) = manual_simulation(small_config());
    let before = sim.state().clone();
    let changed = apply_action(
        &mut sim,
        &PlayerAction::Upgrade {
            kind: EntityKind::Race,
            index: 0,
            quantity: 1,
        },
    );
    assert!(!changed);
    assert_eq!(sim.state(), &before);
}
