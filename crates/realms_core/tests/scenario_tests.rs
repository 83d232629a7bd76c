//! End-to-end scenarios on the built-in content table.

use realms_core::clock::ManualClock;
use realms_core::error::GameError;
use realms_core::notifications::NotificationKind;
use realms_core::persistence::SaveEncoding;
use realms_core::resources::{Cost, MultiplierTarget, ResourceType};
use realms_core::simulation::Simulation;
use realms_core::state::{EntityKind, GameState};
use realms_core::unlocks::UnlockEvent;
use realms_test_utils::determinism::verify_determinism;
use realms_test_utils::fixtures::{
    builtin_config, funded_state, manual_simulation, manual_simulation_from, START_TIME,
};

fn gold(sim: &Simulation) -> f64 {
    sim.state().resources.get(ResourceType::Gold)
}

/// Two humans bought from the starting 100 gold: 30 + 34.5.
fn two_humans() -> (Simulation, ManualClock) {
    let (mut sim, clock) = manual_simulation(builtin_config());
    sim.add_entity(EntityKind::Race, "human", 2).unwrap();
    assert!((gold(&sim) - 35.5).abs() < 1e-9);
    (sim, clock)
}

// ==========================================================================
// Starting state
// ==========================================================================

#[test]
fn test_new_game_holds_only_starting_gold() {
    let (sim, _clock) = manual_simulation(builtin_config());
    for resource in ResourceType::ALL {
        let expected = if resource == ResourceType::Gold { 100.0 } else { 0.0 };
        assert_eq!(sim.state().resources.get(resource), expected, "{resource}");
    }
    assert_eq!(sim.state().player_level, 1);
    assert!(sim.state().races["human"].unlocked);
    assert!(!sim.state().races["orc"].unlocked);
}

#[test]
fn test_zero_elapsed_changes_nothing() {
    let (mut sim, _clock) = manual_simulation(builtin_config());
    let before = sim.state().clone();
    let events = sim.advance(0.0);
    assert_eq!(sim.state(), &before);
    assert!(events.unlocks.is_empty());
    assert!(events.achievements.is_empty());
    assert_eq!(sim.state().total_play_time, 0.0);
}

#[test]
fn test_quarry_first_price_is_base_cost() {
    let (sim, _clock) = manual_simulation(builtin_config());
    let price = sim.purchase_cost(EntityKind::Building, "quarry", 1).unwrap();
    assert_eq!(
        price,
        Cost::from([(ResourceType::Gold, 100.0), (ResourceType::Wood, 50.0)])
    );
}

// ==========================================================================
// Early game
// ==========================================================================

#[test]
fn test_humans_produce_gold_and_food() {
    let (mut sim, _clock) = two_humans();
    assert_eq!(sim.resource_rate(ResourceType::Gold), 2.0);

    let events = sim.advance(10.0);
    assert!((gold(&sim) - 55.5).abs() < 1e-9);
    assert!((sim.state().resources.get(ResourceType::Food) - 26.0).abs() < 1e-9);
    assert!((sim.state().total_earnings - 20.0).abs() < 1e-9);
    assert_eq!(events.simulated_seconds, 10.0);
    assert!((sim.state().races["human"].skill(ResourceType::Gold) - 20.0).abs() < 1e-9);
}

#[test]
fn test_level_up_unlocks_quarry_and_first_achievement() {
    let (mut sim, _clock) = two_humans();
    sim.advance(10.0);
    sim.drain_notifications();

    let events = sim.advance(500.0);
    assert_eq!(sim.state().player_level, 2);
    assert!(events.unlocks.contains(&UnlockEvent::LevelUp(2)));
    assert!(events
        .unlocks
        .contains(&UnlockEvent::Building("Quarry".to_string())));
    assert!(sim.state().buildings["quarry"].unlocked);
    assert_eq!(events.achievements, vec!["first_gold".to_string()]);
    assert!(sim.has_achievement("first_gold"));

    let notes = sim.drain_notifications();
    assert!(notes
        .iter()
        .any(|n| n.kind == NotificationKind::Achievement && n.text.contains("Pocket Change")));
    assert!(notes
        .iter()
        .any(|n| n.to_string() == "[U] New building unlocked: Quarry!"));

    // The gold reward applies from now on.
    assert!((sim.resource_rate(ResourceType::Gold) - 2.1).abs() < 1e-9);
}

#[test]
fn test_first_building_discounts_later_buildings() {
    let (mut sim, _clock) = manual_simulation(builtin_config());
    sim.add_entity(EntityKind::Building, "farm", 1).unwrap();
    assert!(gold(&sim) < 100.0);
    assert!(sim.has_achievement("first_building"));
    let price = sim.purchase_cost(EntityKind::Building, "lumber_mill", 1).unwrap();
    assert!((price.get(ResourceType::Gold) - 75.0 * 0.95).abs() < 1e-9);
}

#[test]
fn test_second_building_in_same_frame_gets_discount() {
    let config = builtin_config();
    let state = funded_state(&config, 1000.0);
    let (mut sim, _clock) = manual_simulation_from(config, state);

    let farm = sim.add_entity(EntityKind::Building, "farm", 1).unwrap();
    assert_eq!(farm.cost.get(ResourceType::Gold), 50.0);
    let mill = sim.add_entity(EntityKind::Building, "lumber_mill", 1).unwrap();
    assert!((mill.cost.get(ResourceType::Gold) - 75.0 * 0.95).abs() < 1e-9);
    assert!((gold(&sim) - (1000.0 - 50.0 - 71.25)).abs() < 1e-9);
}

#[test]
fn test_rejected_purchase_leaves_state_untouched() {
    let (mut sim, _clock) = manual_simulation(builtin_config());
    let before = sim.state().clone();
    let err = sim.add_entity(EntityKind::Race, "human", 10).unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientResources {
            resource: ResourceType::Gold,
            ..
        }
    ));
    assert_eq!(
        sim.add_entity(EntityKind::Building, "quarry", 1),
        Err(GameError::EntityLocked("quarry".to_string()))
    );
    assert_eq!(sim.state(), &before);
}

// ==========================================================================
// Time warp
// ==========================================================================

#[test]
fn test_time_warp_doubles_production_until_expiry() {
    let (mut sim, clock) = two_humans();
    let end = sim.activate_time_warp().unwrap();
    assert_eq!(end, START_TIME + 3600.0);
    assert!(matches!(
        sim.activate_time_warp(),
        Err(GameError::TimeWarpUnavailable(_))
    ));

    let events = sim.advance(10.0);
    assert_eq!(events.simulated_seconds, 20.0);
    assert!((gold(&sim) - 75.5).abs() < 1e-9);
    assert_eq!(sim.state().total_play_time, 10.0);
    assert_eq!(sim.state().total_simulated_time, 20.0);

    clock.advance(3600.0);
    let events = sim.advance(1.0);
    assert!(events.warp_expired);
    assert_eq!(events.simulated_seconds, 1.0);
    assert!(!sim.state().time_warp.active);

    // Still cooling down.
    assert!(sim.activate_time_warp().is_err());
    clock.advance(86_400.0);
    assert!(sim.activate_time_warp().is_ok());
}

// ==========================================================================
// Persistence and offline progress
// ==========================================================================

#[test]
fn test_offline_catch_up_runs_at_half_rate() {
    let (mut sim, _clock) = two_humans();
    let save = sim.serialize(SaveEncoding::Json).unwrap();

    let (mut loaded, clock) = manual_simulation(builtin_config());
    clock.set(START_TIME + 7200.0);
    let report = loaded.deserialize(&save).unwrap();
    assert_eq!(report.offline_seconds, 7200.0);
    assert_eq!(report.rate, 0.5);
    assert_eq!(report.simulated_seconds, 3600.0);

    assert!((gold(&loaded) - (35.5 + 7200.0)).abs() < 1e-6);
    assert_eq!(loaded.state().total_play_time, 0.0);
    assert_eq!(loaded.state().total_simulated_time, 3600.0);
    assert!(loaded
        .notifications()
        .any(|n| n.text == "Welcome back! Offline: 2h 0m (50% rate)."));
}

#[test]
fn test_clock_skew_yields_no_catch_up() {
    let (mut sim, _clock) = two_humans();
    let save = sim.serialize(SaveEncoding::Deflate).unwrap();

    let (mut loaded, clock) = manual_simulation(builtin_config());
    clock.set(START_TIME - 500.0);
    let report = loaded.deserialize(&save).unwrap();
    assert_eq!(report.offline_seconds, 0.0);
    assert_eq!(report.simulated_seconds, 0.0);
    assert_eq!(loaded.state(), sim.state());
}

#[test]
fn test_corrupt_save_starts_new_game() {
    let (mut sim, _clock) = two_humans();
    let err = sim.deserialize(b"definitely not a save").unwrap_err();
    assert!(matches!(err, GameError::CorruptSaveData(_)));
    assert_eq!(sim.state(), &GameState::new(sim.config()));
    assert!(sim
        .notifications()
        .any(|n| n.kind == NotificationKind::Error));
}

#[test]
fn test_export_import_round_trip() {
    let (mut sim, _clock) = two_humans();
    sim.advance(42.0);
    let exported = sim.export().unwrap();
    assert!(!exported.starts_with('{'));

    let (mut loaded, _clock) = manual_simulation(builtin_config());
    loaded.import(&exported).unwrap();
    assert_eq!(loaded.state(), sim.state());
    assert_eq!(loaded.state_hash(), sim.state_hash());
}

// ==========================================================================
// Prestige
// ==========================================================================

#[test]
fn test_prestige_rejected_below_requirement() {
    let (mut sim, _clock) = two_humans();
    sim.advance(100.0);
    assert_eq!(sim.potential_prestige_points(), 0);
    let before = sim.state().clone();
    assert_eq!(sim.perform_prestige(), Err(GameError::PrestigeNotAvailable));
    assert_eq!(sim.state(), &before);
}

#[test]
fn test_prestige_resets_progress_and_funds_upgrades() {
    let config = builtin_config();
    let mut state = GameState::new(&config);
    state.resources.set(ResourceType::Gold, 2_000_000.0);
    state.total_earnings = 5_000_000.0;
    let (mut sim, _clock) = manual_simulation_from(config, state);
    sim.add_entity(EntityKind::Race, "human", 10).unwrap();
    sim.advance(1.0);
    let skill = sim.state().races["human"].skill(ResourceType::Gold);
    assert!(skill > 0.0);

    assert_eq!(sim.potential_prestige_points(), 2);
    let outcome = sim.perform_prestige().unwrap();
    assert_eq!(outcome.points, 2);
    assert_eq!(outcome.prestige_count, 1);

    let state = sim.state();
    assert_eq!(state.resources.get(ResourceType::Gold), 100.0);
    assert_eq!(state.prestige_points(), 2.0);
    assert_eq!(state.total_earnings, 0.0);
    assert_eq!(state.player_level, 1);
    assert_eq!(state.races["human"].count, 0);
    assert_eq!(state.races["human"].skill(ResourceType::Gold), skill);
    assert!(!state.races["fae"].unlocked);

    sim.advance(0.0);
    assert!(sim.has_achievement("first_prestige"));

    sim.buy_prestige_upgrade("cosmic_insight", 1).unwrap();
    sim.buy_prestige_upgrade("golden_start", 1).unwrap();
    assert_eq!(sim.state().prestige_points(), 0.0);
    assert_eq!(
        sim.state().permanent_multipliers[&MultiplierTarget::All],
        1.1
    );
    assert!(matches!(
        sim.buy_prestige_upgrade("cosmic_insight", 1),
        Err(GameError::InsufficientResources {
            resource: ResourceType::PrestigePoints,
            ..
        })
    ));
}

// ==========================================================================
// Determinism
// ==========================================================================

#[test]
fn test_builtin_game_is_deterministic() {
    verify_determinism(
        3,
        300,
        || {
            let (mut sim, _clock) = manual_simulation(builtin_config());
            sim.add_entity(EntityKind::Race, "human", 2).unwrap();
            sim
        },
        |sim| {
            sim.advance(5.0);
            let _ = sim.add_entity(EntityKind::Race, "dwarf", 1);
            let _ = sim.add_entity(EntityKind::Building, "farm", 1);
        },
        Simulation::state_hash,
    )
    .assert_deterministic();
}
