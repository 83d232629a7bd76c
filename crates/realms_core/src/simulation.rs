//! The simulation driver.
//!
//! [`Simulation`] owns the config tables, the mutable state, the clock, the
//! random number generator, and the notification feed. Every gameplay change
//! goes through it: time advances through [`Simulation::advance`], and
//! commands are gated by the cost engine before touching the state.

use std::sync::Arc;

use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abilities::{self, AbilityStatus};
use crate::achievements;
use crate::clock::{Clock, SystemClock};
use crate::commands::{self, Receipt};
use crate::cost::{self, CostAction};
use crate::data::{AchievementCategory, GameConfig};
use crate::error::{GameError, Result};
use crate::notifications::{Notification, NotificationKind, Notifications};
use crate::persistence::{self, SaveData, SaveEncoding};
use crate::prestige::{self, PrestigeOutcome};
use crate::production::{self, GameRng, ProductionReport, RateModel};
use crate::resources::{Cost, ResourceType};
use crate::state::{EntityKind, GameState, Transmutation};
use crate::time_warp::{self, WarpTick};
use crate::unlocks::{self, UnlockEvent};

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 0x5EED_1D1E;

/// Everything that happened during one tick.
///
/// Hosts can use these to drive effects; the same information also lands in
/// the notification feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Seconds of production simulated, after warp scaling.
    pub simulated_seconds: f64,
    /// Production results.
    pub production: ProductionReport,
    /// Level-ups and unlocks, in scan order.
    pub unlocks: Vec<UnlockEvent>,
    /// Ids of achievements completed this tick.
    pub achievements: Vec<String>,
    /// Whether the time warp ended before this tick.
    pub warp_expired: bool,
}

/// What a load did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Real seconds between the save and the load.
    pub offline_seconds: f64,
    /// Offline progress rate used.
    pub rate: f64,
    /// Seconds of production simulated for catch-up.
    pub simulated_seconds: f64,
}

/// The idle game simulation.
///
/// # Tick Order
///
/// Each call to [`advance`](Self::advance) runs:
/// 1. **Time warp** - scale elapsed time, or expire the warp
/// 2. **Production** - special effects, then ordinary generation
/// 3. **Unlocks** - player level, races, abilities, buildings, research
/// 4. **Achievements** - mark newly satisfied milestones
#[derive(Debug)]
pub struct Simulation {
    config: Arc<GameConfig>,
    state: GameState,
    clock: Box<dyn Clock>,
    rng: GameRng,
    notifications: Notifications,
}

impl Simulation {
    /// A new game on the system clock with the default seed.
    #[must_use]
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self::with_clock(config, SystemClock, DEFAULT_SEED)
    }

    /// A new game on `clock`, seeding the random number generator with `seed`.
    #[must_use]
    pub fn with_clock(config: Arc<GameConfig>, clock: impl Clock + 'static, seed: u64) -> Self {
        let state = GameState::new(&config);
        Self::from_state(config, state, clock, seed)
    }

    /// Resume from an existing state.
    #[must_use]
    pub fn from_state(
        config: Arc<GameConfig>,
        state: GameState,
        clock: impl Clock + 'static,
        seed: u64,
    ) -> Self {
        let notifications = Notifications::new(config.balance.notification_capacity);
        Self {
            config,
            state,
            clock: Box::new(clock),
            rng: GameRng::seed_from_u64(seed),
            notifications,
        }
    }

    /// Config tables.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Shared handle to the config tables.
    #[must_use]
    pub fn shared_config(&self) -> Arc<GameConfig> {
        Arc::clone(&self.config)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Current clock time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Advance the game by `elapsed` real seconds.
    ///
    /// Negative or non-finite durations are treated as zero. Real time goes to
    /// `total_play_time`; warp-scaled time drives production and goes to
    /// `total_simulated_time`.
    pub fn advance(&mut self, elapsed: f64) -> TickEvents {
        let real = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let now = self.clock.now();

        let mut scaled = real;
        let mut warp_expired = false;
        match time_warp::tick(&self.config, &mut self.state, now) {
            WarpTick::Idle => {}
            WarpTick::Warped(multiplier) => scaled *= multiplier,
            WarpTick::Expired => {
                warp_expired = true;
                self.notifications
                    .push(NotificationKind::Info, "Time warp has ended.", now);
            }
        }
        self.state.total_play_time += real;

        let mut events = self.simulate(scaled, now);
        events.warp_expired = warp_expired;
        events
    }

    fn simulate(&mut self, dt: f64, now: f64) -> TickEvents {
        let config = &*self.config;
        self.state.total_simulated_time += dt;

        let production = production::advance(config, &mut self.state, dt, now, &mut self.rng);
        for message in &production.messages {
            self.notifications
                .push(NotificationKind::Info, message.as_str(), now);
        }

        let unlocks = unlocks::refresh(config, &mut self.state);
        for event in &unlocks {
            self.notifications
                .push(NotificationKind::Unlock, event.to_string(), now);
        }

        let completed = achievements::evaluate(config, &mut self.state);
        for achievement in &completed {
            self.notifications.push(
                NotificationKind::Achievement,
                format!("Achievement unlocked: {}!", achievement.name),
                now,
            );
        }

        TickEvents {
            simulated_seconds: dt,
            production,
            unlocks,
            achievements: completed.into_iter().map(|a| a.id.clone()).collect(),
            warp_expired: false,
        }
    }

    /// Side-effect-free affordability check.
    #[must_use]
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.state.resources.can_afford(cost)
    }

    /// Deduct `cost`, or change nothing if any resource falls short.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] naming the first shortfall.
    pub fn spend(&mut self, cost: &Cost) -> Result<()> {
        self.state.resources.spend(cost)
    }

    /// Price of buying `count` more units of entity `id`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidEntityId`] for an unknown id.
    pub fn purchase_cost(&self, kind: EntityKind, id: &str, count: u32) -> Result<Cost> {
        Ok(cost::pricing(&self.config, &self.state, kind, CostAction::Purchase, id)?.bulk_cost(count))
    }

    /// Price of raising entity `id` by `count` levels.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidEntityId`] for an unknown id.
    pub fn upgrade_cost(&self, kind: EntityKind, id: &str, count: u32) -> Result<Cost> {
        Ok(cost::pricing(&self.config, &self.state, kind, CostAction::Upgrade, id)?.bulk_cost(count))
    }

    /// Largest quantity of `action` on `id` affordable right now, within the cap.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidEntityId`] for an unknown id.
    pub fn max_affordable(&self, kind: EntityKind, action: CostAction, id: &str) -> Result<u32> {
        Ok(cost::pricing(&self.config, &self.state, kind, action, id)?
            .max_affordable(&self.state.resources))
    }

    /// Recruit races or construct buildings.
    ///
    /// # Errors
    ///
    /// See [`commands::execute`].
    pub fn add_entity(&mut self, kind: EntityKind, id: &str, quantity: u32) -> Result<Receipt> {
        let receipt =
            commands::execute(&self.config, &mut self.state, kind, CostAction::Purchase, id, quantity)?;
        if kind == EntityKind::Building {
            self.check_building_achievements();
        }
        Ok(receipt)
    }

    /// Raise the level of a race or building.
    ///
    /// # Errors
    ///
    /// See [`commands::execute`].
    pub fn upgrade_entity(&mut self, kind: EntityKind, id: &str, quantity: u32) -> Result<Receipt> {
        let receipt =
            commands::execute(&self.config, &mut self.state, kind, CostAction::Upgrade, id, quantity)?;
        if kind == EntityKind::Building {
            self.check_building_achievements();
        }
        Ok(receipt)
    }

    /// Building milestones take effect before the next purchase, not the next tick.
    fn check_building_achievements(&mut self) {
        let config = &*self.config;
        let now = self.clock.now();
        let completed = achievements::evaluate_category(
            config,
            &mut self.state,
            AchievementCategory::BuildingMilestones,
        );
        for achievement in completed {
            self.notifications.push(
                NotificationKind::Achievement,
                format!("Achievement unlocked: {}!", achievement.name),
                now,
            );
        }
    }

    /// Research `levels` levels of `id`.
    ///
    /// # Errors
    ///
    /// See [`commands::execute`].
    pub fn research(&mut self, id: &str, levels: u32) -> Result<Receipt> {
        self.upgrade_entity(EntityKind::Research, id, levels)
    }

    /// Buy `levels` levels of prestige upgrade `id`.
    ///
    /// # Errors
    ///
    /// See [`commands::execute`].
    pub fn buy_prestige_upgrade(&mut self, id: &str, levels: u32) -> Result<Receipt> {
        self.upgrade_entity(EntityKind::PrestigeUpgrade, id, levels)
    }

    /// Flip an unlocked race ability. Returns the new active flag.
    ///
    /// # Errors
    ///
    /// See [`abilities::toggle`].
    pub fn toggle_ability(&mut self, race: &str, ability: &str) -> Result<bool> {
        let active = abilities::toggle(&self.config, &mut self.state, race, ability)?;
        if let Some(data) = self.config.race(race).and_then(|r| r.ability(ability)) {
            let verb = if active { "activated" } else { "deactivated" };
            self.notifications.push(
                NotificationKind::Info,
                format!("{} {verb}.", data.name),
                self.clock.now(),
            );
        }
        Ok(active)
    }

    /// Status of one race ability.
    #[must_use]
    pub fn ability_status(&self, race: &str, ability: &str) -> Option<AbilityStatus> {
        abilities::status(&self.state, race, ability)
    }

    /// Reset for prestige points.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PrestigeNotAvailable`] when no points would be
    /// earned. The state is untouched in that case.
    pub fn perform_prestige(&mut self) -> Result<PrestigeOutcome> {
        let outcome = prestige::perform(&self.config, &mut self.state)?;
        self.notifications.push(
            NotificationKind::Info,
            format!(
                "Prestige complete! Gained {} prestige points.",
                outcome.points
            ),
            self.clock.now(),
        );
        Ok(outcome)
    }

    /// Start a time warp. Returns the clock time it ends.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TimeWarpUnavailable`] while a warp runs or cools down.
    pub fn activate_time_warp(&mut self) -> Result<f64> {
        let now = self.clock.now();
        let end = time_warp::activate(&self.config, &mut self.state, now)?;
        let multiplier = prestige::time_warp_multiplier(&self.config, &self.state);
        self.notifications.push(
            NotificationKind::Info,
            format!(
                "Time warp activated! Time flows {multiplier}x faster for {}.",
                persistence::format_duration(end - now)
            ),
            now,
        );
        Ok(end)
    }

    /// Select the transmutation source and target.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTransmutation`] unless both are distinct
    /// producible resources.
    pub fn set_transmutation(&mut self, from: ResourceType, to: ResourceType) -> Result<()> {
        if from == to || !from.is_producible() || !to.is_producible() {
            return Err(GameError::InvalidTransmutation { from, to });
        }
        self.state.transmutation = Some(Transmutation { from, to });
        debug!(%from, %to, "Transmutation target set");
        Ok(())
    }

    /// Stop transmuting.
    pub fn clear_transmutation(&mut self) {
        self.state.transmutation = None;
    }

    /// Encode the current state as a save payload.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if encoding fails.
    pub fn serialize(&mut self, encoding: SaveEncoding) -> Result<Vec<u8>> {
        let now = self.clock.now();
        let bytes = persistence::encode(&SaveData::capture(&self.state, now), encoding)?;
        self.notifications
            .push(NotificationKind::Save, "Game saved.", now);
        Ok(bytes)
    }

    /// Replace the state with a decoded save, then run offline catch-up.
    ///
    /// An undecodable payload resets to a new game and posts an error
    /// notification before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::CorruptSaveData`], after resetting to a new game,
    /// or [`GameError::UnsupportedSaveVersion`], leaving the current game as is.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<LoadReport> {
        let now = self.clock.now();
        let data = match persistence::decode(bytes) {
            Ok(data) => data,
            Err(err @ GameError::UnsupportedSaveVersion { .. }) => {
                warn!(error = %err, "Save is from a newer version; keeping current game");
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Failed to load save: {err}."),
                    now,
                );
                return Err(err);
            }
            Err(err) => {
                warn!(error = %err, "Save could not be loaded; starting a new game");
                self.state = GameState::new(&self.config);
                self.notifications.push(
                    NotificationKind::Error,
                    format!("Failed to load save: {err}. Starting a new game."),
                    now,
                );
                return Err(err);
            }
        };
        let save_time = data.save_time;
        self.state = data.restore(&self.config);
        info!(save_time, "Save loaded");
        Ok(self.catch_up(save_time, now))
    }

    fn catch_up(&mut self, save_time: f64, now: f64) -> LoadReport {
        let offline = persistence::offline_elapsed(save_time, now);
        let rate = prestige::offline_rate(&self.config, &self.state);
        let mut report = LoadReport {
            offline_seconds: offline,
            rate,
            simulated_seconds: 0.0,
        };
        if offline <= 0.0 {
            return report;
        }
        report.simulated_seconds = offline * rate;
        self.simulate(report.simulated_seconds, now);
        self.notifications.push(
            NotificationKind::Info,
            persistence::welcome_message(offline, rate),
            now,
        );
        report
    }

    /// The current state as a base64 export string.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if encoding fails.
    pub fn export(&mut self) -> Result<String> {
        let bytes = self.serialize(SaveEncoding::Base64)?;
        String::from_utf8(bytes).map_err(|e| GameError::InvalidState(e.to_string()))
    }

    /// Load an export string. See [`deserialize`](Self::deserialize).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::CorruptSaveData`] or
    /// [`GameError::UnsupportedSaveVersion`].
    pub fn import(&mut self, data: &str) -> Result<LoadReport> {
        self.deserialize(data.as_bytes())
    }

    /// Final production per second of `resource`.
    #[must_use]
    pub fn resource_rate(&self, resource: ResourceType) -> f64 {
        RateModel::new(&self.config, &self.state, self.clock.now()).rate(resource)
    }

    /// Prestige points a reset would award now.
    #[must_use]
    pub fn potential_prestige_points(&self) -> u32 {
        prestige::potential_points(&self.config.balance, self.state.total_earnings)
    }

    /// Whether achievement `id` is complete.
    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.state.has_achievement(id)
    }

    /// Deterministic hash of the state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Pending notifications, oldest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    /// Remove and return every pending notification.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}
