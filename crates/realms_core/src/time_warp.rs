//! Time warp: a cooldown-gated window in which elapsed time is multiplied.
//!
//! The warp is a data flag checked every tick, never a scheduled callback.

use tracing::info;

use crate::data::GameConfig;
use crate::error::{GameError, Result};
use crate::prestige;
use crate::state::GameState;

/// Start a warp at clock time `now`. Returns the warp's end time.
///
/// # Errors
///
/// Returns [`GameError::TimeWarpUnavailable`] if a warp is running or the
/// cooldown has not elapsed.
pub fn activate(config: &GameConfig, state: &mut GameState, now: f64) -> Result<f64> {
    let warp = &mut state.time_warp;
    if warp.active {
        return Err(GameError::TimeWarpUnavailable("already active".to_string()));
    }
    if now < warp.cooldown_end {
        return Err(GameError::TimeWarpUnavailable(format!(
            "cooling down for {:.0}s",
            warp.cooldown_end - now
        )));
    }
    warp.active = true;
    warp.end_time = now + config.balance.time_warp_duration;
    warp.cooldown_end = now + config.balance.time_warp_cooldown;
    info!(end_time = warp.end_time, "Time warp activated");
    Ok(warp.end_time)
}

/// Outcome of checking the warp at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WarpTick {
    /// No warp running.
    Idle,
    /// Warp running; elapsed time is multiplied by the factor.
    Warped(f64),
    /// The warp ended before this tick.
    Expired,
}

/// Check the warp at clock time `now`, expiring it once its end has passed.
pub fn tick(config: &GameConfig, state: &mut GameState, now: f64) -> WarpTick {
    if !state.time_warp.active {
        return WarpTick::Idle;
    }
    if now < state.time_warp.end_time {
        return WarpTick::Warped(prestige::time_warp_multiplier(config, state));
    }
    state.time_warp.active = false;
    info!("Time warp ended");
    WarpTick::Expired
}
