//! # Realms Core
//!
//! Deterministic simulation core for Eldrith Realms Idle.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No file IO
//! - No direct wall-clock reads (time comes from an injected [`clock::Clock`])
//! - No unseeded randomness
//!
//! This separation enables:
//! - Headless hosts and scripted play
//! - Offline catch-up through the same tick path as live play
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`data`] - Config tables deserialized from RON
//! - [`state`] - Mutable per-entity and global state
//! - [`production`] - Rate formulas and the production step
//! - [`unlocks`] / [`abilities`] / [`achievements`] - Threshold scans
//! - [`cost`] / [`commands`] - Pricing and gated spending
//! - [`prestige`] / [`time_warp`] - Resets and the warp window
//! - [`persistence`] - Save payloads and offline catch-up helpers
//! - [`simulation`] - The tick driver and command surface

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod achievements;
pub mod clock;
pub mod commands;
pub mod cost;
pub mod data;
pub mod error;
pub mod notifications;
pub mod persistence;
pub mod player_facade;
pub mod prestige;
pub mod production;
pub mod resources;
pub mod simulation;
pub mod state;
pub mod time_warp;
pub mod unlocks;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::AbilityStatus;
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::commands::Receipt;
    pub use crate::cost::CostAction;
    pub use crate::data::{
        AchievementCategory, BalanceConstants, BuildingData, GameConfig, PrestigeUpgradeData,
        RaceData, ResearchData,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::notifications::{Notification, NotificationKind};
    pub use crate::persistence::{SaveData, SaveEncoding};
    pub use crate::player_facade::{EntityInfo, PlayerFacade, SimulationPlayerFacade};
    pub use crate::prestige::PrestigeOutcome;
    pub use crate::resources::{Cost, MultiplierTarget, ResourcePool, ResourceType};
    pub use crate::simulation::{LoadReport, Simulation, TickEvents};
    pub use crate::state::{EntityKind, GameState};
    pub use crate::unlocks::UnlockEvent;
}
