//! Save payloads, encodings, and offline catch-up helpers.
//!
//! A save is a versioned JSON object. It can be written as plain JSON,
//! zlib-compressed JSON, or a base64 string of the compressed form for
//! clipboard export. [`decode`] detects which one it was given.
//!
//! Loading never trusts the payload's shape: the saved records are merged
//! into a fresh default state built from the current config, so entities
//! added or removed since the save was written are handled gracefully.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{AchievementCategory, GameConfig};
use crate::error::{GameError, Result};
use crate::resources::{MultiplierTarget, ResourcePool, ResourceType};
use crate::state::{
    BuildingState, GameState, PrestigeUpgradeState, RaceState, ResearchState, TimeWarpState,
    Transmutation,
};

/// Save format version written by this build.
pub const SAVE_VERSION: u32 = 1;

/// Serialized snapshot of a [`GameState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version.
    pub version: u32,
    /// Clock time the save was written.
    #[serde(default)]
    pub save_time: f64,
    /// Resource balances.
    #[serde(default)]
    pub resources: ResourcePool,
    /// Race records.
    #[serde(default)]
    pub races: BTreeMap<String, RaceState>,
    /// Building records.
    #[serde(default)]
    pub buildings: BTreeMap<String, BuildingState>,
    /// Research records.
    #[serde(default)]
    pub research: BTreeMap<String, ResearchState>,
    /// Prestige upgrade levels.
    #[serde(default)]
    pub prestige_upgrades: BTreeMap<String, PrestigeUpgradeState>,
    /// Achievement flags by category.
    #[serde(default)]
    pub achievements: BTreeMap<AchievementCategory, BTreeMap<String, bool>>,
    /// Player level.
    #[serde(default)]
    pub player_level: u32,
    /// Gold produced since the last prestige.
    #[serde(default)]
    pub total_earnings: f64,
    /// Completed prestiges.
    #[serde(default)]
    pub prestige_count: u32,
    /// Spendable prestige points, mirrored from the resource balance.
    ///
    /// Overrides `resources.prestige_points` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestige_points: Option<f64>,
    /// Prestige points ever earned.
    #[serde(default)]
    pub total_prestige_points: f64,
    /// Permanent multipliers.
    #[serde(default)]
    pub permanent_multipliers: BTreeMap<MultiplierTarget, f64>,
    /// Real seconds played.
    #[serde(default)]
    pub total_play_time: f64,
    /// Simulated production seconds.
    #[serde(default)]
    pub total_simulated_time: f64,
    /// Time warp flags.
    #[serde(default)]
    pub time_warp: TimeWarpState,
    /// Transmutation pair.
    #[serde(default)]
    pub transmutation: Option<Transmutation>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

impl SaveData {
    /// Snapshot `state` at clock time `save_time`.
    #[must_use]
    pub fn capture(state: &GameState, save_time: f64) -> Self {
        Self {
            version: SAVE_VERSION,
            save_time,
            resources: state.resources.clone(),
            races: state.races.clone(),
            buildings: state.buildings.clone(),
            research: state.research.clone(),
            prestige_upgrades: state.prestige_upgrades.clone(),
            achievements: state.achievements.clone(),
            player_level: state.player_level,
            total_earnings: state.total_earnings,
            prestige_count: state.prestige_count,
            prestige_points: Some(state.prestige_points()),
            total_prestige_points: state.total_prestige_points,
            permanent_multipliers: state.permanent_multipliers.clone(),
            total_play_time: state.total_play_time,
            total_simulated_time: state.total_simulated_time,
            time_warp: state.time_warp,
            transmutation: state.transmutation,
        }
    }

    /// Merge the snapshot into a fresh state for `config`.
    ///
    /// Records for ids no longer in the config are dropped; ids missing from
    /// the snapshot keep their defaults.
    #[must_use]
    pub fn restore(self, config: &GameConfig) -> GameState {
        let mut state = GameState::new(config);
        state.prestige_count = self.prestige_count;
        state.reset_progression(config);

        state.resources = self.resources;
        state.resources.backfill();
        if let Some(points) = self.prestige_points {
            state.resources.set(ResourceType::PrestigePoints, points);
        }

        for (id, saved) in self.races {
            let Some(fresh) = state.races.get_mut(&id) else {
                debug!(race = %id, "Dropping saved race missing from config");
                continue;
            };
            fresh.count = saved.count;
            fresh.level = saved.level.max(1);
            fresh.unlocked |= saved.unlocked;
            for (ability, flags) in saved.abilities {
                if let Some(slot) = fresh.abilities.get_mut(&ability) {
                    *slot = flags;
                }
            }
            fresh.skills.extend(saved.skills);
        }
        for (id, saved) in self.buildings {
            if let Some(fresh) = state.buildings.get_mut(&id) {
                fresh.count = saved.count;
                fresh.level = saved.level.max(1);
                fresh.unlocked |= saved.unlocked;
            }
        }
        for (id, saved) in self.research {
            if let Some(fresh) = state.research.get_mut(&id) {
                fresh.level = saved.level;
                fresh.unlocked |= saved.unlocked;
            }
        }
        for (id, saved) in self.prestige_upgrades {
            if let Some(fresh) = state.prestige_upgrades.get_mut(&id) {
                *fresh = saved;
            }
        }
        for (category, flags) in self.achievements {
            let Some(known) = state.achievements.get_mut(&category) else {
                continue;
            };
            for (id, done) in flags {
                if let Some(slot) = known.get_mut(&id) {
                    *slot = done;
                }
            }
        }

        state.player_level = self.player_level.max(1);
        state.total_earnings = self.total_earnings;
        state.total_prestige_points = self.total_prestige_points;
        if !self.permanent_multipliers.is_empty() {
            state.permanent_multipliers = self.permanent_multipliers;
        }
        state.total_play_time = self.total_play_time;
        state.total_simulated_time = self.total_simulated_time;
        state.time_warp = self.time_warp;
        state.transmutation = self.transmutation;
        state
    }
}

/// How a save payload is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveEncoding {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Zlib-compressed JSON.
    Deflate,
    /// Base64 of the zlib-compressed JSON.
    Base64,
}

fn corrupt(context: &str, err: impl std::fmt::Display) -> GameError {
    GameError::CorruptSaveData(format!("{context}: {err}"))
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let fail = |e: std::io::Error| GameError::InvalidState(format!("Failed to compress save: {e}"));
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).map_err(fail)?;
    encoder.finish().map_err(fail)
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| corrupt("decompression failed", e))?;
    Ok(out)
}

/// Encode `data` in the requested form.
///
/// # Errors
///
/// Returns [`GameError::InvalidState`] if serialization or compression fails.
pub fn encode(data: &SaveData, encoding: SaveEncoding) -> Result<Vec<u8>> {
    let json = serde_json::to_vec_pretty(data)
        .map_err(|e| GameError::InvalidState(format!("Failed to serialize save: {e}")))?;
    match encoding {
        SaveEncoding::Json => Ok(json),
        SaveEncoding::Deflate => deflate(&json),
        SaveEncoding::Base64 => Ok(STANDARD.encode(deflate(&json)?).into_bytes()),
    }
}

fn looks_like_zlib(bytes: &[u8]) -> bool {
    // CMF 0x78 with a header checksum divisible by 31.
    matches!(bytes, [0x78, flg, ..] if ((0x78_u16 << 8) | u16::from(*flg)) % 31 == 0)
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn parse_json(bytes: &[u8]) -> Result<SaveData> {
    let header: VersionHeader =
        serde_json::from_slice(bytes).map_err(|e| corrupt("invalid save payload", e))?;
    if header.version > SAVE_VERSION {
        return Err(GameError::UnsupportedSaveVersion {
            found: header.version,
            supported: SAVE_VERSION,
        });
    }
    serde_json::from_slice(bytes).map_err(|e| corrupt("invalid save payload", e))
}

/// Decode a payload written by [`encode`] in any encoding.
///
/// # Errors
///
/// Returns [`GameError::CorruptSaveData`] if the payload cannot be decoded,
/// and [`GameError::UnsupportedSaveVersion`] if it was written by a newer
/// format.
pub fn decode(bytes: &[u8]) -> Result<SaveData> {
    let trimmed = trim(bytes);
    if trimmed.first() == Some(&b'{') {
        return parse_json(trimmed);
    }
    if looks_like_zlib(trimmed) {
        return parse_json(&inflate(trimmed)?);
    }
    let raw = STANDARD
        .decode(trimmed)
        .map_err(|e| corrupt("unrecognized save encoding", e))?;
    if raw.first() == Some(&b'{') {
        parse_json(&raw)
    } else {
        parse_json(&inflate(&raw)?)
    }
}

/// Seconds since `save_time`, clamped at zero when the clock went backwards.
#[must_use]
pub fn offline_elapsed(save_time: f64, now: f64) -> f64 {
    let elapsed = now - save_time;
    if elapsed.is_finite() && elapsed >= 0.0 {
        elapsed
    } else {
        warn!(save_time, now, "Clock is behind the save timestamp; skipping offline progress");
        0.0
    }
}

/// Format a duration as `Xh Ym`, `Ym Zs`, or `Zs`.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let (hours, minutes, secs) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// The notification text shown after offline catch-up.
#[must_use]
pub fn welcome_message(elapsed: f64, rate: f64) -> String {
    format!(
        "Welcome back! Offline: {} ({:.0}% rate).",
        format_duration(elapsed),
        rate * 100.0
    )
}
