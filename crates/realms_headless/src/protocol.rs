//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with exactly one response line
//! 4. `quit` is answered with `{"type":"bye"}` and ends the session
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","time":1700000000.0}
//! -> {"cmd":"buy","kind":"race","id":"human","quantity":2}
//! <- {"type":"ack","cmd":"buy"}
//! -> {"cmd":"tick","seconds":1.0,"count":60}
//! <- {"type":"ack","cmd":"tick"}
//! -> {"cmd":"query"}
//! <- {"type":"state","time":1700000060.0,"player_level":1,...}
//! -> {"cmd":"save","path":"saves/slot1.json","encoding":"deflate"}
//! <- {"type":"ack","cmd":"save"}
//! ```

use std::collections::BTreeMap;

use realms_core::cost::CostAction;
use realms_core::notifications::Notification;
use realms_core::persistence::SaveEncoding;
use realms_core::resources::{Cost, ResourceType};
use realms_core::simulation::{LoadReport, Simulation};
use realms_core::state::EntityKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the game `count` times by `seconds` each.
    Tick {
        /// Real seconds per step (default: 1).
        #[serde(default = "default_tick_seconds")]
        seconds: f64,
        /// Number of steps (default: 1).
        #[serde(default = "default_count")]
        count: u32,
    },

    /// Query current game state without advancing time.
    Query,

    /// Buy units of a race or building, or levels of research and prestige upgrades.
    Buy {
        /// Entity kind.
        kind: EntityKind,
        /// Config id.
        id: String,
        /// Units requested (default: 1).
        #[serde(default = "default_count")]
        quantity: u32,
    },

    /// Raise the level of an owned entity.
    Upgrade {
        /// Entity kind.
        kind: EntityKind,
        /// Config id.
        id: String,
        /// Levels requested (default: 1).
        #[serde(default = "default_count")]
        quantity: u32,
    },

    /// Ask how many of an action are affordable.
    Max {
        /// Entity kind.
        kind: EntityKind,
        /// Config id.
        id: String,
        /// Purchase or upgrade (default: purchase).
        #[serde(default = "default_action")]
        action: CostAction,
    },

    /// Flip an unlocked race ability.
    ToggleAbility {
        /// Race id.
        race: String,
        /// Ability id.
        ability: String,
    },

    /// Pick the transmutation pair, or clear it when either side is missing.
    SetTransmutation {
        /// Resource drained.
        #[serde(default)]
        from: Option<ResourceType>,
        /// Resource credited.
        #[serde(default)]
        to: Option<ResourceType>,
    },

    /// Reset for prestige points.
    Prestige,

    /// Start a time warp.
    TimeWarp,

    /// Write a save file.
    Save {
        /// Destination path.
        path: String,
        /// Payload encoding (default: json).
        #[serde(default)]
        encoding: SaveEncoding,
    },

    /// Replace the game with a save file and run offline catch-up.
    Load {
        /// Source path.
        path: String,
    },

    /// Produce an export string.
    Export,

    /// Load an export string.
    Import {
        /// Export string.
        data: String,
    },

    /// Drain pending notifications.
    Notifications,

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit the session.
    Quit,
}

fn default_tick_seconds() -> f64 {
    1.0
}

fn default_count() -> u32 {
    1
}

fn default_action() -> CostAction {
    CostAction::Purchase
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to receive commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Clock time at startup.
        time: f64,
    },

    /// Command acknowledged.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Error occurred.
    Error {
        /// Error message.
        message: String,
        /// Command that caused the error, if it parsed.
        #[serde(skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Full game state snapshot.
    State(StateSnapshot),

    /// Answer to `max`.
    MaxAffordable {
        /// Entity kind.
        kind: EntityKind,
        /// Config id.
        id: String,
        /// Action priced.
        action: CostAction,
        /// Largest affordable quantity.
        quantity: u32,
        /// Total price of that quantity.
        cost: Cost,
    },

    /// Prestige completed.
    Prestige {
        /// Points awarded.
        points: u32,
        /// Prestige count after the reset.
        prestige_count: u32,
    },

    /// Export string.
    Exported {
        /// Base64 save payload.
        data: String,
    },

    /// Save loaded.
    Loaded {
        /// Real seconds since the save was written.
        offline_seconds: f64,
        /// Offline progress rate applied.
        rate: f64,
        /// Seconds of production simulated for catch-up.
        simulated_seconds: f64,
    },

    /// Drained notifications, oldest first.
    Notifications {
        /// Notification entries.
        items: Vec<Notification>,
    },

    /// State hash for determinism verification.
    StateHash {
        /// Clock time.
        time: f64,
        /// Hash of the state.
        hash: u64,
    },

    /// Session ended.
    Bye,
}

/// Owned and unlocked entity summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Owned units (0 for research).
    pub count: u32,
    /// Current level.
    pub level: u32,
    /// Whether the entity can be bought.
    pub unlocked: bool,
}

/// Game state as reported by `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Clock time.
    pub time: f64,
    /// Player level.
    pub player_level: u32,
    /// Resource balances.
    pub resources: BTreeMap<ResourceType, f64>,
    /// Final production per second, producible resources only.
    pub rates: BTreeMap<ResourceType, f64>,
    /// Gold produced since the last prestige.
    pub total_earnings: f64,
    /// Real seconds played.
    pub total_play_time: f64,
    /// Completed prestiges.
    pub prestige_count: u32,
    /// Points a prestige would award now.
    pub potential_prestige_points: u32,
    /// Whether a time warp is running.
    pub time_warp_active: bool,
    /// Races by id.
    pub races: BTreeMap<String, EntitySnapshot>,
    /// Buildings by id.
    pub buildings: BTreeMap<String, EntitySnapshot>,
    /// Research by id.
    pub research: BTreeMap<String, EntitySnapshot>,
    /// Completed achievement ids.
    pub achievements: Vec<String>,
}

impl StateSnapshot {
    /// Capture the current state of `sim`.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        let state = sim.state();
        let races = state
            .races
            .iter()
            .map(|(id, r)| {
                let snapshot = EntitySnapshot {
                    count: r.count,
                    level: r.level,
                    unlocked: r.unlocked,
                };
                (id.clone(), snapshot)
            })
            .collect();
        let buildings = state
            .buildings
            .iter()
            .map(|(id, b)| {
                let snapshot = EntitySnapshot {
                    count: b.count,
                    level: b.level,
                    unlocked: b.unlocked,
                };
                (id.clone(), snapshot)
            })
            .collect();
        let research = state
            .research
            .iter()
            .map(|(id, r)| {
                let snapshot = EntitySnapshot {
                    count: 0,
                    level: r.level,
                    unlocked: r.unlocked,
                };
                (id.clone(), snapshot)
            })
            .collect();
        let achievements = state
            .achievements
            .values()
            .flat_map(|flags| flags.iter().filter(|(_, done)| **done).map(|(id, _)| id.clone()))
            .collect();

        Self {
            time: sim.now(),
            player_level: state.player_level,
            resources: ResourceType::ALL
                .into_iter()
                .map(|r| (r, state.resources.get(r)))
                .collect(),
            rates: ResourceType::PRODUCIBLE
                .into_iter()
                .map(|r| (r, sim.resource_rate(r)))
                .collect(),
            total_earnings: state.total_earnings,
            total_play_time: state.total_play_time,
            prestige_count: state.prestige_count,
            potential_prestige_points: sim.potential_prestige_points(),
            time_warp_active: state.time_warp.active,
            races,
            buildings,
            research,
            achievements,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(time: f64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            time,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Create a load response.
    pub fn loaded(report: LoadReport) -> Self {
        Self::Loaded {
            offline_seconds: report.offline_seconds,
            rate: report.rate,
            simulated_seconds: report.simulated_seconds,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Buy { .. } => "buy",
            Self::Upgrade { .. } => "upgrade",
            Self::Max { .. } => "max",
            Self::ToggleAbility { .. } => "toggle_ability",
            Self::SetTransmutation { .. } => "set_transmutation",
            Self::Prestige => "prestige",
            Self::TimeWarp => "time_warp",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
            Self::Export => "export",
            Self::Import { .. } => "import",
            Self::Notifications => "notifications",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_defaults() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Tick {
                seconds: 1.0,
                count: 1
            }
        );
    }

    #[test]
    fn test_parse_buy_command() {
        let json = r#"{"cmd":"buy","kind":"prestige_upgrade","id":"cosmic_insight","quantity":3}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Buy {
                kind: EntityKind::PrestigeUpgrade,
                ref id,
                quantity: 3,
            } if id == "cosmic_insight"
        ));
    }

    #[test]
    fn test_parse_max_defaults_to_purchase() {
        let cmd = Command::from_json(r#"{"cmd":"max","kind":"race","id":"human"}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::Max {
                action: CostAction::Purchase,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_save_encoding() {
        let cmd = Command::from_json(r#"{"cmd":"save","path":"a.sav","encoding":"base64"}"#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::Save {
                path: "a.sav".to_string(),
                encoding: SaveEncoding::Base64,
            }
        );
        let cmd = Command::from_json(r#"{"cmd":"save","path":"a.sav"}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::Save {
                encoding: SaveEncoding::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_transmutation() {
        let cmd = Command::from_json(r#"{"cmd":"set_transmutation","from":"wood","to":"mana"}"#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::SetTransmutation {
                from: Some(ResourceType::Wood),
                to: Some(ResourceType::Mana),
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::from_json(r#"{"cmd":"spawn"}"#).is_err());
    }

    #[test]
    fn test_command_names_match_tags() {
        for json in [
            r#"{"cmd":"query"}"#,
            r#"{"cmd":"toggle_ability","race":"human","ability":"adaptability"}"#,
            r#"{"cmd":"time_warp"}"#,
            r#"{"cmd":"notifications"}"#,
        ] {
            let cmd = Command::from_json(json).unwrap();
            let value: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(value["cmd"], cmd.name());
        }
    }

    #[test]
    fn test_response_serialization() {
        let line = Response::ack("buy").to_json_line();
        assert_eq!(line, "{\"type\":\"ack\",\"cmd\":\"buy\"}\n");

        let line = Response::error("bad", None).to_json_line();
        assert_eq!(line, "{\"type\":\"error\",\"message\":\"bad\"}\n");

        let line = Response::Bye.to_json_line();
        assert_eq!(line, "{\"type\":\"bye\"}\n");
    }

    #[test]
    fn test_max_affordable_serializes_cost_as_map() {
        let response = Response::MaxAffordable {
            kind: EntityKind::Building,
            id: "quarry".to_string(),
            action: CostAction::Purchase,
            quantity: 1,
            cost: Cost::from([(ResourceType::Gold, 100.0), (ResourceType::Wood, 50.0)]),
        };
        let value: serde_json::Value = serde_json::from_str(&response.to_json_line()).unwrap();
        assert_eq!(value["type"], "max_affordable");
        assert_eq!(value["cost"]["gold"], 100.0);
        assert_eq!(value["cost"]["wood"], 50.0);
    }
}
