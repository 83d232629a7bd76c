//! Headless game runner implementation.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use realms_core::clock::{Clock, ManualClock, SystemClock};
use realms_core::cost::CostAction;
use realms_core::data::GameConfig;
use realms_core::error::GameError;
use realms_core::resources::Cost;
use realms_core::simulation::{Simulation, DEFAULT_SEED};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::{Command, Response, StateSnapshot};
use crate::save_store::{self, SaveStoreError};

/// Why a command failed.
#[derive(Error, Debug)]
enum SessionError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Save(#[from] SaveStoreError),
    #[error("{0}")]
    InvalidArgument(String),
}

/// Headless runner configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Output state after every tick (vs only on query).
    pub auto_state_output: bool,
    /// Seed for the simulation's random effects.
    pub seed: u64,
    /// Clock reading at startup. Defaults to the system time.
    pub start_time: Option<f64>,
    /// Save file to load on startup.
    pub load_path: Option<PathBuf>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            auto_state_output: false,
            seed: DEFAULT_SEED,
            start_time: None,
            load_path: None,
        }
    }
}

/// One game driven by protocol commands.
///
/// Time only moves on `tick`: the session owns a manual clock that starts at
/// the configured time and advances with each step.
pub struct Session {
    sim: Simulation,
    clock: ManualClock,
    auto_state_output: bool,
}

impl Session {
    /// Start a new game.
    #[must_use]
    pub fn new(game: Arc<GameConfig>, config: &HeadlessConfig) -> Self {
        let start = config.start_time.unwrap_or_else(|| SystemClock.now());
        let clock = ManualClock::new(start);
        let sim = Simulation::with_clock(game, clock.clone(), config.seed);
        Self {
            sim,
            clock,
            auto_state_output: config.auto_state_output,
        }
    }

    /// The game being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Current clock time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Run one command and produce its response.
    pub fn handle(&mut self, command: Command) -> Response {
        let name = command.name();
        match self.try_handle(command) {
            Ok(response) => response,
            Err(e) => {
                debug!(cmd = name, error = %e, "Command rejected");
                Response::error(e.to_string(), Some(name))
            }
        }
    }

    fn try_handle(&mut self, command: Command) -> Result<Response, SessionError> {
        let name = command.name();
        let response = match command {
            Command::Tick { seconds, count } => {
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(SessionError::InvalidArgument(format!(
                        "Tick length must be a non-negative number, got {seconds}"
                    )));
                }
                for _ in 0..count {
                    self.clock.advance(seconds);
                    self.sim.advance(seconds);
                }
                if self.auto_state_output {
                    Response::State(StateSnapshot::capture(&self.sim))
                } else {
                    Response::ack(name)
                }
            }

            Command::Query => Response::State(StateSnapshot::capture(&self.sim)),

            Command::Buy { kind, id, quantity } => {
                self.sim.add_entity(kind, &id, quantity)?;
                Response::ack(name)
            }

            Command::Upgrade { kind, id, quantity } => {
                self.sim.upgrade_entity(kind, &id, quantity)?;
                Response::ack(name)
            }

            Command::Max { kind, id, action } => {
                let quantity = self.sim.max_affordable(kind, action, &id)?;
                let cost = match (quantity, action) {
                    (0, _) => Cost::new(),
                    (n, CostAction::Purchase) => self.sim.purchase_cost(kind, &id, n)?,
                    (n, CostAction::Upgrade) => self.sim.upgrade_cost(kind, &id, n)?,
                };
                Response::MaxAffordable {
                    kind,
                    id,
                    action,
                    quantity,
                    cost,
                }
            }

            Command::ToggleAbility { race, ability } => {
                self.sim.toggle_ability(&race, &ability)?;
                Response::ack(name)
            }

            Command::SetTransmutation { from, to } => {
                match (from, to) {
                    (Some(from), Some(to)) => self.sim.set_transmutation(from, to)?,
                    _ => self.sim.clear_transmutation(),
                }
                Response::ack(name)
            }

            Command::Prestige => {
                let outcome = self.sim.perform_prestige()?;
                Response::Prestige {
                    points: outcome.points,
                    prestige_count: outcome.prestige_count,
                }
            }

            Command::TimeWarp => {
                let end = self.sim.activate_time_warp()?;
                debug!(end, "Time warp started");
                Response::ack(name)
            }

            Command::Save { path, encoding } => {
                let bytes = self.sim.serialize(encoding)?;
                save_store::write_save(Path::new(&path), &bytes)?;
                info!(%path, ?encoding, "Game saved");
                Response::ack(name)
            }

            Command::Load { path } => {
                let bytes = save_store::read_save(Path::new(&path))?;
                Response::loaded(self.sim.deserialize(&bytes)?)
            }

            Command::Export => Response::Exported {
                data: self.sim.export()?,
            },

            Command::Import { data } => Response::loaded(self.sim.import(&data)?),

            Command::Notifications => Response::Notifications {
                items: self.sim.drain_notifications(),
            },

            Command::Hash => Response::StateHash {
                time: self.clock.now(),
                hash: self.sim.state_hash(),
            },

            Command::Quit => Response::Bye,
        };
        Ok(response)
    }
}

/// Headless runner for scripted gameplay.
pub struct HeadlessRunner {
    game: Arc<GameConfig>,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Create a new headless runner with default config.
    #[must_use]
    pub fn new(game: Arc<GameConfig>) -> Self {
        Self::with_config(game, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    #[must_use]
    pub fn with_config(game: Arc<GameConfig>, config: HeadlessConfig) -> Self {
        Self { game, config }
    }

    /// Run the headless game loop.
    ///
    /// Reads JSON commands from stdin, outputs responses to stdout.
    pub fn run(self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run the game loop over arbitrary streams.
    ///
    /// Returns when `quit` is received or the input ends.
    pub fn run_with<R: BufRead, W: Write>(self, input: R, mut output: W) -> io::Result<()> {
        let mut session = Session::new(Arc::clone(&self.game), &self.config);

        if let Some(path) = &self.config.load_path {
            let response = session.handle(Command::Load {
                path: path.display().to_string(),
            });
            if let Response::Error { message, .. } = &response {
                warn!(path = %path.display(), %message, "Startup load failed; starting a new game");
            }
        }

        // Output ready message
        write_response(&mut output, &Response::ready(session.now()))?;

        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match Command::from_json(trimmed) {
                Ok(command) => session.handle(command),
                Err(e) => Response::error(format!("Parse error: {e}"), None),
            };
            write_response(&mut output, &response)?;

            if matches!(response, Response::Bye) {
                info!("Quit received");
                return Ok(());
            }
        }

        info!("Input closed");
        Ok(())
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use realms_core::resources::ResourceType;
    use realms_core::state::EntityKind;
    use realms_test_utils::fixtures::{small_config, START_TIME};

    fn session() -> Session {
        let config = HeadlessConfig {
            start_time: Some(START_TIME),
            ..HeadlessConfig::default()
        };
        Session::new(small_config(), &config)
    }

    fn buy(kind: EntityKind, id: &str, quantity: u32) -> Command {
        Command::Buy {
            kind,
            id: id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_tick_advances_clock_and_production() {
        let mut session = session();
        assert_eq!(session.handle(buy(EntityKind::Race, "human", 1)), Response::ack("buy"));
        let response = session.handle(Command::Tick {
            seconds: 2.0,
            count: 5,
        });
        assert_eq!(response, Response::ack("tick"));
        assert_eq!(session.now(), START_TIME + 10.0);
        let gold = session.simulation().state().resources.get(ResourceType::Gold);
        assert!((gold - 100.0).abs() < 1e-9, "{gold}");
    }

    #[test]
    fn test_negative_tick_rejected() {
        let mut session = session();
        let response = session.handle(Command::Tick {
            seconds: -1.0,
            count: 1,
        });
        assert!(matches!(response, Response::Error { cmd: Some(ref c), .. } if c == "tick"));
        assert_eq!(session.now(), START_TIME);
    }

    #[test]
    fn test_game_errors_become_error_responses() {
        let mut session = session();
        let response = session.handle(buy(EntityKind::Building, "market", 1));
        assert!(matches!(response, Response::Error { ref message, .. } if message.contains("market")));
    }

    #[test]
    fn test_max_reports_quantity_and_cost() {
        let mut session = session();
        let response = session.handle(Command::Max {
            kind: EntityKind::Race,
            id: "human".to_string(),
            action: CostAction::Purchase,
        });
        let Response::MaxAffordable { quantity, cost, .. } = response else {
            panic!("unexpected response: {response:?}");
        };
        assert_eq!(quantity, 6);
        assert!(cost.get(ResourceType::Gold) <= 100.0);
    }

    #[test]
    fn test_auto_state_output() {
        let config = HeadlessConfig {
            auto_state_output: true,
            start_time: Some(START_TIME),
            ..HeadlessConfig::default()
        };
        let mut session = Session::new(small_config(), &config);
        let response = session.handle(Command::Tick {
            seconds: 1.0,
            count: 1,
        });
        let Response::State(snapshot) = response else {
            panic!("expected state, got {response:?}");
        };
        assert_eq!(snapshot.time, START_TIME + 1.0);
        assert_eq!(snapshot.player_level, 1);
    }

    #[test]
    fn test_run_with_writes_ready_first_and_stops_at_quit() {
        let input = "{\"cmd\":\"hash\"}\nnot json\n\n{\"cmd\":\"quit\"}\n{\"cmd\":\"query\"}\n";
        let mut output = Vec::new();
        let config = HeadlessConfig {
            start_time: Some(START_TIME),
            ..HeadlessConfig::default()
        };
        HeadlessRunner::with_config(small_config(), config)
            .run_with(input.as_bytes(), &mut output)
            .unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["type"], "ready");
        assert_eq!(lines[1]["type"], "state_hash");
        assert_eq!(lines[2]["type"], "error");
        assert_eq!(lines[3]["type"], "bye");
    }
}
