//! Headless game runner for scripted play and CI verification.
//!
//! This crate hosts a [`realms_core`] simulation without any UI. It can be
//! controlled via JSON commands on stdin, with responses on stdout. This
//! enables:
//!
//! - **Bots and tooling**: drive a game from any language over a pipe
//! - **CI verification**: check determinism and save compatibility
//! - **Balance runs**: play a scripted strategy for hours of game time
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, buy, save, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See the [`protocol`] module for every command and response.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","seconds":1.0,"count":60}' | cargo run -p realms_headless
//!
//! # Play the greedy strategy for two hours of game time
//! cargo run -p realms_headless -- simulate --duration 7200 --strategy greedy
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod data_loader;
pub mod protocol;
pub mod runner;
pub mod save_store;
pub mod simulate;
pub mod strategies;

pub use data_loader::{default_data_dir, load_config, DataLoadError};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner, Session};
pub use save_store::SaveStoreError;
pub use simulate::{run_simulation, SimulateConfig, SimulationSummary};
pub use strategies::{Strategy, StrategyError, StrategyExecutor};
