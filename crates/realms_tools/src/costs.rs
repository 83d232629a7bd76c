//! Cost curve tables for balancing.
//!
//! Prices are read off a fresh game state, so discounts from achievements
//! and abilities are not included.

use std::fmt::Write as _;

use realms_core::cost::{self, CostAction};
use realms_core::data::GameConfig;
use realms_core::error::Result;
use realms_core::resources::Cost;
use realms_core::state::{EntityKind, GameState};

/// One step of a cost table.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRow {
    /// Step on the curve (owned count or level).
    pub step: u32,
    /// Price of this step alone.
    pub cost: Cost,
    /// Price of every step up to and including this one.
    pub cumulative: Cost,
}

/// The first `steps` single-step prices of `action` on `id`.
///
/// Stops early at the entity's cap.
///
/// # Errors
///
/// Returns an error if `id` is not in the config tables.
pub fn cost_table(
    config: &GameConfig,
    kind: EntityKind,
    action: CostAction,
    id: &str,
    steps: u32,
) -> Result<Vec<CostRow>> {
    let state = GameState::new(config);
    let pricing = cost::pricing(config, &state, kind, action, id)?;
    let steps = pricing.remaining.map_or(steps, |cap| cap.min(steps));

    let mut cumulative = Cost::new();
    let rows = (0..steps)
        .map(|i| {
            let step = pricing.step + i;
            let cost = pricing.curve.cost_at(step);
            cumulative.accumulate(&cost);
            CostRow {
                step,
                cost,
                cumulative: cumulative.clone(),
            }
        })
        .collect();
    Ok(rows)
}

/// `"100.00 gold, 50.00 wood"`.
#[must_use]
pub fn format_cost(cost: &Cost) -> String {
    let parts: Vec<String> = cost
        .iter()
        .map(|(resource, amount)| format!("{amount:.2} {resource}"))
        .collect();
    if parts.is_empty() {
        "free".to_string()
    } else {
        parts.join(", ")
    }
}

/// Render `rows` as a plain-text table.
#[must_use]
pub fn render_table(rows: &[CostRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>6}  {:<40}  total", "step", "cost");
    for row in rows {
        let _ = writeln!(
            out,
            "{:>6}  {:<40}  {}",
            row.step,
            format_cost(&row.cost),
            format_cost(&row.cumulative)
        );
    }
    out
}
