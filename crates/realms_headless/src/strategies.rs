//! Scripted auto-play strategies for headless playtesting.
//!
//! A strategy is a greedy spending policy: every decision it walks its
//! priority list and buys as much of each unlocked entity as it can afford.

use std::path::Path;

use realms_core::cost::CostAction;
use realms_core::player_facade::PlayerFacade;
use realms_core::state::EntityKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// A complete auto-play strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Entity kinds to spend on, highest priority first.
    pub priorities: Vec<EntityKind>,
    /// Also level up owned races and buildings.
    #[serde(default)]
    pub upgrade_owned: bool,
    /// Prestige once a reset would award at least this many points.
    #[serde(default)]
    pub prestige_at: Option<u32>,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            name: "Greedy".to_string(),
            description: "Buy everything affordable, races first".to_string(),
            priorities: vec![
                EntityKind::Race,
                EntityKind::Building,
                EntityKind::Research,
                EntityKind::PrestigeUpgrade,
            ],
            upgrade_owned: false,
            prestige_at: None,
        }
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Create a "Builder" strategy (buildings and levels before races).
    #[must_use]
    pub fn builder() -> Self {
        Self {
            name: "Builder".to_string(),
            description: "Buildings first, upgrade everything owned".to_string(),
            priorities: vec![
                EntityKind::Building,
                EntityKind::Research,
                EntityKind::Race,
                EntityKind::PrestigeUpgrade,
            ],
            upgrade_owned: true,
            prestige_at: None,
        }
    }

    /// Create a "Prestige Loop" strategy (reset as soon as it pays).
    #[must_use]
    pub fn prestige_loop() -> Self {
        Self {
            name: "Prestige Loop".to_string(),
            description: "Greedy spending, prestige at the first point".to_string(),
            priorities: vec![
                EntityKind::PrestigeUpgrade,
                EntityKind::Race,
                EntityKind::Building,
                EntityKind::Research,
            ],
            upgrade_owned: false,
            prestige_at: Some(1),
        }
    }

    /// Look up a built-in strategy by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "greedy" => Some(Self::default()),
            "builder" => Some(Self::builder()),
            "prestige_loop" | "prestige-loop" => Some(Self::prestige_loop()),
            _ => None,
        }
    }
}

/// What one decision did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    /// Units or levels bought.
    pub purchased: u32,
    /// Levels gained through upgrades.
    pub upgraded: u32,
    /// Points awarded if a prestige happened.
    pub prestiged: Option<u32>,
}

/// Runtime state for executing a strategy.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    strategy: Strategy,
    purchases: u64,
    upgrades: u64,
    prestiges: u32,
}

impl StrategyExecutor {
    /// Create a new executor for a strategy.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            purchases: 0,
            upgrades: 0,
            prestiges: 0,
        }
    }

    /// Make one round of decisions.
    ///
    /// Rejected commands are skipped; a strategy never fails.
    pub fn decide<P: PlayerFacade + ?Sized>(&mut self, player: &mut P) -> Decision {
        let mut decision = Decision::default();

        if let Some(threshold) = self.strategy.prestige_at {
            if player.potential_prestige_points() >= threshold.max(1) {
                match player.prestige() {
                    Ok(outcome) => {
                        info!(
                            strategy = %self.strategy.name,
                            points = outcome.points,
                            count = outcome.prestige_count,
                            "Prestiged"
                        );
                        self.prestiges += 1;
                        decision.prestiged = Some(outcome.points);
                    }
                    Err(e) => debug!(error = %e, "Prestige skipped"),
                }
            }
        }

        for &kind in &self.strategy.priorities {
            for entity in player.entities(kind) {
                if !entity.unlocked {
                    continue;
                }
                decision.purchased += buy_max(player, kind, CostAction::Purchase, &entity.id);

                let has_units = matches!(kind, EntityKind::Race | EntityKind::Building);
                if self.strategy.upgrade_owned && has_units {
                    decision.upgraded += buy_max(player, kind, CostAction::Upgrade, &entity.id);
                }
            }
        }

        self.purchases += u64::from(decision.purchased);
        self.upgrades += u64::from(decision.upgraded);
        decision
    }

    /// Get the strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.strategy.name
    }

    /// Units and levels bought so far.
    #[must_use]
    pub fn purchases(&self) -> u64 {
        self.purchases
    }

    /// Upgrade levels gained so far.
    #[must_use]
    pub fn upgrades(&self) -> u64 {
        self.upgrades
    }

    /// Prestiges performed so far.
    #[must_use]
    pub fn prestiges(&self) -> u32 {
        self.prestiges
    }
}

fn buy_max<P: PlayerFacade + ?Sized>(
    player: &mut P,
    kind: EntityKind,
    action: CostAction,
    id: &str,
) -> u32 {
    match player.buy_max(kind, action, id) {
        Ok(Some(receipt)) => {
            debug!(%kind, id, quantity = receipt.quantity, ?action, "Bought");
            receipt.quantity
        }
        Ok(None) => 0,
        Err(e) => {
            debug!(%kind, id, error = %e, "Purchase skipped");
            0
        }
    }
}
