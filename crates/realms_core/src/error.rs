//! Error types for the game simulation.

use thiserror::Error;

use crate::resources::ResourceType;
use crate::state::EntityKind;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
///
/// None of these are fatal: a failed command leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// Not enough of a resource to pay a cost.
    #[error("Insufficient resources: need {required:.2} {resource}, have {available:.2}")]
    InsufficientResources {
        /// Resource type.
        resource: ResourceType,
        /// Amount required.
        required: f64,
        /// Amount available.
        available: f64,
    },

    /// Cost entry that is negative or not a number.
    #[error("Invalid cost: {amount} {resource}")]
    InvalidCost {
        /// Resource type.
        resource: ResourceType,
        /// Offending amount.
        amount: f64,
    },

    /// Identifier absent from the config tables.
    #[error("Unknown {kind} id: {id}")]
    InvalidEntityId {
        /// Kind of entity that was looked up.
        kind: EntityKind,
        /// Identifier that was not found.
        id: String,
    },

    /// Level or count already at the configured maximum.
    #[error("'{id}' is already at its cap of {cap}")]
    AtCapacity {
        /// Entity identifier.
        id: String,
        /// Configured cap.
        cap: u32,
    },

    /// The entity has not been unlocked yet.
    #[error("'{0}' is still locked")]
    EntityLocked(String),

    /// Upgrading requires owning at least one unit.
    #[error("'{0}' must be owned before it can be upgraded")]
    NotOwned(String),

    /// Zero-quantity purchase or upgrade.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Ability toggled before it was unlocked.
    #[error("Ability '{ability}' of race '{race}' is not unlocked")]
    AbilityLocked {
        /// Race identifier.
        race: String,
        /// Ability identifier.
        ability: String,
    },

    /// Prestige requested with zero potential points.
    #[error("Not enough progress to prestige yet")]
    PrestigeNotAvailable,

    /// Time warp is active or cooling down.
    #[error("Time warp unavailable: {0}")]
    TimeWarpUnavailable(String),

    /// Transmutation source and target must differ and be producible.
    #[error("Invalid transmutation from {from} to {to}")]
    InvalidTransmutation {
        /// Resource drained.
        from: ResourceType,
        /// Resource credited.
        to: ResourceType,
    },

    /// Save payload could not be decoded.
    #[error("Corrupt save data: {0}")]
    CorruptSaveData(String),

    /// Save payload written by a newer format.
    #[error("Save version {found} is newer than supported version {supported}")]
    UnsupportedSaveVersion {
        /// Version found in the payload.
        found: u32,
        /// Newest version this build reads.
        supported: u32,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Config tables failed validation.
    #[error("Invalid game config: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
