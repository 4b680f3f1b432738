use thiserror::Error;

/// Main error type for the Pengumon battle engine.
///
/// Only contract violations end up here: a broken species table, save data
/// that cannot be decoded, or an inventory operation the caller should never
/// have attempted. Player mistakes are narrated, never returned as errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BattleEngineError {
    /// Error related to species data lookup or processing
    #[error("Species data error: {0}")]
    SpeciesData(#[from] SpeciesDataError),
    /// Error related to bag, compartment or Pokéball operations
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
    /// Error reading or writing the player's persisted state
    #[error("Player state error: {0}")]
    PlayerState(#[from] PlayerStateError),
    /// Error related to invalid combatant actions
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors related to species data operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeciesDataError {
    /// The specified species was not found in the table
    #[error("Species not found: {0}")]
    SpeciesNotFound(String),
    /// The species table could not be parsed
    #[error("Species table could not be parsed: {0}")]
    Parse(String),
    /// A species row is inconsistent or out of range
    #[error("Malformed species data: {0}")]
    MalformedData(String),
}

/// Errors related to inventory operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// A storage key that maps to no known potion or ball
    #[error("Unknown item key: {0}")]
    UnknownItemKey(String),
    /// A catch was attempted with a ball that already holds a Pokémon
    #[error("{ball} already contains {pokemon}")]
    BallOccupied { ball: String, pokemon: String },
    /// A saved roster holds more Pokémon than the roster can store
    #[error("Roster holds more than {capacity} Pokémon")]
    RosterOverflow { capacity: usize },
    /// A saved roster entry could not be rebuilt
    #[error("Bad roster entry: {0}")]
    RosterEntry(#[from] PlayerStateError),
}

/// Errors related to the player's persisted battle state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerStateError {
    /// A required state key is absent
    #[error("Missing player state: {0}")]
    MissingKey(String),
    /// A state value exists but does not decode into the expected record
    #[error("Could not decode player state '{key}': {details}")]
    Decode { key: String, details: String },
    /// A record could not be encoded for write-back
    #[error("Could not encode player state '{key}': {details}")]
    Encode { key: String, details: String },
    /// A record decoded but describes a combatant that cannot exist
    #[error("Malformed record for {name}: {problem}")]
    MalformedRecord { name: String, problem: String },
}

/// Errors related to combatant actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Move index is out of bounds
    #[error("Invalid move index: {0}")]
    InvalidMoveIndex(usize),
}

/// Type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Type alias for Results using SpeciesDataError
pub type SpeciesDataResult<T> = Result<T, SpeciesDataError>;

/// Type alias for Results using InventoryError
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors raised while loading tuning configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A field parsed but holds a value the engine cannot run with
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
