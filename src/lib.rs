// In: src/lib.rs

//! Pengumon Wild Battle Engine
//!
//! A tick-driven, turn-based battle between a player's active Pokémon and a
//! wild one. The engine narrates through events, keeps every change private
//! until the battle ends, and writes the results back to the player's state.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod config;
pub mod errors;
pub mod inventory;
pub mod items;
pub mod observers;
pub mod player;
pub mod pokeball;
pub mod pokemon;
pub mod species;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{EvolutionStage, Move, PokemonType, SpeciesData};

// --- From this crate's modules (`src/`) ---

// The battle session and its outputs.
pub use battle::ai::{Difficulty, EnemyAction};
pub use battle::controller::{BattleController, BATTLE_MENU};
pub use battle::state::{BattleEvent, EventBus, PokemonSnapshot, TurnRng, TurnStage};

// Combatants, items and storage.
pub use inventory::{Bag, BagRecord, PokemonRoster, ROSTER_CAPACITY};
pub use items::{Potion, PotionSize};
pub use observers::{BattleMessageNotifier, HealthObserver};
pub use pokeball::{BallTier, Pokeball};
pub use pokemon::{PokemonInst, PokemonRecord};

// The player seam.
pub use player::{InMemoryPlayer, PlayerContext};

// Primary data access functions.
pub use config::{BattleConfig, ProgressionConfig};
pub use species::{get_species_data, starter_species, wild_species};

// Crate-specific error and result types.
pub use errors::{
    ActionError, BattleEngineError, BattleResult, ConfigError, InventoryError, InventoryResult,
    PlayerStateError, SpeciesDataError, SpeciesDataResult,
};
