// Pengumon Schema - Shared type definitions
// This crate contains the static vocabulary of the battle engine: elemental
// types, evolution stages, moves and species table rows. Everything here is
// plain serializable data so that the species table and save records can be
// read and written with any serde format.

// Re-export the main types
pub use pokemon_types::*;
pub use species_data::*;

pub mod pokemon_types;
pub mod species_data;
