use crate::{EvolutionStage, PokemonType};
use serde::{Deserialize, Serialize};

/// A known move: a display name and a flat damage value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub name: String,
    pub damage: u32,
}

impl Move {
    pub fn new(name: impl Into<String>, damage: u32) -> Self {
        Move {
            name: name.into(),
            damage,
        }
    }
}

/// One row of the species table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesData {
    pub name: String,
    pub pokemon_type: PokemonType,
    pub stage: EvolutionStage,
    pub max_health: u32,
    pub moves: Vec<Move>,
    #[serde(default)]
    pub evolves_into: Option<String>, // Species name of the next stage
}
