use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumIter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum PokemonType {
    Fire,
    Water,
    Grass,
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Evolution tier of a species. Ordered: a stage only ever advances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
pub enum EvolutionStage {
    Base,
    Second,
    Final,
}

impl EvolutionStage {
    /// The stage a species of this stage evolves into, if any.
    pub fn next(self) -> Option<EvolutionStage> {
        match self {
            EvolutionStage::Base => Some(EvolutionStage::Second),
            EvolutionStage::Second => Some(EvolutionStage::Final),
            EvolutionStage::Final => None,
        }
    }
}

impl fmt::Display for EvolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl PokemonType {
    /// Damage multiplier for an attacker of `attacking` type hitting a
    /// `defending` type, scaled by the attacker's evolution stage.
    ///
    /// Fire beats Grass, Water beats Fire, Grass beats Water. Every other
    /// pairing (including same-type) is neutral.
    /// Returns: 1.4 / 1.75 / 2.0 on advantage for Base / Second / Final, else 1.0
    pub fn advantage_multiplier(
        attacking: PokemonType,
        defending: PokemonType,
        stage: EvolutionStage,
    ) -> f64 {
        use PokemonType::*;

        match (attacking, defending) {
            (Fire, Grass) | (Water, Fire) | (Grass, Water) => match stage {
                EvolutionStage::Base => 1.4,
                EvolutionStage::Second => 1.75,
                EvolutionStage::Final => 2.0,
            },
            _ => 1.0,
        }
    }

    pub fn has_advantage_over(self, defending: PokemonType) -> bool {
        Self::advantage_multiplier(self, defending, EvolutionStage::Base) > 1.0
    }
}
