use crate::battle::state::TurnRng;
use crate::errors::{InventoryError, InventoryResult};
use crate::pokemon::PokemonInst;
use schema::PokemonType;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use tracing::info;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
pub enum BallTier {
    Basic,
    Great,
    Ultra,
    Master,
}

impl BallTier {
    pub fn catch_rate(self) -> f64 {
        match self {
            BallTier::Basic => 0.5,
            BallTier::Great => 0.7,
            BallTier::Ultra => 0.85,
            BallTier::Master => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BallTier::Basic => "Poké Ball",
            BallTier::Great => "Great Ball",
            BallTier::Ultra => "Ultra Ball",
            BallTier::Master => "Master Ball",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            BallTier::Basic => "pokeball",
            BallTier::Great => "greatball",
            BallTier::Ultra => "ultraball",
            BallTier::Master => "masterball",
        }
    }

    pub fn from_key(key: &str) -> InventoryResult<Self> {
        BallTier::iter()
            .find(|tier| tier.key() == key)
            .ok_or_else(|| InventoryError::UnknownItemKey(key.to_string()))
    }
}

/// A capture device. Holds at most one Pokémon and never empties itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Pokeball {
    pub tier: BallTier,
    captured: Option<PokemonInst>,
}

impl Pokeball {
    pub fn new(tier: BallTier) -> Self {
        Pokeball {
            tier,
            captured: None,
        }
    }

    /// A ball already holding `pokemon`, as stored in the roster.
    pub fn holding(tier: BallTier, pokemon: PokemonInst) -> Self {
        let mut ball = Pokeball::new(tier);
        ball.add(pokemon);
        ball
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_none()
    }

    pub fn pokemon(&self) -> Option<&PokemonInst> {
        self.captured.as_ref()
    }

    /// Success chance against `target`: the tier's rate scaled by missing
    /// health. The Master tier always succeeds.
    pub fn catch_probability(&self, target: &PokemonInst) -> f64 {
        if self.tier == BallTier::Master {
            return 1.0;
        }
        let max = target.max_health();
        if max == 0 {
            return self.tier.catch_rate();
        }
        let ratio = f64::from(target.current_health()) / f64::from(max);
        self.tier.catch_rate() * (1.0 - ratio)
    }

    /// Throw this ball at `target`. One draw, no retries.
    ///
    /// On success the ball keeps a copy of the target with no observers. On
    /// failure the ball stays empty and the target is untouched.
    pub fn use_on(&mut self, target: &PokemonInst, rng: &mut TurnRng) -> InventoryResult<bool> {
        if let Some(held) = &self.captured {
            return Err(InventoryError::BallOccupied {
                ball: self.tier.name().to_string(),
                pokemon: held.name.clone(),
            });
        }

        let probability = self.catch_probability(target);
        let draw = rng.next_outcome("catch attempt");
        if probability >= 1.0 || draw < probability {
            let mut caught = target.clone();
            caught.clear_observers();
            info!(pokemon = %caught.name, ball = self.tier.name(), "caught");
            self.captured = Some(caught);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Place a Pokémon in an empty ball. Refused if the ball is occupied.
    pub fn add(&mut self, pokemon: PokemonInst) -> bool {
        if self.captured.is_some() {
            return false;
        }
        self.captured = Some(pokemon);
        true
    }

    /// Swap the held Pokémon for `pokemon`, returning the previous occupant.
    pub fn switch_pokemon(&mut self, pokemon: PokemonInst) -> Option<PokemonInst> {
        self.captured.replace(pokemon)
    }

    /// "Empty" or the held Pokémon's name.
    pub fn label(&self) -> String {
        match &self.captured {
            Some(pokemon) => pokemon.name.clone(),
            None => "Empty".to_string(),
        }
    }

    pub fn health_label(&self) -> Option<String> {
        self.captured.as_ref().map(PokemonInst::health_label)
    }

    pub fn level(&self) -> Option<u32> {
        self.captured.as_ref().map(|p| p.level)
    }

    pub fn pokemon_type(&self) -> Option<PokemonType> {
        self.captured.as_ref().map(|p| p.pokemon_type)
    }

    /// True when the held Pokémon is fainted. An empty ball is not.
    pub fn is_pokemon_fainted(&self) -> bool {
        self.captured.as_ref().is_some_and(PokemonInst::is_fainted)
    }
}
