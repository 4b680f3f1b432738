//! Decision strategies for the wild Pokémon.
//!
//! Each difficulty is a pure function of the two combatants and the session's
//! random source. Damage is the only signal; there is no type lookahead.

use crate::battle::state::TurnRng;
use crate::pokemon::PokemonInst;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the wild Pokémon does on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyAction {
    Dodge,
    Attack(usize),
}

impl EnemyAction {
    pub const DODGE_TOKEN: &'static str = "Dodge";

    /// "Dodge" or the move index as text.
    pub fn token(&self) -> String {
        match self {
            EnemyAction::Dodge => Self::DODGE_TOKEN.to_string(),
            EnemyAction::Attack(index) => index.to_string(),
        }
    }
}

impl fmt::Display for EnemyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl FromStr for EnemyAction {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::DODGE_TOKEN {
            return Ok(EnemyAction::Dodge);
        }
        s.parse().map(EnemyAction::Attack)
    }
}

pub type Strategy = fn(&PokemonInst, &PokemonInst, &mut TurnRng) -> EnemyAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a stored tag. Case-insensitive; anything unknown is Medium.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Difficulty::Easy => easy_action,
            Difficulty::Medium => medium_action,
            Difficulty::Hard => hard_action,
        }
    }

    pub fn choose_action(
        self,
        me: &PokemonInst,
        opponent: &PokemonInst,
        rng: &mut TurnRng,
    ) -> EnemyAction {
        (self.strategy())(me, opponent, rng)
    }
}

/// Dodges 20% of the time, otherwise favors weak moves (weight 1/damage).
pub fn easy_action(me: &PokemonInst, _opponent: &PokemonInst, rng: &mut TurnRng) -> EnemyAction {
    if rng.roll(0.2, "easy ai dodge") {
        return EnemyAction::Dodge;
    }
    // A zero-damage move weighs as if it dealt 1.
    let weights: Vec<f64> = me
        .moves()
        .iter()
        .map(|m| 1.0 / f64::from(m.damage.max(1)))
        .collect();
    EnemyAction::Attack(rng.weighted_index(&weights, "easy ai move"))
}

/// Dodges 30% of the time, otherwise picks any move uniformly.
pub fn medium_action(me: &PokemonInst, _opponent: &PokemonInst, rng: &mut TurnRng) -> EnemyAction {
    if rng.roll(0.3, "medium ai dodge") {
        return EnemyAction::Dodge;
    }
    EnemyAction::Attack(rng.uniform_index(me.moves().len(), "medium ai move"))
}

/// Dodges more when hurt (40% below 30% health, else 15%), otherwise favors
/// strong moves (weight = damage).
pub fn hard_action(me: &PokemonInst, _opponent: &PokemonInst, rng: &mut TurnRng) -> EnemyAction {
    let ratio = if me.max_health() == 0 {
        0.0
    } else {
        f64::from(me.current_health()) / f64::from(me.max_health())
    };
    let dodge_chance = if ratio < 0.3 { 0.4 } else { 0.15 };
    if rng.roll(dodge_chance, "hard ai dodge") {
        return EnemyAction::Dodge;
    }
    let weights: Vec<f64> = me.moves().iter().map(|m| f64::from(m.damage)).collect();
    EnemyAction::Attack(rng.weighted_index(&weights, "hard ai move"))
}
