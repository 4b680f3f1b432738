//! The player's bag.
//!
//! Three independent compartments: potion counts, empty-ball counts, and the
//! roster of occupied balls. The bag is decoded from player state at battle
//! start and written back only at battle end.

use crate::errors::{InventoryError, InventoryResult};
use crate::items::{Potion, PotionSize};
use crate::pokeball::{BallTier, Pokeball};
use crate::pokemon::{PokemonInst, PokemonRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::warn;

/// Most Pokémon the roster stores, not counting the active one.
pub const ROSTER_CAPACITY: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PotionCompartment {
    counts: BTreeMap<Potion, u32>,
}

impl PotionCompartment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, potion: Potion) {
        self.add_count(potion, 1);
    }

    /// Add `count` potions of one kind at once.
    pub fn add_count(&mut self, potion: Potion, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.counts.entry(potion).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    pub fn add_by_key(&mut self, key: &str) -> InventoryResult<()> {
        self.add(Potion::from_key(key)?);
        Ok(())
    }

    /// Take one potion out. `None` when there are none of that kind.
    pub fn remove(&mut self, potion: Potion) -> Option<Potion> {
        let count = self.counts.get_mut(&potion)?;
        if *count == 0 {
            return None;
        }
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&potion);
        }
        Some(potion)
    }

    pub fn remove_by_key(&mut self, key: &str) -> InventoryResult<Option<Potion>> {
        Ok(self.remove(Potion::from_key(key)?))
    }

    pub fn count(&self, potion: Potion) -> u32 {
        self.counts.get(&potion).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&count| count == 0)
    }

    /// Non-zero entries, smallest potion first.
    pub fn entries(&self) -> impl Iterator<Item = (Potion, u32)> + '_ {
        self.counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&potion, &count)| (potion, count))
    }

    /// "Small x2" style lines for display.
    pub fn list_items(&self) -> Vec<String> {
        self.entries()
            .map(|(potion, count)| format!("{} x{}", potion.label(), count))
            .collect()
    }

    /// The revive to spend on a fainted Pokémon: smallest size first.
    pub fn first_revive(&self) -> Option<Potion> {
        PotionSize::iter()
            .map(Potion::reviving)
            .find(|&potion| self.count(potion) > 0)
    }
}

/// Counts of empty balls by tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PokeballCompartment {
    counts: BTreeMap<BallTier, u32>,
}

impl PokeballCompartment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tier: BallTier) {
        self.add_count(tier, 1);
    }

    /// Add `count` empty balls of one tier at once.
    pub fn add_count(&mut self, tier: BallTier, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.counts.entry(tier).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Return an empty ball to the compartment. Occupied balls belong in the roster.
    pub fn add_ball(&mut self, ball: &Pokeball) -> bool {
        if !ball.is_empty() {
            return false;
        }
        self.add(ball.tier);
        true
    }

    pub fn add_by_key(&mut self, key: &str) -> InventoryResult<()> {
        self.add(BallTier::from_key(key)?);
        Ok(())
    }

    /// Take one empty ball of `tier`. `None` when there are none.
    pub fn remove(&mut self, tier: BallTier) -> Option<Pokeball> {
        let count = self.counts.get_mut(&tier)?;
        if *count == 0 {
            return None;
        }
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&tier);
        }
        Some(Pokeball::new(tier))
    }

    pub fn remove_by_key(&mut self, key: &str) -> InventoryResult<Option<Pokeball>> {
        Ok(self.remove(BallTier::from_key(key)?))
    }

    pub fn count(&self, tier: BallTier) -> u32 {
        self.counts.get(&tier).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&count| count == 0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (BallTier, u32)> + '_ {
        self.counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&tier, &count)| (tier, count))
    }

    pub fn list_items(&self) -> Vec<String> {
        self.entries()
            .map(|(tier, count)| format!("{} x{}", tier.name(), count))
            .collect()
    }
}

/// Occupied balls in storage. Every entry holds a Pokémon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PokemonRoster {
    stored: Vec<Pokeball>,
}

impl PokemonRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an occupied ball. Empty balls and a full roster are refused.
    pub fn add(&mut self, ball: Pokeball) -> bool {
        if ball.is_empty() {
            warn!("refused to store an empty ball in the roster");
            return false;
        }
        if self.is_full() {
            warn!(capacity = ROSTER_CAPACITY, "roster is full");
            return false;
        }
        self.stored.push(ball);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<Pokeball> {
        if index < self.stored.len() {
            Some(self.stored.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&Pokeball> {
        self.stored.get(index)
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.stored.len() >= ROSTER_CAPACITY
    }

    /// Index and ball for every stored Pokémon that can still fight.
    ///
    /// `None` means there is no roster at all. `Some` with an empty list means
    /// every stored Pokémon has fainted.
    pub fn available_pokemon(&self) -> Option<Vec<(usize, &Pokeball)>> {
        if self.stored.is_empty() {
            return None;
        }
        Some(
            self.stored
                .iter()
                .enumerate()
                .filter(|(_, ball)| !ball.is_empty() && !ball.is_pokemon_fainted())
                .collect(),
        )
    }

    /// Exchange the Pokémon stored at `index` with `active` through the
    /// ball's `switch_pokemon`. The ball keeps its tier.
    ///
    /// Refused, leaving both untouched, when the index is out of range or the
    /// ball is empty or holds a fainted Pokémon.
    pub fn switch_active(&mut self, index: usize, active: &mut PokemonInst) -> bool {
        let Some(ball) = self.stored.get_mut(index) else {
            return false;
        };
        if ball.is_empty() || ball.is_pokemon_fainted() {
            return false;
        }
        match ball.switch_pokemon(active.clone()) {
            Some(incoming) => {
                *active = incoming;
                true
            }
            None => false,
        }
    }

    /// `(index, description)` for every stored Pokémon.
    pub fn list_pokemon(&self) -> Vec<(usize, String)> {
        self.stored
            .iter()
            .enumerate()
            .filter_map(|(index, ball)| ball.pokemon().map(|p| (index, p.to_string())))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pokeball> {
        self.stored.iter()
    }
}

/// Persisted shape of a bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BagRecord {
    #[serde(default)]
    pub potions: BTreeMap<String, u32>,
    #[serde(default)]
    pub pokeballs: BTreeMap<String, u32>,
    #[serde(default)]
    pub pokemon: Vec<PokemonRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    pub potions: PotionCompartment,
    pub pokeballs: PokeballCompartment,
    pub pokemon: PokemonRoster,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_record(&self) -> BagRecord {
        BagRecord {
            potions: self
                .potions
                .entries()
                .map(|(potion, count)| (potion.key(), count))
                .collect(),
            pokeballs: self
                .pokeballs
                .entries()
                .map(|(tier, count)| (tier.key().to_string(), count))
                .collect(),
            pokemon: self
                .pokemon
                .iter()
                .filter_map(|ball| ball.pokemon().map(PokemonInst::to_record))
                .collect(),
        }
    }

    /// Rebuild a bag. Unknown item keys, an oversized roster and malformed
    /// roster entries are errors.
    pub fn from_record(record: BagRecord) -> InventoryResult<Self> {
        let mut bag = Bag::new();
        for (key, &count) in &record.potions {
            bag.potions.add_count(Potion::from_key(key)?, count);
        }
        for (key, &count) in &record.pokeballs {
            bag.pokeballs.add_count(BallTier::from_key(key)?, count);
        }
        if record.pokemon.len() > ROSTER_CAPACITY {
            return Err(InventoryError::RosterOverflow {
                capacity: ROSTER_CAPACITY,
            });
        }
        for entry in record.pokemon {
            let pokemon = PokemonInst::from_record(entry)?;
            bag.pokemon.add(Pokeball::holding(BallTier::Basic, pokemon));
        }
        Ok(bag)
    }
}
