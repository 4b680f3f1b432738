use crate::errors::{InventoryError, InventoryResult};
use crate::pokemon::PokemonInst;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumIter, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
pub enum PotionSize {
    Small,
    Medium,
    Large,
}

impl PotionSize {
    pub fn heal_amount(self) -> u32 {
        match self {
            PotionSize::Small => 20,
            PotionSize::Medium => 40,
            PotionSize::Large => 70,
        }
    }

    fn key(self) -> &'static str {
        match self {
            PotionSize::Small => "small",
            PotionSize::Medium => "medium",
            PotionSize::Large => "large",
        }
    }
}

impl fmt::Display for PotionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A potion is a plain value: its size and whether it can revive.
///
/// Ordering is by size first, so a sorted compartment lists small potions
/// before larger ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Potion {
    pub size: PotionSize,
    pub revive: bool,
}

/// What a potion did when used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotionOutcome {
    pub success: bool,
    pub message: String,
    pub amount_healed: u32,
    pub revived: bool,
}

impl Potion {
    pub const fn new(size: PotionSize) -> Self {
        Potion { size, revive: false }
    }

    pub const fn reviving(size: PotionSize) -> Self {
        Potion { size, revive: true }
    }

    /// Every potion kind, normal before revive within each size.
    pub fn all() -> impl Iterator<Item = Potion> {
        PotionSize::iter().flat_map(|size| [Potion::new(size), Potion::reviving(size)])
    }

    pub fn heal_amount(&self) -> u32 {
        self.size.heal_amount()
    }

    /// Display name, e.g. "Small Potion" or "Revive Small Potion".
    pub fn name(&self) -> String {
        format!("{} Potion", self.label())
    }

    /// Short menu label, e.g. "Small" or "Revive Small".
    pub fn label(&self) -> String {
        if self.revive {
            format!("Revive {}", self.size)
        } else {
            self.size.to_string()
        }
    }

    /// Storage key, e.g. "small" or "small_revive".
    pub fn key(&self) -> String {
        if self.revive {
            format!("{}_revive", self.size.key())
        } else {
            self.size.key().to_string()
        }
    }

    pub fn from_key(key: &str) -> InventoryResult<Self> {
        Potion::all()
            .find(|potion| potion.key() == key)
            .ok_or_else(|| InventoryError::UnknownItemKey(key.to_string()))
    }

    /// Drink the potion.
    ///
    /// A revive brings a fainted target back at `1 + heal` health (capped at
    /// max). Otherwise a fainted or full-health target is left alone and the
    /// outcome reports failure so the caller can keep the potion.
    pub fn use_on(&self, target: &mut PokemonInst) -> PotionOutcome {
        if target.is_fainted() {
            if !self.revive {
                return PotionOutcome::failed(format!(
                    "{} has fainted! Only a revive can help it now.",
                    target.name
                ));
            }
            let restored = target.max_health().min(1 + self.heal_amount());
            target.set_health(restored);
            return PotionOutcome {
                success: true,
                message: format!("{} revived {} with {} HP!", self.name(), target.name, restored),
                amount_healed: restored,
                revived: true,
            };
        }

        if target.is_full_health() {
            return PotionOutcome::failed(format!("{} already has full health!", target.name));
        }

        let healed = target.restore_health(self.heal_amount());
        PotionOutcome {
            success: true,
            message: format!("{} restored {} HP to {}!", self.name(), healed, target.name),
            amount_healed: healed,
            revived: false,
        }
    }
}

impl PotionOutcome {
    fn failed(message: String) -> Self {
        PotionOutcome {
            success: false,
            message,
            amount_healed: 0,
            revived: false,
        }
    }
}

impl fmt::Display for Potion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::{EvolutionStage, Move, PokemonType};

    fn bulbasaur_at(health: u32) -> PokemonInst {
        let mut pokemon = PokemonInst::new(
            "Bulbasaur",
            PokemonType::Grass,
            EvolutionStage::Base,
            100,
            vec![Move::new("Tackle", 10)],
        );
        pokemon.set_health(health);
        pokemon
    }

    #[rstest]
    #[case(Potion::new(PotionSize::Small), "small", "Small Potion", "Small")]
    #[case(Potion::new(PotionSize::Large), "large", "Large Potion", "Large")]
    #[case(Potion::reviving(PotionSize::Small), "small_revive", "Revive Small Potion", "Revive Small")]
    #[case(Potion::reviving(PotionSize::Medium), "medium_revive", "Revive Medium Potion", "Revive Medium")]
    fn test_names_and_keys(
        #[case] potion: Potion,
        #[case] key: &str,
        #[case] name: &str,
        #[case] label: &str,
    ) {
        assert_eq!(potion.key(), key);
        assert_eq!(potion.name(), name);
        assert_eq!(potion.label(), label);
        assert_eq!(Potion::from_key(key).unwrap(), potion);
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            Potion::from_key("huge"),
            Err(InventoryError::UnknownItemKey("huge".to_string()))
        );
    }

    #[test]
    fn test_all_kinds() {
        assert_eq!(Potion::all().count(), 6);
    }

    #[test]
    fn test_heal_is_capped() {
        let mut target = bulbasaur_at(90);
        let outcome = Potion::new(PotionSize::Large).use_on(&mut target);
        assert!(outcome.success);
        assert_eq!(outcome.amount_healed, 10);
        assert_eq!(outcome.message, "Large Potion restored 10 HP to Bulbasaur!");
        assert_eq!(target.current_health(), 100);
    }

    #[test]
    fn test_full_health_fails() {
        let mut target = bulbasaur_at(100);
        let outcome = Potion::new(PotionSize::Small).use_on(&mut target);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Bulbasaur already has full health!");
    }

    #[test]
    fn test_plain_potion_cannot_revive() {
        let mut target = bulbasaur_at(0);
        let outcome = Potion::new(PotionSize::Large).use_on(&mut target);
        assert!(!outcome.success);
        assert!(target.is_fainted());
    }

    #[rstest]
    #[case(PotionSize::Small, 21)]
    #[case(PotionSize::Medium, 41)]
    #[case(PotionSize::Large, 71)]
    fn test_revive_restores_small_positive_health(#[case] size: PotionSize, #[case] expected: u32) {
        let mut target = bulbasaur_at(0);
        let outcome = Potion::reviving(size).use_on(&mut target);
        assert!(outcome.success);
        assert!(outcome.revived);
        assert!(outcome.message.contains("revived"));
        assert_eq!(target.current_health(), expected);
    }

    #[test]
    fn test_revive_caps_at_max() {
        let mut target = PokemonInst::new(
            "Tiny",
            PokemonType::Fire,
            EvolutionStage::Base,
            30,
            vec![Move::new("Ember", 5)],
        );
        target.take_damage(30);
        Potion::reviving(PotionSize::Large).use_on(&mut target);
        assert_eq!(target.current_health(), 30);
    }

    #[test]
    fn test_revive_on_living_target_heals_normally() {
        let mut target = bulbasaur_at(50);
        let outcome = Potion::reviving(PotionSize::Small).use_on(&mut target);
        assert!(outcome.success);
        assert!(!outcome.revived);
        assert_eq!(target.current_health(), 70);
    }
}
