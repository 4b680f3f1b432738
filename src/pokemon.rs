use crate::config::ProgressionConfig;
use crate::errors::{ActionError, BattleResult, PlayerStateError, SpeciesDataResult};
use crate::observers::HealthObserver;
use crate::species::{get_species_data, species_table};
use schema::{EvolutionStage, Move, PokemonType};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

/// Type-advantage rule injected into `attack_with`.
pub type MultiplierFn = fn(PokemonType, PokemonType, EvolutionStage) -> f64;

/// Persisted combatant shape:
/// (name, max health, current health, type, level, xp, moves, stage).
pub type PokemonRecord = (
    String,
    u32,
    u32,
    PokemonType,
    u32,
    u32,
    Vec<Move>,
    EvolutionStage,
);

/// Registered health listeners. Not part of a combatant's identity, so two
/// lists always compare equal.
#[derive(Clone, Default)]
pub struct HealthObservers(Vec<Rc<dyn HealthObserver>>);

impl fmt::Debug for HealthObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HealthObservers({})", self.0.len())
    }
}

impl PartialEq for HealthObservers {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Result of one `attack` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    pub success: bool,
    pub message: String,
    pub damage: u32,
    pub target_fainted: bool,
    /// The attacker's next form, when this attack's knockout triggered evolution
    pub evolved: Option<PokemonInst>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PokemonInst {
    pub name: String,
    pub pokemon_type: PokemonType,
    pub stage: EvolutionStage,
    pub level: u32,
    pub xp: u32,
    max_health: u32,
    current_health: u32,
    moves: Vec<Move>,
    observers: HealthObservers,
}

impl PokemonInst {
    /// A fresh level 1 combatant at full health.
    pub fn new(
        name: impl Into<String>,
        pokemon_type: PokemonType,
        stage: EvolutionStage,
        max_health: u32,
        moves: Vec<Move>,
    ) -> Self {
        PokemonInst {
            name: name.into(),
            pokemon_type,
            stage,
            level: 1,
            xp: 0,
            max_health,
            current_health: max_health,
            moves,
            observers: HealthObservers::default(),
        }
    }

    /// Create a combatant from its species table row.
    pub fn from_species(name: &str) -> SpeciesDataResult<Self> {
        let data = get_species_data(name)?;
        Ok(Self::new(
            data.name.clone(),
            data.pokemon_type,
            data.stage,
            data.max_health,
            data.moves.clone(),
        ))
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn current_health(&self) -> u32 {
        self.current_health
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_fainted(&self) -> bool {
        self.current_health == 0
    }

    pub fn is_full_health(&self) -> bool {
        self.current_health >= self.max_health
    }

    /// "cur/max", as shown in switch menus.
    pub fn health_label(&self) -> String {
        format!("{}/{}", self.current_health, self.max_health)
    }

    pub fn add_observer(&mut self, observer: Rc<dyn HealthObserver>) {
        self.observers.0.push(observer);
    }

    pub fn clear_observers(&mut self) {
        self.observers.0.clear();
    }

    pub fn observer_count(&self) -> usize {
        self.observers.0.len()
    }

    fn change_health(&mut self, new: u32) {
        let old = self.current_health;
        self.current_health = new.min(self.max_health);
        let current = self.current_health;
        // Cloned so observers can borrow the subject immutably.
        let observers = self.observers.0.clone();
        for observer in &observers {
            observer.on_health_changed(self, old, current);
        }
    }

    /// Lose `amount` health, stopping at zero. Observers hear about every call.
    pub fn take_damage(&mut self, amount: u32) {
        let new = self.current_health.saturating_sub(amount);
        self.change_health(new);
    }

    /// Gain up to `amount` health without passing the maximum.
    /// Returns the health actually restored.
    pub fn restore_health(&mut self, amount: u32) -> u32 {
        let old = self.current_health;
        self.change_health(old.saturating_add(amount));
        self.current_health - old
    }

    /// Set health directly, clamped to the maximum.
    pub fn set_health(&mut self, value: u32) {
        self.change_health(value);
    }

    pub fn attack(&mut self, move_index: usize, target: &mut PokemonInst) -> BattleResult<AttackOutcome> {
        self.attack_with(
            move_index,
            target,
            PokemonType::advantage_multiplier,
            &ProgressionConfig::default(),
        )
    }

    /// Use the move at `move_index` on `target`.
    ///
    /// A fainted attacker does nothing and reports failure. A knockout awards
    /// experience and runs `level_up_check`; an evolution is returned in the
    /// outcome and the caller replaces the attacker with it.
    pub fn attack_with(
        &mut self,
        move_index: usize,
        target: &mut PokemonInst,
        multiplier: MultiplierFn,
        progression: &ProgressionConfig,
    ) -> BattleResult<AttackOutcome> {
        if self.is_fainted() {
            return Ok(AttackOutcome {
                success: false,
                message: format!("{} is fainted and cannot attack!", self.name),
                damage: 0,
                target_fainted: target.is_fainted(),
                evolved: None,
            });
        }

        let chosen = self
            .moves
            .get(move_index)
            .ok_or(ActionError::InvalidMoveIndex(move_index))?;

        let factor = multiplier(self.pokemon_type, target.pokemon_type, self.stage);
        // 1.4 is not exact in binary; keep 10 * 1.4 at 14.
        let damage = (f64::from(chosen.damage) * factor + 1e-9).floor() as u32;
        let message = format!("{} used {} on {}!", self.name, chosen.name, target.name);
        debug!(attacker = %self.name, target = %target.name, damage, "attack resolved");

        target.take_damage(damage);
        let target_fainted = target.is_fainted();

        let mut evolved = None;
        if target_fainted {
            self.xp = self.xp.saturating_add(progression.xp_per_knockout);
            evolved = self.level_up_check(progression)?;
        }

        Ok(AttackOutcome {
            success: true,
            message,
            damage,
            target_fainted,
            evolved,
        })
    }

    /// Grant a level once experience reaches the stage threshold.
    ///
    /// A level-up resets xp, raises max health and every move's damage by the
    /// stage's flat amounts, and heals fully. Reaching the evolution level with
    /// a next species available returns that species as a new level 1
    /// combatant at full health, inheriting this one's observers.
    pub fn level_up_check(
        &mut self,
        progression: &ProgressionConfig,
    ) -> SpeciesDataResult<Option<PokemonInst>> {
        let growth = *progression.growth(self.stage);
        if self.xp < growth.xp_threshold {
            return Ok(None);
        }

        self.xp = 0;
        self.level = self.level.saturating_add(1);
        self.max_health = self.max_health.saturating_add(growth.health_increase);
        self.current_health = self.max_health;
        for known in &mut self.moves {
            known.damage = known.damage.saturating_add(growth.attack_increase);
        }
        debug!(pokemon = %self.name, level = self.level, "level up");

        if self.level < progression.evolution_level || self.stage.next().is_none() {
            return Ok(None);
        }

        // Combatants built outside the species table have no evolution line.
        let next_name = match species_table()?.get(&self.name) {
            Ok(row) => row.evolves_into.clone(),
            Err(_) => None,
        };
        let Some(next_name) = next_name else {
            return Ok(None);
        };

        let mut evolved = PokemonInst::from_species(&next_name)?;
        evolved.observers = self.observers.clone();
        info!(from = %self.name, into = %evolved.name, "evolution");
        Ok(Some(evolved))
    }

    pub fn to_record(&self) -> PokemonRecord {
        (
            self.name.clone(),
            self.max_health,
            self.current_health,
            self.pokemon_type,
            self.level,
            self.xp,
            self.moves.clone(),
            self.stage,
        )
    }

    /// Rebuild a combatant from its record.
    ///
    /// Records that could never have been written by a live combatant are
    /// rejected: zero max health, current health above max, level 0, or no moves.
    pub fn from_record(record: PokemonRecord) -> Result<Self, PlayerStateError> {
        let (name, max_health, current_health, pokemon_type, level, xp, moves, stage) = record;
        let problem = if max_health == 0 {
            Some("max health is 0".to_string())
        } else if current_health > max_health {
            Some(format!("health {}/{} exceeds its maximum", current_health, max_health))
        } else if level == 0 {
            Some("level is 0".to_string())
        } else if moves.is_empty() {
            Some("knows no moves".to_string())
        } else {
            None
        };
        if let Some(problem) = problem {
            return Err(PlayerStateError::MalformedRecord { name, problem });
        }

        Ok(PokemonInst {
            name,
            pokemon_type,
            stage,
            level,
            xp,
            max_health,
            current_health,
            moves,
            observers: HealthObservers::default(),
        })
    }
}

impl fmt::Display for PokemonInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Lv {}, {}, HP {})",
            self.name,
            self.level,
            self.pokemon_type,
            self.health_label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BattleEngineError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(u32, u32)>>,
    }

    impl HealthObserver for Recorder {
        fn on_health_changed(&self, _subject: &PokemonInst, old: u32, new: u32) {
            self.calls.borrow_mut().push((old, new));
        }
    }

    fn flat(_: PokemonType, _: PokemonType, _: EvolutionStage) -> f64 {
        1.0
    }

    fn bonus(_: PokemonType, _: PokemonType, _: EvolutionStage) -> f64 {
        1.4
    }

    fn dummy(health: u32) -> PokemonInst {
        PokemonInst::new(
            "Dummy",
            PokemonType::Water,
            EvolutionStage::Base,
            health,
            vec![Move::new("Splash", 10)],
        )
    }

    #[test]
    fn test_from_species() {
        let charmander = PokemonInst::from_species("Charmander").unwrap();
        assert_eq!(charmander.current_health(), 40);
        assert_eq!(charmander.max_health(), 40);
        assert_eq!(charmander.level, 1);
        assert_eq!(charmander.xp, 0);
        assert_eq!(charmander.moves()[1], Move::new("Ember", 15));
        assert!(PokemonInst::from_species("Missingno").is_err());
    }

    #[test]
    fn test_health_stays_in_bounds() {
        let mut pokemon = dummy(40);
        for amount in [0, 15, 3, 100, 7] {
            pokemon.take_damage(amount);
            assert!(pokemon.current_health() <= pokemon.max_health());
            assert_eq!(pokemon.is_fainted(), pokemon.current_health() == 0);
        }
        assert!(pokemon.is_fainted());

        pokemon.restore_health(500);
        assert_eq!(pokemon.current_health(), 40);
        pokemon.set_health(90);
        assert_eq!(pokemon.current_health(), 40);
    }

    #[test]
    fn test_observers_hear_every_call() {
        let recorder = Rc::new(Recorder::default());
        let mut pokemon = dummy(40);
        pokemon.add_observer(recorder.clone());

        pokemon.take_damage(10);
        pokemon.take_damage(0);
        pokemon.take_damage(99);

        assert_eq!(*recorder.calls.borrow(), vec![(40, 30), (30, 30), (30, 0)]);
    }

    #[test]
    fn test_damage_is_floored_product() {
        let mut attacker = PokemonInst::new(
            "Charmander",
            PokemonType::Fire,
            EvolutionStage::Base,
            40,
            vec![Move::new("Scratch", 10)],
        );
        let mut target = dummy(40);

        let outcome = attacker
            .attack_with(0, &mut target, bonus, &ProgressionConfig::default())
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.damage, 14);
        assert_eq!(outcome.message, "Charmander used Scratch on Dummy!");
        assert_eq!(target.current_health(), 26);
        assert!(!outcome.target_fainted);
    }

    #[test]
    fn test_fainted_attacker_does_nothing() {
        let mut attacker = dummy(40);
        attacker.take_damage(40);
        let mut target = dummy(40);

        let outcome = attacker.attack(0, &mut target).unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Dummy is fainted and cannot attack!");
        assert_eq!(target.current_health(), 40);
        assert_eq!(attacker.xp, 0);
    }

    #[test]
    fn test_invalid_move_index() {
        let mut attacker = dummy(40);
        let mut target = dummy(40);
        assert_eq!(
            attacker.attack(4, &mut target).unwrap_err(),
            BattleEngineError::Action(ActionError::InvalidMoveIndex(4))
        );
        assert_eq!(target.current_health(), 40);
    }

    #[test]
    fn test_knockout_awards_xp() {
        let mut attacker = dummy(40);
        let mut target = dummy(5);

        let outcome = attacker
            .attack_with(0, &mut target, flat, &ProgressionConfig::default())
            .unwrap();

        assert!(outcome.target_fainted);
        assert_eq!(attacker.xp, 10);
        assert_eq!(attacker.level, 1);
        assert!(outcome.evolved.is_none());
    }

    #[test]
    fn test_level_up_grows_stats() {
        let progression = ProgressionConfig::default();
        let mut pokemon = PokemonInst::from_species("Squirtle").unwrap();
        pokemon.take_damage(30);
        pokemon.xp = 30;

        assert_eq!(pokemon.level_up_check(&progression).unwrap(), None);

        assert_eq!(pokemon.level, 2);
        assert_eq!(pokemon.xp, 0);
        assert_eq!(pokemon.max_health(), 50);
        assert_eq!(pokemon.current_health(), 50);
        assert_eq!(pokemon.moves()[0], Move::new("Tackle", 15));
        assert_eq!(pokemon.moves().len(), 4);
    }

    #[test]
    fn test_below_threshold_is_noop() {
        let mut pokemon = PokemonInst::from_species("Squirtle").unwrap();
        pokemon.xp = 29;
        assert_eq!(pokemon.level_up_check(&ProgressionConfig::default()).unwrap(), None);
        assert_eq!(pokemon.level, 1);
        assert_eq!(pokemon.xp, 29);
    }

    #[test]
    fn test_knockout_at_level_three_evolves() {
        let mut charmander = PokemonInst::from_species("Charmander").unwrap();
        charmander.level = 3;
        charmander.xp = 20;
        let mut target = dummy(1);

        let outcome = charmander
            .attack_with(0, &mut target, flat, &ProgressionConfig::default())
            .unwrap();

        let evolved = outcome.evolved.expect("Charmander should evolve");
        assert_eq!(evolved.name, "Charmeleon");
        assert_eq!(evolved.stage, EvolutionStage::Second);
        assert!(evolved.stage > charmander.stage);
        assert_eq!(evolved.level, 1);
        assert_eq!(evolved.xp, 0);
        assert_eq!(evolved.current_health(), 100);
    }

    #[test]
    fn test_evolution_keeps_observers() {
        let recorder = Rc::new(Recorder::default());
        let mut ivysaur = PokemonInst::from_species("Ivysaur").unwrap();
        ivysaur.add_observer(recorder.clone());
        ivysaur.level = 3;
        ivysaur.xp = 40;

        let mut evolved = ivysaur
            .level_up_check(&ProgressionConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(evolved.name, "Venusaur");

        evolved.take_damage(1);
        assert_eq!(*recorder.calls.borrow(), vec![(200, 199)]);
    }

    #[test]
    fn test_final_stage_never_evolves() {
        let progression = ProgressionConfig::default();
        let mut charizard = PokemonInst::from_species("Charizard").unwrap();
        charizard.level = 9;
        charizard.xp = 10_000;

        assert_eq!(charizard.level_up_check(&progression).unwrap(), None);
        assert_eq!(charizard.level, 10);
        assert_eq!(charizard.stage, EvolutionStage::Final);
    }

    #[test]
    fn test_unlisted_combatant_never_evolves() {
        let mut pokemon = dummy(40);
        pokemon.level = 3;
        pokemon.xp = 30;
        assert_eq!(pokemon.level_up_check(&ProgressionConfig::default()).unwrap(), None);
        assert_eq!(pokemon.level, 4);
    }

    #[test]
    fn test_record_round_trip() {
        let mut pokemon = PokemonInst::from_species("Wartortle").unwrap();
        pokemon.take_damage(33);
        pokemon.level = 3;
        pokemon.xp = 20;

        let record = pokemon.to_record();
        assert_eq!(record.0, "Wartortle");
        assert_eq!(record.2, 67);

        let restored = PokemonInst::from_record(record).unwrap();
        assert_eq!(restored, pokemon);
        assert_eq!(restored.current_health(), 67);
        assert_eq!(restored.observer_count(), 0);
    }

    #[test]
    fn test_record_survives_json() {
        let pokemon = PokemonInst::from_species("Bulbasaur").unwrap();
        let json = serde_json::to_value(pokemon.to_record()).unwrap();
        assert!(json.is_array());
        let record: PokemonRecord = serde_json::from_value(json).unwrap();
        assert_eq!(PokemonInst::from_record(record).unwrap(), pokemon);
    }

    #[rstest]
    #[case(PokemonType::Fire, PokemonType::Grass, true)]
    #[case(PokemonType::Water, PokemonType::Fire, true)]
    #[case(PokemonType::Grass, PokemonType::Water, true)]
    #[case(PokemonType::Fire, PokemonType::Fire, false)]
    #[case(PokemonType::Fire, PokemonType::Water, false)]
    #[case(PokemonType::Water, PokemonType::Water, false)]
    #[case(PokemonType::Water, PokemonType::Grass, false)]
    #[case(PokemonType::Grass, PokemonType::Grass, false)]
    #[case(PokemonType::Grass, PokemonType::Fire, false)]
    fn test_type_chart(
        #[case] attacking: PokemonType,
        #[case] defending: PokemonType,
        #[case] advantaged: bool,
        #[values(EvolutionStage::Base, EvolutionStage::Second, EvolutionStage::Final)]
        stage: EvolutionStage,
    ) {
        let expected = match (advantaged, stage) {
            (false, _) => 1.0,
            (true, EvolutionStage::Base) => 1.4,
            (true, EvolutionStage::Second) => 1.75,
            (true, EvolutionStage::Final) => 2.0,
        };
        assert_eq!(
            PokemonType::advantage_multiplier(attacking, defending, stage),
            expected
        );
        assert_eq!(attacking.has_advantage_over(defending), advantaged);
    }

    #[rstest]
    #[case(EvolutionStage::Base, 25, 35)]
    #[case(EvolutionStage::Second, 40, 70)]
    #[case(EvolutionStage::Final, 70, 140)]
    fn test_super_effective_damage(
        #[case] stage: EvolutionStage,
        #[case] base_damage: u32,
        #[case] expected: u32,
    ) {
        let mut attacker = PokemonInst::new(
            "Attacker",
            PokemonType::Grass,
            stage,
            200,
            vec![Move::new("Leaf", base_damage)],
        );
        let mut target = dummy(500);
        let outcome = attacker.attack(0, &mut target).unwrap();
        assert_eq!(outcome.damage, expected);
    }

    #[rstest]
    #[case(0, 0, 1, "max health is 0")]
    #[case(40, 41, 1, "health 41/40 exceeds its maximum")]
    #[case(40, 40, 0, "level is 0")]
    fn test_malformed_record_is_rejected(
        #[case] max_health: u32,
        #[case] current_health: u32,
        #[case] level: u32,
        #[case] problem: &str,
    ) {
        let record = (
            "Saved".to_string(),
            max_health,
            current_health,
            PokemonType::Fire,
            level,
            0,
            vec![Move::new("Hit", 10)],
            EvolutionStage::Base,
        );
        assert_eq!(
            PokemonInst::from_record(record),
            Err(PlayerStateError::MalformedRecord {
                name: "Saved".to_string(),
                problem: problem.to_string(),
            })
        );
    }

    #[test]
    fn test_record_without_moves_is_rejected() {
        let mut record = dummy(40).to_record();
        record.6.clear();
        assert!(matches!(
            PokemonInst::from_record(record),
            Err(PlayerStateError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_saved_xp_near_the_limit_saturates() {
        let record = (
            "Saved".to_string(),
            40,
            40,
            PokemonType::Fire,
            1,
            u32::MAX - 5,
            vec![Move::new("Hit", 100)],
            EvolutionStage::Final,
        );
        let mut attacker = PokemonInst::from_record(record).unwrap();
        let mut target = dummy(10);

        let outcome = attacker.attack(0, &mut target).unwrap();

        assert!(outcome.target_fainted);
        // the saturated xp clears the threshold and resets
        assert_eq!(attacker.level, 2);
        assert_eq!(attacker.xp, 0);
    }

    #[test]
    fn test_growth_saturates_at_the_limit() {
        let mut pokemon = PokemonInst::new(
            "Maxed",
            PokemonType::Water,
            EvolutionStage::Final,
            u32::MAX,
            vec![Move::new("Big", u32::MAX)],
        );
        pokemon.level = u32::MAX;
        pokemon.xp = 50;

        assert_eq!(pokemon.level_up_check(&ProgressionConfig::default()).unwrap(), None);

        assert_eq!(pokemon.level, u32::MAX);
        assert_eq!(pokemon.max_health(), u32::MAX);
        assert_eq!(pokemon.moves()[0].damage, u32::MAX);
    }
}
