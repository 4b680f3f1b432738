use crate::battle::ai::Difficulty;
use crate::battle::controller::BattleController;
use crate::battle::state::{BattleEvent, TurnRng};
use crate::config::BattleConfig;
use crate::errors::BattleResult;
use crate::inventory::Bag;
use crate::player::{write_state, InMemoryPlayer, ACTIVE_POKEMON, BAG};
use crate::pokeball::{BallTier, Pokeball};
use crate::pokemon::PokemonInst;
use schema::{EvolutionStage, Move, PokemonType};
use std::time::{Duration, Instant};

pub const PLAYER_NAME: &str = "Ash";

/// A builder for test combatants.
///
/// # Example
/// ```
/// let striker = TestPokemonBuilder::new("Striker", PokemonType::Fire)
///     .with_moves(vec![Move::new("Finisher", 100)])
///     .with_hp(20)
///     .build();
/// ```
pub struct TestPokemonBuilder {
    name: String,
    pokemon_type: PokemonType,
    stage: EvolutionStage,
    from_table: bool,
    max_hp: u32,
    moves: Option<Vec<Move>>,
    current_hp: Option<u32>,
    level: Option<u32>,
    xp: Option<u32>,
}

impl TestPokemonBuilder {
    /// A combatant outside the species table: Base stage, 100 HP, one 10-damage Tackle.
    pub fn new(name: &str, pokemon_type: PokemonType) -> Self {
        Self {
            name: name.to_string(),
            pokemon_type,
            stage: EvolutionStage::Base,
            from_table: false,
            max_hp: 100,
            moves: None,
            current_hp: None,
            level: None,
            xp: None,
        }
    }

    /// A combatant built from its species table row.
    pub fn species(name: &str) -> Self {
        Self {
            from_table: true,
            ..Self::new(name, PokemonType::Fire)
        }
    }

    pub fn with_moves(mut self, moves: Vec<Move>) -> Self {
        self.moves = Some(moves);
        self
    }

    pub fn with_max_hp(mut self, max_hp: u32) -> Self {
        self.max_hp = max_hp;
        self
    }

    /// Sets current HP. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn build(self) -> PokemonInst {
        let mut pokemon = if self.from_table {
            match PokemonInst::from_species(&self.name) {
                Ok(pokemon) => pokemon,
                Err(err) => panic!("Failed to load species data for {}: {}", self.name, err),
            }
        } else {
            PokemonInst::new(
                self.name,
                self.pokemon_type,
                self.stage,
                self.max_hp,
                self.moves
                    .clone()
                    .unwrap_or_else(|| vec![Move::new("Tackle", 10)]),
            )
        };
        if let Some(hp) = self.current_hp {
            pokemon.set_health(hp);
        }
        if let Some(level) = self.level {
            pokemon.level = level;
        }
        if let Some(xp) = self.xp {
            pokemon.xp = xp;
        }
        pokemon
    }
}

/// The player's default combatant: 100 HP Fire type with one 10-damage move.
pub fn striker() -> TestPokemonBuilder {
    TestPokemonBuilder::new("Striker", PokemonType::Fire)
}

/// The default wild opponent: 50 HP Fire type, so no type bonus either way.
pub fn target() -> TestPokemonBuilder {
    TestPokemonBuilder::new("Target", PokemonType::Fire).with_max_hp(50)
}

pub fn stored(pokemon: PokemonInst) -> Pokeball {
    Pokeball::holding(BallTier::Basic, pokemon)
}

/// A player whose persisted state already holds `active` and `bag`.
pub fn create_test_player(active: &PokemonInst, bag: &Bag) -> InMemoryPlayer {
    let mut player = InMemoryPlayer::new(PLAYER_NAME);
    assert_ok(write_state(&mut player, ACTIVE_POKEMON, &active.to_record()).map_err(Into::into));
    assert_ok(write_state(&mut player, BAG, &bag.to_record()).map_err(Into::into));
    player
}

/// A battle driven by a simulated clock.
pub struct TestBattle {
    pub controller: BattleController<InMemoryPlayer>,
    pub clock: Instant,
}

impl TestBattle {
    /// Run one update at the current simulated time.
    pub fn tick(&mut self) -> Vec<BattleEvent> {
        assert_ok(self.controller.update_at(self.clock))
    }

    /// Select an option, then update.
    pub fn choose(&mut self, option: &str) -> Vec<BattleEvent> {
        self.controller.set_selected_option(option);
        self.tick()
    }

    pub fn advance(&mut self, duration: Duration) {
        self.clock += duration;
    }

    /// Let the enemy's response delay pass, then update.
    pub fn wait_for_enemy(&mut self) -> Vec<BattleEvent> {
        self.advance(BattleConfig::default().enemy_response_time());
        self.tick()
    }
}

/// A Medium-difficulty battle with default tuning.
pub fn create_test_battle(
    player_pokemon: PokemonInst,
    enemy_pokemon: PokemonInst,
    bag: Bag,
    rng: TurnRng,
) -> TestBattle {
    create_test_battle_with(player_pokemon, enemy_pokemon, bag, Difficulty::Medium, rng)
}

pub fn create_test_battle_with(
    player_pokemon: PokemonInst,
    enemy_pokemon: PokemonInst,
    bag: Bag,
    difficulty: Difficulty,
    rng: TurnRng,
) -> TestBattle {
    let player = create_test_player(&player_pokemon, &bag);
    let controller = BattleController::from_parts(
        player,
        player_pokemon,
        enemy_pokemon,
        bag,
        difficulty,
        BattleConfig::default(),
        rng,
    );
    TestBattle {
        controller,
        clock: Instant::now(),
    }
}

/// Creates a `TurnRng` that panics on the first draw.
/// Use it for scenarios that must not consult randomness.
pub fn no_rng() -> TurnRng {
    TurnRng::new_for_test(Vec::new())
}

/// Narration texts, in order.
pub fn narration(events: &[BattleEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.text().map(str::to_string))
        .collect()
}

/// The labels of the last options prompt, if any was shown.
pub fn last_options(events: &[BattleEvent]) -> Option<Vec<String>> {
    events.iter().rev().find_map(|e| match e {
        BattleEvent::Options {
            options,
            destroy: false,
        } => Some(options.clone()),
        _ => None,
    })
}

pub fn snapshot_count(events: &[BattleEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, BattleEvent::Snapshot { destroy: false, .. }))
        .count()
}

/// Index of the first narration line containing `needle`.
pub fn position_of(texts: &[String], needle: &str) -> usize {
    match texts.iter().position(|t| t.contains(needle)) {
        Some(index) => index,
        None => panic!("no narration contains {:?}; got {:#?}", needle, texts),
    }
}

/// Helper function to assert that a Result is Ok and return the value.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}
