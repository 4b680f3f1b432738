//! The wild-battle turn state machine.
//!
//! A driver calls `update()` once per tick and renders the returned events.
//! Player choices arrive through `set_selected_option` and are consumed only
//! while the controller waits on input. Every change to the combatants and the
//! bag stays private to the controller until the battle ends, when both are
//! written back to the player in one step.

use crate::battle::ai::{Difficulty, EnemyAction};
use crate::battle::state::{BattleEvent, EventBus, TurnRng, TurnStage};
use crate::config::BattleConfig;
use crate::errors::{ActionError, BattleResult, PlayerStateError};
use crate::inventory::{Bag, BagRecord};
use crate::items::Potion;
use crate::observers::BattleMessageNotifier;
use crate::player::{read_state, write_state, PlayerContext, ACTIVE_POKEMON, BAG, ENEMY_AI};
use crate::pokeball::BallTier;
use crate::pokemon::{PokemonInst, PokemonRecord};
use schema::PokemonType;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Menu name registered with the player while a battle owns their input.
pub const BATTLE_MENU: &str = "pokemon_battle";

pub const DODGE_OPTION: &str = "Dodge";
pub const RUN_OPTION: &str = "Run";
pub const BAG_OPTION: &str = "Bag";
pub const SWITCH_OPTION: &str = "Switch Pokemon";
pub const RETURN_OPTION: &str = "Return";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BagChoice {
    Potion(Potion),
    Ball(BallTier),
}

pub struct BattleController<P: PlayerContext> {
    player: P,
    player_name: String,
    player_pokemon: PokemonInst,
    enemy_pokemon: PokemonInst,
    bag: Bag,
    difficulty: Difficulty,
    config: BattleConfig,
    rng: TurnRng,
    notifier: BattleMessageNotifier,
    /// A declared dodge waiting on the opponent's next action
    used_dodge: bool,
    stage: TurnStage,
    last_action: Instant,
    selected: Option<String>,
    switch_options: HashMap<String, usize>,
    bag_options: HashMap<String, BagChoice>,
}

impl<P: PlayerContext> BattleController<P> {
    /// Start a wild battle against `wild_species`.
    ///
    /// Reads the active Pokémon (required), the bag (empty if absent) and the
    /// enemy difficulty tag (Medium if absent) from the player's state.
    pub fn new(
        player: P,
        wild_species: &str,
        config: BattleConfig,
        rng: TurnRng,
    ) -> BattleResult<Self> {
        let record: PokemonRecord = read_state(&player, ACTIVE_POKEMON)?
            .ok_or_else(|| PlayerStateError::MissingKey(ACTIVE_POKEMON.to_string()))?;
        let bag = match read_state::<BagRecord>(&player, BAG)? {
            Some(record) => Bag::from_record(record)?,
            None => Bag::new(),
        };
        let difficulty = read_state::<String>(&player, ENEMY_AI)?
            .map(|tag| Difficulty::from_tag(&tag))
            .unwrap_or_default();
        let active = PokemonInst::from_record(record)?;
        let enemy = PokemonInst::from_species(wild_species)?;

        Ok(Self::from_parts(
            player,
            active,
            enemy,
            bag,
            difficulty,
            config,
            rng,
        ))
    }

    /// Assemble a session from already-decoded parts.
    pub fn from_parts(
        player: P,
        mut player_pokemon: PokemonInst,
        mut enemy_pokemon: PokemonInst,
        bag: Bag,
        difficulty: Difficulty,
        config: BattleConfig,
        rng: TurnRng,
    ) -> Self {
        let notifier = BattleMessageNotifier::new();
        for pokemon in [&mut player_pokemon, &mut enemy_pokemon] {
            pokemon.clear_observers();
            pokemon.add_observer(Rc::new(notifier.clone()));
        }

        BattleController {
            player_name: player.name().to_string(),
            player,
            player_pokemon,
            enemy_pokemon,
            bag,
            difficulty,
            config,
            rng,
            notifier,
            used_dodge: false,
            stage: TurnStage::Idle,
            last_action: Instant::now(),
            selected: None,
            switch_options: HashMap::new(),
            bag_options: HashMap::new(),
        }
    }

    /// Deposit the player's selection. Overwrites any unconsumed one.
    pub fn set_selected_option(&mut self, option: impl Into<String>) {
        self.selected = Some(option.into());
    }

    pub fn clear_option(&mut self) {
        self.selected = None;
    }

    pub fn is_over(&self) -> bool {
        self.stage == TurnStage::Cleanup
    }

    pub fn stage(&self) -> TurnStage {
        self.stage
    }

    pub fn player_pokemon(&self) -> &PokemonInst {
        &self.player_pokemon
    }

    pub fn enemy_pokemon(&self) -> &PokemonInst {
        &self.enemy_pokemon
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn dodge_pending(&self) -> bool {
        self.used_dodge
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn into_player(self) -> P {
        self.player
    }

    pub fn update(&mut self) -> BattleResult<Vec<BattleEvent>> {
        self.update_at(Instant::now())
    }

    /// Advance the state machine as of `now`.
    ///
    /// Stages that need neither input nor time (intro, presenting options,
    /// the enemy's move) run in the same call as the transition into them.
    pub fn update_at(&mut self, now: Instant) -> BattleResult<Vec<BattleEvent>> {
        if self.stage == TurnStage::Cleanup {
            return Ok(Vec::new());
        }

        let mut bus = EventBus::new();
        loop {
            let before = self.stage;
            self.step(&mut bus, now)?;
            self.flush(&mut bus);

            if self.stage == before {
                break;
            }
            debug!(from = ?before, to = ?self.stage, "stage transition");
            if !matches!(
                self.stage,
                TurnStage::Intro | TurnStage::PlayerTurn | TurnStage::EnemyTurn
            ) {
                break;
            }
        }
        Ok(bus.into_events())
    }

    fn step(&mut self, bus: &mut EventBus, now: Instant) -> BattleResult<()> {
        match self.stage {
            TurnStage::Idle => {
                self.player.set_current_menu(Some(BATTLE_MENU.to_string()));
                info!(
                    player = %self.player_name,
                    wild = %self.enemy_pokemon.name,
                    difficulty = self.difficulty.tag(),
                    "battle started"
                );
                self.stage = TurnStage::Intro;
            }
            TurnStage::Intro => self.handle_intro(bus, now),
            TurnStage::PlayerTurn => self.handle_player_turn(bus, now),
            TurnStage::AwaitInput => self.handle_await_input(bus, now)?,
            TurnStage::AwaitSwitch => self.handle_await_switch(bus, now),
            TurnStage::AwaitBag => self.handle_await_bag(bus, now)?,
            TurnStage::EnemyWait => {
                if now.saturating_duration_since(self.last_action)
                    >= self.config.enemy_response_time()
                {
                    self.stage = TurnStage::EnemyTurn;
                }
            }
            TurnStage::EnemyTurn => self.handle_enemy_turn(bus, now)?,
            TurnStage::End => self.handle_end(bus, now)?,
            TurnStage::Cleanup => {}
        }
        Ok(())
    }

    fn flush(&self, bus: &mut EventBus) {
        bus.extend(self.notifier.drain());
    }

    fn snapshot(&self) -> BattleEvent {
        BattleEvent::snapshot(&self.player_pokemon, &self.enemy_pokemon)
    }

    fn tagged(&self, text: impl std::fmt::Display) -> String {
        format!("({}) {}", self.player_name, text)
    }

    /// Clear a pending dodge, reporting whether one was pending.
    fn take_dodge(&mut self) -> bool {
        std::mem::take(&mut self.used_dodge)
    }

    fn back_to_main(&mut self, bus: &mut EventBus, text: &str) {
        bus.narrate(text);
        self.stage = TurnStage::PlayerTurn;
    }

    fn handle_intro(&mut self, bus: &mut EventBus, now: Instant) {
        bus.narrate(format!("You encountered a wild {}!", self.enemy_pokemon.name));
        bus.push(self.snapshot());
        self.stage = TurnStage::PlayerTurn;
        self.last_action = now;
    }

    fn handle_player_turn(&mut self, bus: &mut EventBus, now: Instant) {
        self.clear_option();

        let mut options: Vec<String> = self
            .player_pokemon
            .moves()
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}: {} ({})", i, m.name, m.damage))
            .collect();
        options.extend([DODGE_OPTION, RUN_OPTION, BAG_OPTION].map(String::from));
        if self
            .bag
            .pokemon
            .available_pokemon()
            .is_some_and(|available| !available.is_empty())
        {
            options.push(SWITCH_OPTION.to_string());
        }

        bus.push(BattleEvent::options(options));
        self.stage = TurnStage::AwaitInput;
        self.last_action = now;
    }

    fn handle_await_input(&mut self, bus: &mut EventBus, now: Instant) -> BattleResult<()> {
        let Some(selected) = self.selected.take() else {
            return Ok(());
        };

        match selected.as_str() {
            DODGE_OPTION => {
                self.take_dodge();
                self.used_dodge = true;
                bus.narrate(self.tagged(format!(
                    "{} prepares to dodge!",
                    self.player_pokemon.name
                )));
                self.stage = TurnStage::EnemyWait;
                self.last_action = now;
            }
            RUN_OPTION => {
                self.take_dodge();
                if self.rng.roll(self.config.run_chance, "run attempt") {
                    bus.narrate(self.tagged("You ran away safely!"));
                    self.stage = TurnStage::End;
                } else {
                    bus.narrate(self.tagged("You tried to run but couldn't escape!"));
                    self.stage = TurnStage::EnemyWait;
                }
                self.last_action = now;
            }
            SWITCH_OPTION => self.open_switch_menu(bus),
            BAG_OPTION => self.open_bag_menu(bus),
            other => match parse_move_index(other) {
                Some(index) if index < self.player_pokemon.moves().len() => {
                    self.process_player_attack(index, bus, now)?;
                }
                Some(index) => {
                    warn!(index, "move index out of range");
                    bus.narrate("Invalid selection.");
                }
                None => {
                    warn!(option = other, "unrecognized option");
                    bus.narrate("Unrecognized action.");
                }
            },
        }
        Ok(())
    }

    fn process_player_attack(
        &mut self,
        index: usize,
        bus: &mut EventBus,
        now: Instant,
    ) -> BattleResult<()> {
        self.last_action = now;
        let move_name = self.player_pokemon.moves()[index].name.clone();

        if self.take_dodge() {
            if self
                .rng
                .roll(self.config.opponent_dodge_chance, "opponent dodge")
            {
                bus.narrate(format!(
                    "(Opp) {} dodged {}!",
                    self.enemy_pokemon.name, move_name
                ));
                self.stage = TurnStage::EnemyWait;
                return Ok(());
            }
            bus.narrate("(Opp) Dodge failed!");
        }

        let level_before = self.player_pokemon.level;
        let outcome = self.player_pokemon.attack_with(
            index,
            &mut self.enemy_pokemon,
            PokemonType::advantage_multiplier,
            &self.config.progression,
        )?;
        bus.narrate(self.tagged(&outcome.message));
        self.flush(bus);

        if self.player_pokemon.level > level_before {
            bus.narrate(format!(
                "{} grew to level {}!",
                self.player_pokemon.name, self.player_pokemon.level
            ));
        }
        if let Some(evolved) = outcome.evolved {
            self.player_pokemon = evolved;
            bus.narrate(format!(
                "Your Pokémon evolved into {}!",
                self.player_pokemon.name
            ));
        }
        bus.push(self.snapshot());

        if outcome.target_fainted {
            bus.narrate(format!(
                "(Opp) {} has fainted! You won!",
                self.enemy_pokemon.name
            ));
            self.stage = TurnStage::End;
        } else {
            self.stage = TurnStage::EnemyWait;
        }
        Ok(())
    }

    fn open_switch_menu(&mut self, bus: &mut EventBus) {
        let available = match self.bag.pokemon.available_pokemon() {
            Some(available) if !available.is_empty() => available,
            _ => {
                self.back_to_main(bus, "No healthy Pokémon available to switch.");
                return;
            }
        };

        self.switch_options.clear();
        let mut labels = Vec::with_capacity(available.len() + 1);
        for (index, ball) in available {
            let mut label = format!(
                "{} HP: {}",
                ball.label(),
                ball.health_label().unwrap_or_default()
            );
            if self.switch_options.contains_key(&label) {
                label = format!("{} #{}", label, index + 1);
            }
            self.switch_options.insert(label.clone(), index);
            labels.push(label);
        }
        labels.push(RETURN_OPTION.to_string());

        bus.narrate("Choose a Pokémon to switch to:");
        bus.push(BattleEvent::options(labels));
        self.stage = TurnStage::AwaitSwitch;
    }

    /// Put the roster entry at `index` in play. Observers follow the active slot.
    fn swap_in(&mut self, index: usize) -> bool {
        self.player_pokemon.clear_observers();
        let swapped = self
            .bag
            .pokemon
            .switch_active(index, &mut self.player_pokemon);
        self.player_pokemon
            .add_observer(Rc::new(self.notifier.clone()));
        swapped
    }

    fn handle_await_switch(&mut self, bus: &mut EventBus, now: Instant) {
        let Some(selected) = self.selected.take() else {
            return;
        };
        if selected == RETURN_OPTION {
            self.back_to_main(bus, "Returning to main options.");
            return;
        }

        let index = self.switch_options.get(&selected).copied();
        match index {
            Some(index) if self.swap_in(index) => {
                self.take_dodge();
                bus.narrate(format!("You switched to {}!", self.player_pokemon.name));
                bus.push(self.snapshot());
                self.stage = TurnStage::EnemyWait;
                self.last_action = now;
            }
            _ => {
                warn!(option = %selected, "invalid switch selection");
                self.back_to_main(bus, "Invalid selection. Returning to main options.");
            }
        }
    }

    fn open_bag_menu(&mut self, bus: &mut EventBus) {
        self.bag_options.clear();
        let mut labels = Vec::new();
        for (potion, _) in self.bag.potions.entries() {
            let label = format!("Potion: {}", potion.label());
            self.bag_options
                .insert(label.clone(), BagChoice::Potion(potion));
            labels.push(label);
        }
        for (tier, _) in self.bag.pokeballs.entries() {
            let label = format!("Ball: {}", tier.name());
            self.bag_options.insert(label.clone(), BagChoice::Ball(tier));
            labels.push(label);
        }

        if labels.is_empty() {
            self.back_to_main(bus, "Your bag is empty.");
            return;
        }
        labels.push(RETURN_OPTION.to_string());

        bus.narrate("Choose an item to use:");
        bus.push(BattleEvent::options(labels));
        self.stage = TurnStage::AwaitBag;
    }

    fn handle_await_bag(&mut self, bus: &mut EventBus, now: Instant) -> BattleResult<()> {
        let Some(selected) = self.selected.take() else {
            return Ok(());
        };
        if selected == RETURN_OPTION {
            self.back_to_main(bus, "Returning to main options.");
            return Ok(());
        }

        match self.bag_options.get(&selected).copied() {
            Some(BagChoice::Potion(potion)) => self.use_potion(potion, bus, now),
            Some(BagChoice::Ball(tier)) => self.throw_ball(tier, bus, now)?,
            None => {
                warn!(option = %selected, "invalid bag selection");
                self.back_to_main(bus, "Invalid selection. Returning to main options.");
            }
        }
        Ok(())
    }

    fn use_potion(&mut self, potion: Potion, bus: &mut EventBus, now: Instant) {
        if self.bag.potions.remove(potion).is_none() {
            self.back_to_main(bus, "Item not found.");
            return;
        }

        let outcome = potion.use_on(&mut self.player_pokemon);
        bus.narrate(self.tagged(&outcome.message));
        if outcome.success {
            self.take_dodge();
            self.flush(bus);
            bus.push(self.snapshot());
            self.stage = TurnStage::EnemyWait;
            self.last_action = now;
        } else {
            // No effect, so the potion goes back in the bag.
            self.bag.potions.add(potion);
            self.stage = TurnStage::PlayerTurn;
        }
    }

    fn throw_ball(&mut self, tier: BallTier, bus: &mut EventBus, now: Instant) -> BattleResult<()> {
        if self.bag.pokemon.is_full() {
            warn!("catch refused, roster full");
            self.back_to_main(bus, "Your roster is full!");
            return Ok(());
        }
        let Some(mut ball) = self.bag.pokeballs.remove(tier) else {
            self.back_to_main(bus, "Item not found.");
            return Ok(());
        };

        self.take_dodge();
        self.last_action = now;
        bus.narrate(self.tagged(format!("You threw a {}!", tier.name())));

        if ball.use_on(&self.enemy_pokemon, &mut self.rng)? {
            bus.narrate(format!(
                "Gotcha! {} was caught in the {}!",
                self.enemy_pokemon.name,
                tier.name()
            ));
            self.bag.pokemon.add(ball);
            self.stage = TurnStage::End;
        } else {
            bus.narrate(format!(
                "{} broke free from the {}!",
                self.enemy_pokemon.name,
                tier.name()
            ));
            self.stage = TurnStage::EnemyWait;
        }
        Ok(())
    }

    fn handle_enemy_turn(&mut self, bus: &mut EventBus, now: Instant) -> BattleResult<()> {
        let action =
            self.difficulty
                .choose_action(&self.enemy_pokemon, &self.player_pokemon, &mut self.rng);
        debug!(action = %action, "enemy action");

        match action {
            EnemyAction::Dodge => {
                self.take_dodge();
                self.used_dodge = true;
                bus.narrate(format!(
                    "(Opp) {} is preparing to dodge!",
                    self.enemy_pokemon.name
                ));
            }
            EnemyAction::Attack(index) => self.process_enemy_attack(index, bus)?,
        }

        if self.player_pokemon.is_fainted() {
            bus.narrate(self.tagged(format!("{} has fainted!", self.player_pokemon.name)));
            self.stage = TurnStage::End;
        } else {
            self.stage = TurnStage::PlayerTurn;
        }
        self.last_action = now;
        Ok(())
    }

    fn process_enemy_attack(&mut self, index: usize, bus: &mut EventBus) -> BattleResult<()> {
        let move_name = self
            .enemy_pokemon
            .moves()
            .get(index)
            .map(|m| m.name.clone())
            .ok_or(ActionError::InvalidMoveIndex(index))?;

        if self.take_dodge() {
            if self.rng.roll(self.config.player_dodge_chance, "player dodge") {
                bus.narrate(self.tagged(format!(
                    "{} dodged {} attack!",
                    self.player_pokemon.name, move_name
                )));
                return Ok(());
            }
            bus.narrate(self.tagged("Dodge failed!"));
        }

        // The wild Pokémon can level up from a knockout but never evolves mid-battle.
        let outcome = self.enemy_pokemon.attack_with(
            index,
            &mut self.player_pokemon,
            PokemonType::advantage_multiplier,
            &self.config.progression,
        )?;
        bus.narrate(format!("(Opp) {}", outcome.message));
        self.flush(bus);
        bus.push(self.snapshot());
        Ok(())
    }

    fn handle_end(&mut self, bus: &mut EventBus, now: Instant) -> BattleResult<()> {
        if self.player_pokemon.is_fainted() {
            if let Some(revive) = self.bag.potions.first_revive() {
                self.bag.potions.remove(revive);
                let outcome = revive.use_on(&mut self.player_pokemon);
                info!(pokemon = %self.player_pokemon.name, potion = %revive, "auto revive");
                bus.narrate(self.tagged(&outcome.message));
                self.flush(bus);
                bus.push(self.snapshot());
                self.stage = TurnStage::EnemyWait;
                self.last_action = now;
                return Ok(());
            }

            let available: Vec<usize> = self
                .bag
                .pokemon
                .available_pokemon()
                .unwrap_or_default()
                .into_iter()
                .map(|(index, _)| index)
                .collect();
            if !available.is_empty() {
                let pick = available[self.rng.uniform_index(available.len(), "auto switch")];
                let fainted = self.player_pokemon.name.clone();
                if self.swap_in(pick) {
                    bus.narrate(self.tagged(format!(
                        "{} can't battle anymore. Switching to {}!",
                        fainted, self.player_pokemon.name
                    )));
                    bus.push(self.snapshot());
                    self.stage = TurnStage::PlayerTurn;
                    self.last_action = now;
                    return Ok(());
                }
            }

            bus.narrate(self.tagged("You lost."));
        }

        self.finish(bus)
    }

    /// Tear down the UI and write the session's results back to the player.
    fn finish(&mut self, bus: &mut EventBus) -> BattleResult<()> {
        bus.narrate("The battle has ended!");
        bus.push(BattleEvent::destroy_options());
        bus.push(BattleEvent::destroy_snapshot());

        write_state(&mut self.player, ACTIVE_POKEMON, &self.player_pokemon.to_record())?;
        write_state(&mut self.player, BAG, &self.bag.to_record())?;
        self.player.set_current_menu(None);

        info!(
            player = %self.player_name,
            active = %self.player_pokemon.name,
            roster = self.bag.pokemon.len(),
            "battle ended"
        );
        self.stage = TurnStage::Cleanup;
        Ok(())
    }
}

/// Move index from a "{i}: {name} ({damage})" option label.
fn parse_move_index(label: &str) -> Option<usize> {
    let (prefix, _) = label.split_once(':')?;
    prefix.trim().parse().ok()
}
