//! Pengumon demo - drives one wild battle on a simulated clock and prints
//! every event. The player always picks their first attack.
//!
//! Usage: `pengumon-demo [config.ron]`

use pengumon::player::{write_state, ACTIVE_POKEMON, BAG};
use pengumon::{
    species, Bag, BallTier, BattleConfig, BattleController, BattleEvent, EventBus, InMemoryPlayer,
    PokemonInst, Potion, PotionSize, TurnRng, TurnStage,
};
use std::error::Error;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Give up on a battle that has not ended after this many ticks.
const MAX_TICKS: usize = 500;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pengumon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => BattleConfig::load(Path::new(&path))?,
        None => BattleConfig::default(),
    };
    let mut rng = TurnRng::new_random();

    let starters = species::starter_species()?;
    let wilds = species::wild_species()?;
    let wild = wilds[rng.uniform_index(wilds.len(), "wild species")];

    let player = demo_player(starters[0])?;
    let mut controller = BattleController::new(player, wild, config.clone(), rng)?;

    let mut clock = Instant::now();
    let mut prompt: Vec<String> = Vec::new();
    for _ in 0..MAX_TICKS {
        let events = controller.update_at(clock)?;
        if let Some(options) = latest_prompt(&events) {
            prompt = options;
        }
        let mut bus = EventBus::new();
        bus.extend(events);
        bus.print_formatted();

        if controller.is_over() {
            break;
        }
        match controller.stage() {
            TurnStage::AwaitInput => {
                if let Some(first) = prompt.first() {
                    println!("> {}", first);
                    controller.set_selected_option(first.clone());
                }
            }
            TurnStage::AwaitSwitch | TurnStage::AwaitBag => {
                controller.set_selected_option("Return");
            }
            _ => clock += config.enemy_response_time(),
        }
    }

    let player = controller.into_player();
    println!();
    println!("Saved state:");
    for (key, value) in player.state() {
        println!("  {}: {}", key, value);
    }
    Ok(())
}

fn demo_player(starter: &str) -> Result<InMemoryPlayer, Box<dyn Error>> {
    let active = PokemonInst::from_species(starter)?;
    let mut bag = Bag::new();
    bag.potions.add(Potion::new(PotionSize::Small));
    bag.potions.add(Potion::reviving(PotionSize::Small));
    bag.pokeballs.add(BallTier::Basic);

    let mut player = InMemoryPlayer::new("Ash");
    write_state(&mut player, ACTIVE_POKEMON, &active.to_record())?;
    write_state(&mut player, BAG, &bag.to_record())?;
    Ok(player)
}

fn latest_prompt(events: &[BattleEvent]) -> Option<Vec<String>> {
    events.iter().rev().find_map(|event| match event {
        BattleEvent::Options {
            options,
            destroy: false,
        } => Some(options.clone()),
        _ => None,
    })
}
