use crate::pokemon::PokemonInst;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Stages of the battle state machine, in the order a normal turn visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnStage {
    Idle,
    Intro,
    /// Present the main options once, then wait
    PlayerTurn,
    AwaitInput,
    AwaitSwitch,
    AwaitBag,
    /// Timer gate before the wild Pokémon responds
    EnemyWait,
    EnemyTurn,
    End,
    /// Terminal. No further events.
    Cleanup,
}

/// The fields a battle window shows for one side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PokemonSnapshot {
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
}

impl From<&PokemonInst> for PokemonSnapshot {
    fn from(pokemon: &PokemonInst) -> Self {
        PokemonSnapshot {
            name: pokemon.name.clone(),
            level: pokemon.level,
            hp: pokemon.current_health(),
            max_hp: pokemon.max_health(),
        }
    }
}

/// Presentation-neutral output of one `update()` call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BattleEvent {
    Narration {
        text: String,
    },
    /// A prompt. `destroy` tells the UI to tear down the open prompt instead.
    Options {
        options: Vec<String>,
        destroy: bool,
    },
    /// Both sides' vitals. Empty with `destroy` set at teardown.
    Snapshot {
        player: Option<PokemonSnapshot>,
        enemy: Option<PokemonSnapshot>,
        destroy: bool,
    },
}

impl BattleEvent {
    pub fn narration(text: impl Into<String>) -> Self {
        BattleEvent::Narration { text: text.into() }
    }

    pub fn options(options: Vec<String>) -> Self {
        BattleEvent::Options {
            options,
            destroy: false,
        }
    }

    pub fn snapshot(player: &PokemonInst, enemy: &PokemonInst) -> Self {
        BattleEvent::Snapshot {
            player: Some(player.into()),
            enemy: Some(enemy.into()),
            destroy: false,
        }
    }

    pub fn destroy_options() -> Self {
        BattleEvent::Options {
            options: Vec::new(),
            destroy: true,
        }
    }

    pub fn destroy_snapshot() -> Self {
        BattleEvent::Snapshot {
            player: None,
            enemy: None,
            destroy: true,
        }
    }

    /// Narration text, if this is a narration event.
    pub fn text(&self) -> Option<&str> {
        match self {
            BattleEvent::Narration { text } => Some(text),
            _ => None,
        }
    }

    /// One-line rendering for logs and the demo binary.
    pub fn format(&self) -> String {
        match self {
            BattleEvent::Narration { text } => text.clone(),
            BattleEvent::Options { destroy: true, .. } => "[options closed]".to_string(),
            BattleEvent::Options { options, .. } => format!("[options] {}", options.join(" | ")),
            BattleEvent::Snapshot { destroy: true, .. } => "[battle window closed]".to_string(),
            BattleEvent::Snapshot { player, enemy, .. } => {
                let side = |s: &Option<PokemonSnapshot>| match s {
                    Some(s) => format!("{} Lv{} {}/{}", s.name, s.level, s.hp, s.max_hp),
                    None => "-".to_string(),
                };
                format!("[status] {} vs {}", side(player), side(enemy))
            }
        }
    }
}

/// Ordered collection of events produced during one update.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn narrate(&mut self, text: impl Into<String>) {
        self.events.push(BattleEvent::narration(text));
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = BattleEvent>) {
        self.events.extend(events);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<BattleEvent> {
        self.events
    }

    /// Print all events using their formatted text.
    pub fn print_formatted(&self) {
        for event in &self.events {
            println!("  {}", event.format());
        }
    }
}

#[derive(Debug, Clone)]
enum RngSource {
    Random(StdRng),
    Scripted { values: Vec<f64>, index: usize },
    Constant(f64),
}

/// Source of every probability draw in a battle session.
///
/// Draws are uniform in `[0, 1)`. Tests script the exact sequence.
#[derive(Debug, Clone)]
pub struct TurnRng {
    source: RngSource,
}

impl TurnRng {
    pub fn new_random() -> Self {
        Self {
            source: RngSource::Random(StdRng::from_os_rng()),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: RngSource::Random(StdRng::seed_from_u64(seed)),
        }
    }

    /// Replays `values` in order and panics once they run out.
    pub fn new_for_test(values: Vec<f64>) -> Self {
        Self {
            source: RngSource::Scripted { values, index: 0 },
        }
    }

    /// Always draws `value`.
    pub fn constant(value: f64) -> Self {
        Self {
            source: RngSource::Constant(value),
        }
    }

    pub fn next_outcome(&mut self, reason: &str) -> f64 {
        let value = match &mut self.source {
            RngSource::Random(rng) => rng.random::<f64>(),
            RngSource::Constant(value) => *value,
            RngSource::Scripted { values, index } => {
                if *index >= values.len() {
                    panic!(
                        "TurnRng exhausted! Tried to get a value for: '{}'. Need more random values.",
                        reason
                    );
                }
                let value = values[*index];
                *index += 1;
                value
            }
        };
        trace!(reason, value, "rng draw");
        value
    }

    /// True with probability `chance`. One draw.
    pub fn roll(&mut self, chance: f64, reason: &str) -> bool {
        self.next_outcome(reason) < chance
    }

    /// Uniform index in `0..len`. One draw. `len` must be non-zero.
    pub fn uniform_index(&mut self, len: usize, reason: &str) -> usize {
        let draw = self.next_outcome(reason);
        ((draw * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Index chosen with probability proportional to its weight. One draw,
    /// mapped onto the cumulative weights. All-zero weights fall back to a
    /// uniform choice.
    pub fn weighted_index(&mut self, weights: &[f64], reason: &str) -> usize {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return self.uniform_index(weights.len(), reason);
        }

        let target = self.next_outcome(reason) * total;
        let mut cumulative = 0.0;
        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if target < cumulative {
                return index;
            }
        }
        weights.len().saturating_sub(1)
    }
}
