use crate::errors::PlayerStateError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// State key holding the active Pokémon's record.
pub const ACTIVE_POKEMON: &str = "active_pokemon";
/// State key holding the bag record.
pub const BAG: &str = "bag";
/// State key holding the enemy difficulty tag.
pub const ENEMY_AI: &str = "enemy_ai";

/// What the battle needs from the player who owns it: a name, keyed state,
/// and a way to claim the player's next menu selection.
pub trait PlayerContext {
    fn name(&self) -> &str;

    fn get_state(&self, key: &str) -> Option<Value>;

    fn set_state(&mut self, key: &str, value: Value);

    /// Route the player's selections to `menu`, or to nothing with `None`.
    fn set_current_menu(&mut self, menu: Option<String>);
}

impl<T: PlayerContext + ?Sized> PlayerContext for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get_state(&self, key: &str) -> Option<Value> {
        (**self).get_state(key)
    }

    fn set_state(&mut self, key: &str, value: Value) {
        (**self).set_state(key, value)
    }

    fn set_current_menu(&mut self, menu: Option<String>) {
        (**self).set_current_menu(menu)
    }
}

/// Decode the value under `key`. A missing key is `Ok(None)`.
pub fn read_state<T: DeserializeOwned>(
    player: &impl PlayerContext,
    key: &str,
) -> Result<Option<T>, PlayerStateError> {
    player
        .get_state(key)
        .map(|value| {
            serde_json::from_value(value).map_err(|e| PlayerStateError::Decode {
                key: key.to_string(),
                details: e.to_string(),
            })
        })
        .transpose()
}

pub fn write_state<T: Serialize>(
    player: &mut impl PlayerContext,
    key: &str,
    value: &T,
) -> Result<(), PlayerStateError> {
    let value = serde_json::to_value(value).map_err(|e| PlayerStateError::Encode {
        key: key.to_string(),
        details: e.to_string(),
    })?;
    player.set_state(key, value);
    Ok(())
}

/// A player whose state lives in a map. Used by the demo and by tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryPlayer {
    name: String,
    state: HashMap<String, Value>,
    current_menu: Option<String>,
}

impl InMemoryPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        InMemoryPlayer {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn current_menu(&self) -> Option<&str> {
        self.current_menu.as_deref()
    }

    pub fn state(&self) -> &HashMap<String, Value> {
        &self.state
    }
}

impl PlayerContext for InMemoryPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_state(&self, key: &str) -> Option<Value> {
        self.state.get(key).cloned()
    }

    fn set_state(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
    }

    fn set_current_menu(&mut self, menu: Option<String>) {
        self.current_menu = menu;
    }
}
