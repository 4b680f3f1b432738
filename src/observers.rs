use crate::battle::state::BattleEvent;
use crate::pokemon::PokemonInst;
use std::cell::RefCell;
use std::rc::Rc;

/// Listener for health changes on a `PokemonInst`.
///
/// Called once per mutating health call with the health before and after,
/// even when the two are equal.
pub trait HealthObserver {
    fn on_health_changed(&self, subject: &PokemonInst, old: u32, new: u32);
}

/// Buffers damage and healing narration until the battle controller flushes it.
///
/// Clones share one buffer, so the controller keeps a handle and registers
/// clones on both combatants.
#[derive(Debug, Clone, Default)]
pub struct BattleMessageNotifier {
    buffer: Rc<RefCell<Vec<BattleEvent>>>,
}

impl BattleMessageNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered event, oldest first.
    pub fn drain(&self) -> Vec<BattleEvent> {
        self.buffer.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }
}

impl HealthObserver for BattleMessageNotifier {
    fn on_health_changed(&self, subject: &PokemonInst, old: u32, new: u32) {
        let text = if new < old {
            format!("{} took damage! ({} → {})", subject.name, old, new)
        } else if new > old {
            format!("{} was healed! ({} → {})", subject.name, old, new)
        } else {
            return;
        };
        self.buffer.borrow_mut().push(BattleEvent::narration(text));
    }
}
