//! Turns key transitions into ordered host calls

use crate::debounce::Transition;
use crate::keymap::{KeyAction, Keymap};
use crate::ledger::ModifierLedger;
use crate::transport::{ActivityIndicator, KeyboardTransport};

pub struct Dispatcher<const ROWS: usize, const COLS: usize> {
    keymap: Keymap<ROWS, COLS>,
    ledger: ModifierLedger,
    pressed: u16,
}

impl<const ROWS: usize, const COLS: usize> Dispatcher<ROWS, COLS> {
    pub fn new(keymap: Keymap<ROWS, COLS>) -> Self {
        Dispatcher {
            keymap,
            ledger: ModifierLedger::new(),
            pressed: 0,
        }
    }

    pub fn keymap(&self) -> &Keymap<ROWS, COLS> {
        &self.keymap
    }

    pub fn ledger(&self) -> &ModifierLedger {
        &self.ledger
    }

    /// Keys currently held down
    pub fn pressed_count(&self) -> u16 {
        self.pressed
    }

    /// Modifiers go down before the key they modify and come up after it.
    /// Empty positions are ignored.
    pub fn dispatch<T: KeyboardTransport, I: ActivityIndicator>(
        &mut self,
        transition: Transition,
        transport: &mut T,
        indicator: &mut I,
    ) {
        let (row, col) = transition.position();
        let action = self.keymap.lookup(row, col);

        match (transition.is_press(), action) {
            (_, KeyAction::Empty) => return,

            (true, KeyAction::ModifierOnly(modifiers)) => self.ledger.hold(modifiers, transport),
            (true, KeyAction::Base(code)) => transport.press(code),
            (true, KeyAction::Chord(code, modifiers)) => {
                self.ledger.hold(modifiers, transport);
                transport.press(code);
            }

            (false, KeyAction::ModifierOnly(modifiers)) => {
                self.ledger.unhold(modifiers, transport)
            }
            (false, KeyAction::Base(code)) => transport.release(code),
            (false, KeyAction::Chord(code, modifiers)) => {
                transport.release(code);
                self.ledger.unhold(modifiers, transport);
            }
        }
        debug!("{} {}", transition, action);

        if transition.is_press() {
            self.pressed = self.pressed.saturating_add(1);
            if self.pressed == 1 {
                indicator.set(true);
            }
        } else if self.pressed > 0 {
            self.pressed -= 1;
            if self.pressed == 0 {
                indicator.set(false);
            }
        }
    }

    /// Finishes a full release once every held key went through [`Self::dispatch`]:
    /// drops any modifier reference still around and clears the host.
    pub fn reset<T: KeyboardTransport, I: ActivityIndicator>(
        &mut self,
        transport: &mut T,
        indicator: &mut I,
    ) {
        self.ledger.clear(transport);
        transport.release_all();
        self.pressed = 0;
        indicator.set(false);
    }
}
