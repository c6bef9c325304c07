//! Reference counts for modifiers shared between keys
//!
//! Several held keys can need the same modifier; it is only asserted on the
//! host when the first of them goes down and deasserted when the last of them
//! comes up.

use crate::keymap::{Modifier, ModifierSet};
use crate::transport::KeyboardTransport;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModifierLedger {
    counts: [u16; Modifier::ALL.len()],
}

impl ModifierLedger {
    pub const fn new() -> Self {
        Self {
            counts: [0; Modifier::ALL.len()],
        }
    }

    /// Number of held keys needing `modifier`
    pub fn count(&self, modifier: Modifier) -> u16 {
        self.counts[modifier as usize]
    }

    pub fn is_held(&self, modifier: Modifier) -> bool {
        self.count(modifier) > 0
    }

    /// Takes a reference on each modifier in `modifiers`, asserting those that
    /// were not held yet
    pub fn hold<T: KeyboardTransport>(&mut self, modifiers: ModifierSet, transport: &mut T) {
        for modifier in modifiers.iter() {
            let count = &mut self.counts[modifier as usize];
            *count = count.saturating_add(1);
            if *count == 1 {
                trace!("assert {}", modifier);
                transport.press(modifier.keycode());
            }
        }
    }

    /// Drops a reference on each modifier in `modifiers`, deasserting those no
    /// longer needed. Dropping an unheld modifier does nothing.
    pub fn unhold<T: KeyboardTransport>(&mut self, modifiers: ModifierSet, transport: &mut T) {
        for modifier in modifiers.iter() {
            let count = &mut self.counts[modifier as usize];
            match *count {
                0 => warn!("{} released more often than held", modifier),
                1 => {
                    *count = 0;
                    trace!("deassert {}", modifier);
                    transport.release(modifier.keycode());
                }
                _ => *count -= 1,
            }
        }
    }

    /// Forgets every reference, deasserting any modifier still held
    pub fn clear<T: KeyboardTransport>(&mut self, transport: &mut T) {
        for modifier in Modifier::ALL {
            if self.is_held(modifier) {
                transport.release(modifier.keycode());
            }
            self.counts[modifier as usize] = 0;
        }
    }
}
