//! Where key presses go: the host transport and the activity indicator

use embedded_hal::digital::v2::OutputPin;
use heapless::Vec;

use crate::keymap::Keyboard;

/// Sink for key-down and key-up calls, e.g. a USB HID keyboard
pub trait KeyboardTransport {
    fn press(&mut self, key: Keyboard);
    fn release(&mut self, key: Keyboard);
    fn release_all(&mut self);
}

impl<T: KeyboardTransport + ?Sized> KeyboardTransport for &mut T {
    fn press(&mut self, key: Keyboard) {
        (**self).press(key)
    }

    fn release(&mut self, key: Keyboard) {
        (**self).release(key)
    }

    fn release_all(&mut self) {
        (**self).release_all()
    }
}

/// Shows whether any key is held
pub trait ActivityIndicator {
    fn set(&mut self, active: bool);
}

/// No indicator fitted
impl ActivityIndicator for () {
    fn set(&mut self, _active: bool) {}
}

/// Indicator driven by an output pin (typically an LED), high when active.
///
/// Pin errors are ignored, the indicator is cosmetic.
pub struct PinIndicator<P>(pub P);

impl<P: OutputPin> ActivityIndicator for PinIndicator<P> {
    fn set(&mut self, active: bool) {
        let _ = self.0.set_state(active.into());
    }
}

/// Keeps the set of keys currently held on the host, from which a HID report
/// can be written.
///
/// Holds at most `ROLLOVER` keys, further presses are dropped and latch
/// `overflowed` until everything is released.
#[derive(Debug, Default)]
pub struct KeySet<const ROLLOVER: usize> {
    keys: Vec<Keyboard, ROLLOVER>,
    overflowed: bool,
}

impl<const ROLLOVER: usize> KeySet<ROLLOVER> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            overflowed: false,
        }
    }

    pub fn keys(&self) -> &[Keyboard] {
        &self.keys
    }

    pub fn contains(&self, key: Keyboard) -> bool {
        self.keys.contains(&key)
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

impl<const ROLLOVER: usize> KeyboardTransport for KeySet<ROLLOVER> {
    fn press(&mut self, key: Keyboard) {
        if self.contains(key) {
            return;
        }
        if self.keys.push(key).is_err() {
            warn!("rollover exceeded, dropping {}", key);
            self.overflowed = true;
        }
    }

    fn release(&mut self, key: Keyboard) {
        if let Some(index) = self.keys.iter().position(|held| *held == key) {
            self.keys.remove(index);
        }
        if self.keys.is_empty() {
            self.overflowed = false;
        }
    }

    fn release_all(&mut self) {
        self.keys.clear();
        self.overflowed = false;
    }
}
