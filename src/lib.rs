//! Keyboard matrix firmware core: scans and debounces a switch matrix, maps
//! positions to keys, chords and modifiers, and sends ordered key-down and
//! key-up calls to the host with modifiers reference counted between keys.
#![no_std]

#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod dispatch;
pub mod keymap;
pub mod ledger;
pub mod matrix;
pub mod transport;

#[cfg(test)]
mod testing;

pub use controller::Controller;
pub use keymap::{KeyAction, Keyboard, Keymap, Modifier, ModifierSet};
