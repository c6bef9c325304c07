//! Associates matrix positions to key actions

// Export as pub so that it can be used from macro
#[doc(hidden)]
pub use paste::paste;
pub use usbd_human_interface_device::page::Keyboard;

use crate::config;

/// Modifiers a key action can hold on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [Modifier::Ctrl, Modifier::Alt, Modifier::Shift];

    /// HID usage sent to the transport when this modifier is asserted
    pub const fn keycode(self) -> Keyboard {
        match self {
            Modifier::Ctrl => Keyboard::LeftControl,
            Modifier::Alt => Keyboard::LeftAlt,
            Modifier::Shift => Keyboard::LeftShift,
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of modifiers, one bit per [`Modifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub const EMPTY: Self = Self(0);
    pub const CTRL: Self = Self::EMPTY.with(Modifier::Ctrl);
    pub const ALT: Self = Self::EMPTY.with(Modifier::Alt);
    pub const SHIFT: Self = Self::EMPTY.with(Modifier::Shift);

    pub const fn with(self, modifier: Modifier) -> Self {
        Self(self.0 | modifier.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl From<Modifier> for ModifierSet {
    fn from(modifier: Modifier) -> Self {
        Self::EMPTY.with(modifier)
    }
}

/// What a single matrix position does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
    /// No switch at this position
    #[default]
    Empty,
    /// A plain key
    Base(Keyboard),
    /// A key sent while the modifiers are held; the set is never empty
    Chord(Keyboard, ModifierSet),
    /// A physical modifier key; the set is never empty
    ModifierOnly(ModifierSet),
}

impl KeyAction {
    /// `Chord` when `modifiers` is non-empty, `Base` otherwise
    pub const fn chord(code: Keyboard, modifiers: ModifierSet) -> Self {
        if modifiers.is_empty() {
            KeyAction::Base(code)
        } else {
            KeyAction::Chord(code, modifiers)
        }
    }

    /// `ModifierOnly` when `modifiers` is non-empty, `Empty` otherwise
    pub const fn modifiers(modifiers: ModifierSet) -> Self {
        if modifiers.is_empty() {
            KeyAction::Empty
        } else {
            KeyAction::ModifierOnly(modifiers)
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, KeyAction::Empty)
    }

    /// The non-modifier usage, if any
    pub const fn code(&self) -> Option<Keyboard> {
        match self {
            KeyAction::Base(code) | KeyAction::Chord(code, _) => Some(*code),
            KeyAction::Empty | KeyAction::ModifierOnly(_) => None,
        }
    }

    /// Modifiers held while this key is down
    pub const fn modifier_set(&self) -> ModifierSet {
        match self {
            KeyAction::Chord(_, modifiers) | KeyAction::ModifierOnly(modifiers) => *modifiers,
            KeyAction::Empty | KeyAction::Base(_) => ModifierSet::EMPTY,
        }
    }
}

/// Fixed table of key actions, indexed `[row][col]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap<const ROWS: usize, const COLS: usize> {
    map: [[KeyAction; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> Keymap<ROWS, COLS> {
    pub const fn new(map: [[KeyAction; COLS]; ROWS]) -> Self {
        Self { map }
    }

    /// Positions outside the matrix resolve to [`KeyAction::Empty`]
    pub fn lookup(&self, row: usize, col: usize) -> KeyAction {
        self.map
            .get(row)
            .and_then(|cols| cols.get(col))
            .copied()
            .unwrap_or(KeyAction::Empty)
    }

    pub fn populated(&self, row: usize, col: usize) -> bool {
        !self.lookup(row, col).is_empty()
    }

    /// Which positions have a switch at all
    pub fn populated_mask(&self) -> [[bool; COLS]; ROWS] {
        core::array::from_fn(|row| core::array::from_fn(|col| self.populated(row, col)))
    }
}

/// Builds a [`Keymap`] from rows of shorthand keys, see [`make_action`]
#[macro_export]
macro_rules! make_keymap {
    ( $( [ $( $t:tt ),* $(,)? ] ),* $(,)? ) => {
        $crate::keymap::Keymap::new([ $( [ $( $crate::keymap::make_action!($t) ),* ] ),* ])
    };
}

/// `_` is an empty position, `(C x)`, `(A x)`, `(S x)` and `(CA x)` chord `x` with
/// Ctrl, Alt, Shift or Ctrl+Alt, `(M Shift ..)` is a pure modifier, anything else
/// is a plain key as understood by [`make_key`].
#[rustfmt::skip]
#[macro_export]
macro_rules! make_action {
    (_) => { $crate::keymap::KeyAction::Empty };
    ((C $k:tt)) => {
        $crate::keymap::KeyAction::chord($crate::keymap::make_key!($k), $crate::keymap::ModifierSet::CTRL)
    };
    ((A $k:tt)) => {
        $crate::keymap::KeyAction::chord($crate::keymap::make_key!($k), $crate::keymap::ModifierSet::ALT)
    };
    ((S $k:tt)) => {
        $crate::keymap::KeyAction::chord($crate::keymap::make_key!($k), $crate::keymap::ModifierSet::SHIFT)
    };
    ((CA $k:tt)) => {
        $crate::keymap::KeyAction::chord(
            $crate::keymap::make_key!($k),
            $crate::keymap::ModifierSet::CTRL.union($crate::keymap::ModifierSet::ALT),
        )
    };
    ((M $( $m:ident )+)) => {
        $crate::keymap::KeyAction::modifiers(
            $crate::keymap::ModifierSet::EMPTY $( .with($crate::keymap::Modifier::$m) )+
        )
    };
    ($k:tt) => { $crate::keymap::KeyAction::Base($crate::keymap::make_key!($k)) };
}

#[rustfmt::skip]
#[macro_export]
macro_rules! make_key {
    // Shorthands
    (Esc) => { $crate::keymap::Keyboard::Escape };
    (Ent) => { $crate::keymap::Keyboard::ReturnEnter };
    (Bsp) => { $crate::keymap::Keyboard::DeleteBackspace };
    (Del) => { $crate::keymap::Keyboard::DeleteForward };
    (Ins) => { $crate::keymap::Keyboard::Insert };
    (PgUp) => { $crate::keymap::Keyboard::PageUp };
    (PgDn) => { $crate::keymap::Keyboard::PageDown };
    (LBr) => { $crate::keymap::Keyboard::LeftBrace };
    (RBr) => { $crate::keymap::Keyboard::RightBrace };
    (Eql) => { $crate::keymap::Keyboard::Equal };
    (Min) => { $crate::keymap::Keyboard::Minus };
    (Scol) => { $crate::keymap::Keyboard::Semicolon };
    (Quot) => { $crate::keymap::Keyboard::Apostrophe };
    (Slash) => { $crate::keymap::Keyboard::ForwardSlash };
    (KPAdd) => { $crate::keymap::Keyboard::KeypadAdd };
    (KPMul) => { $crate::keymap::Keyboard::KeypadMultiply };

    // Have numbers translate to number keys
    ($n:literal) => {
        $crate::keymap::paste! { $crate::keymap::Keyboard::[<Keyboard $n>] }
    };

    // Fallback
    ($i:ident) => { $crate::keymap::Keyboard::$i };
}

// Export the macros
pub use make_action;
pub use make_key;
pub use make_keymap;

/// The command-wing layout: Alt and Ctrl chords for editor shortcuts on the left,
/// function and navigation keys top right, a number pad bottom right.
// For alignment with `vi]:EasyAlign <C-r>4<CR>*,
#[rustfmt::skip]
pub const CMD_WING: Keymap<{ config::ROWS }, { config::COLS }> = make_keymap![
    [(A P),    (A N),  (A H),    (C O),     (C U), _,     _,     _,    _,     _,     _,     _,     _,       _],
    [(A F),    (A U),  (A G),    (C M),     (C C), F1,    F2,    F3,   F4,    _,     F5,    F6,    F7,      F8],
    [(A F),    (A D),  (A B),    (C D),     (C L), Ins,   Home,  PgUp, F12,   _,     Del,   End,   PgDn,    KPAdd],
    [_,        _,      (A W),    (C S),     (C H), _,     _,     _,    _,     _,     _,     _,     _,       _],
    [_,        _,      (A V),    (C E),     (C Z), (A R), (A K), (A Z), _,    (A J), _,     (A L), (A Dot), (A Comma)],
    [_,        _,      (A LBr),  (C F),     (C N), (C G), _,     7,    8,     9,     (A Eql), _,   (A O),   _],
    [_,        _,      (A RBr),  (C P),     (C Q), (C W), _,     4,    5,     6,     (A T), _,     _,       _],
    [_,        KPMul,  _,        _,         _,     _,     _,     1,    2,     3,     Min,   _,     _,       _],
    [_,        RBr,    (A Quot), (C X),     (C A), (C J), _,     0,    Dot,   (A 8), (A 2), _,     Esc,     _],
    [_,        LBr,    (A Scol), (C B),     _,     (A S), _,     (M Shift), (C Slash), _, Ent, _,  (A Bsp), (A Y)],
];
