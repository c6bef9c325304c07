//! Time based per-key debouncing.
//!
//! Every edge of the raw reading restarts the key's timer; the reading is only
//! committed once it has stayed unchanged for the whole debounce interval, so a
//! key that keeps bouncing never produces an event.

use core::ops::Sub;

/// A committed change of one key, addressed by `(row, col)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Pressed(usize, usize),
    Released(usize, usize),
}

impl Transition {
    pub fn new(row: usize, col: usize, pressed: bool) -> Self {
        if pressed {
            Transition::Pressed(row, col)
        } else {
            Transition::Released(row, col)
        }
    }

    pub fn position(&self) -> (usize, usize) {
        match *self {
            Transition::Pressed(row, col) | Transition::Released(row, col) => (row, col),
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self, Transition::Pressed(..))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell<Instant> {
    /// Latest sample
    pub raw: bool,
    /// Sample the timer was last restarted for
    pub raw_previous: bool,
    /// Last committed state
    pub debounced: bool,
    pub last_change: Instant,
}

impl<Instant> Cell<Instant> {
    const fn new(start: Instant) -> Self {
        Cell {
            raw: false,
            raw_previous: false,
            debounced: false,
            last_change: start,
        }
    }
}

pub struct Debouncer<Instant, Duration, const ROWS: usize, const COLS: usize> {
    cells: [[Cell<Instant>; COLS]; ROWS],
    /// Positions allowed to commit; others are sampled but never change
    enabled: [[bool; COLS]; ROWS],
    interval: Duration,
}

impl<Instant, Duration, const ROWS: usize, const COLS: usize>
    Debouncer<Instant, Duration, ROWS, COLS>
where
    Instant: Copy + Sub<Instant, Output = Duration>,
    Duration: Copy + PartialOrd,
{
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self::with_mask(interval, start, [[true; COLS]; ROWS])
    }

    pub fn with_mask(interval: Duration, start: Instant, enabled: [[bool; COLS]; ROWS]) -> Self {
        Debouncer {
            cells: [[Cell::new(start); COLS]; ROWS],
            enabled,
            interval,
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell<Instant> {
        &self.cells[row][col]
    }

    /// Stores a new sample, to be considered by the next [`Self::debounce`]
    pub fn set_raw(&mut self, row: usize, col: usize, raw: bool) {
        self.cells[row][col].raw = raw;
    }

    /// Restarts timers on raw edges, then commits every key that has been
    /// stable for the interval, reporting each commit through `on_transition`.
    ///
    /// At most one transition per key per call.
    pub fn debounce(&mut self, now: Instant, mut on_transition: impl FnMut(Transition)) {
        for (row, (cells, enabled)) in self.cells.iter_mut().zip(&self.enabled).enumerate() {
            for (col, (cell, enabled)) in cells.iter_mut().zip(enabled).enumerate() {
                if cell.raw != cell.raw_previous {
                    cell.raw_previous = cell.raw;
                    cell.last_change = now;
                }

                if *enabled && cell.debounced != cell.raw && now - cell.last_change >= self.interval
                {
                    cell.debounced = cell.raw;
                    on_transition(Transition::new(row, col, cell.debounced));
                }
            }
        }
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.cells[row][col].debounced
    }

    pub fn pressed_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.debounced)
            .count()
    }

    /// Marks every pressed key released without waiting for the switches,
    /// reporting each through `on_transition`. Raw samples are kept, so a key
    /// still held down commits a press again on the next debounce.
    pub fn release_all(&mut self, mut on_transition: impl FnMut(Transition)) {
        for (row, cells) in self.cells.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                if cell.debounced {
                    cell.debounced = false;
                    on_transition(Transition::Released(row, col));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    const INTERVAL: u32 = 5;

    fn step(debouncer: &mut Debouncer<u32, u32, 1, 1>, raw: bool, now: u32) -> Vec<Transition> {
        let mut events = Vec::new();
        debouncer.set_raw(0, 0, raw);
        debouncer.debounce(now, |event| events.push(event));
        events
    }

    #[test]
    fn press_commits_after_interval() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);

        assert!(step(&mut debouncer, true, 10).is_empty());
        assert!(step(&mut debouncer, true, 12).is_empty());
        assert!(step(&mut debouncer, true, 14).is_empty());
        assert_eq!(step(&mut debouncer, true, 15), [Transition::Pressed(0, 0)]);
        assert!(debouncer.is_pressed(0, 0));
        assert!(step(&mut debouncer, true, 16).is_empty());
        assert!(step(&mut debouncer, true, 100).is_empty());
    }

    #[test]
    fn release_commits_after_interval() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);
        step(&mut debouncer, true, 0);
        assert_eq!(step(&mut debouncer, true, 5), [Transition::Pressed(0, 0)]);

        assert!(step(&mut debouncer, false, 20).is_empty());
        assert!(step(&mut debouncer, false, 24).is_empty());
        assert_eq!(step(&mut debouncer, false, 25), [Transition::Released(0, 0)]);
        assert!(!debouncer.is_pressed(0, 0));
    }

    #[test]
    fn chatter_never_commits() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);
        for now in 1..200 {
            assert!(step(&mut debouncer, now % 4 < 2, now).is_empty());
        }
        assert!(!debouncer.is_pressed(0, 0));
    }

    #[test]
    fn bounce_restarts_window() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);
        step(&mut debouncer, true, 10);
        step(&mut debouncer, false, 13);
        step(&mut debouncer, true, 14);
        // 5 ticks after the first edge, but only 1 after the last
        assert!(step(&mut debouncer, true, 15).is_empty());
        assert!(step(&mut debouncer, true, 18).is_empty());
        assert_eq!(step(&mut debouncer, true, 19), [Transition::Pressed(0, 0)]);
    }

    #[test]
    fn glitch_back_to_committed_state_is_silent() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);
        step(&mut debouncer, true, 1);
        step(&mut debouncer, false, 2);
        for now in 3..50 {
            assert!(step(&mut debouncer, false, now).is_empty());
        }
    }

    #[test]
    fn keys_have_independent_timers() {
        let mut debouncer = Debouncer::<u32, u32, 1, 2>::new(INTERVAL, 0);
        let mut events = Vec::new();

        debouncer.set_raw(0, 0, true);
        debouncer.debounce(10, |event| events.push(event));
        debouncer.set_raw(0, 1, true);
        debouncer.debounce(12, |event| events.push(event));
        debouncer.debounce(15, |event| events.push(event));
        assert_eq!(events, [Transition::Pressed(0, 0)]);

        debouncer.debounce(17, |event| events.push(event));
        assert_eq!(events, [Transition::Pressed(0, 0), Transition::Pressed(0, 1)]);
        assert_eq!(debouncer.pressed_count(), 2);
    }

    #[test]
    fn simultaneous_commits_in_row_major_order() {
        let mut debouncer = Debouncer::<u32, u32, 2, 2>::new(INTERVAL, 0);
        let mut events = Vec::new();
        debouncer.set_raw(1, 0, true);
        debouncer.set_raw(0, 1, true);
        debouncer.debounce(0, |event| events.push(event));
        debouncer.debounce(5, |event| events.push(event));
        assert_eq!(events, [Transition::Pressed(0, 1), Transition::Pressed(1, 0)]);
    }

    #[test]
    fn masked_keys_never_commit() {
        let mut debouncer =
            Debouncer::<u32, u32, 1, 2>::with_mask(INTERVAL, 0, [[true, false]]);
        let mut events = Vec::new();
        debouncer.set_raw(0, 0, true);
        debouncer.set_raw(0, 1, true);
        debouncer.debounce(0, |event| events.push(event));
        debouncer.debounce(50, |event| events.push(event));
        assert_eq!(events, [Transition::Pressed(0, 0)]);
        assert!(!debouncer.is_pressed(0, 1));
        assert!(debouncer.cell(0, 1).raw);
    }

    #[test]
    fn release_all_reports_pressed_keys() {
        let mut debouncer = Debouncer::<u32, u32, 2, 2>::new(INTERVAL, 0);
        debouncer.set_raw(0, 0, true);
        debouncer.set_raw(1, 1, true);
        debouncer.debounce(0, |_| ());
        debouncer.debounce(5, |_| ());
        assert_eq!(debouncer.pressed_count(), 2);

        let mut events = Vec::new();
        debouncer.release_all(|event| events.push(event));
        assert_eq!(events, [Transition::Released(0, 0), Transition::Released(1, 1)]);
        assert_eq!(debouncer.pressed_count(), 0);

        events.clear();
        debouncer.release_all(|event| events.push(event));
        assert!(events.is_empty());
    }

    #[test]
    fn held_key_presses_again_after_release_all() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);
        step(&mut debouncer, true, 0);
        step(&mut debouncer, true, 5);
        debouncer.release_all(|_| ());
        assert!(debouncer.cell(0, 0).raw);

        assert_eq!(step(&mut debouncer, true, 100), [Transition::Pressed(0, 0)]);
        assert!(step(&mut debouncer, true, 101).is_empty());
    }

    #[test]
    fn key_let_go_during_release_all_stays_released() {
        let mut debouncer = Debouncer::<u32, u32, 1, 1>::new(INTERVAL, 0);
        step(&mut debouncer, true, 0);
        step(&mut debouncer, true, 5);
        debouncer.release_all(|_| ());

        for now in 6..50 {
            assert!(step(&mut debouncer, false, now).is_empty());
        }
        assert!(!debouncer.is_pressed(0, 0));
    }

    #[test]
    fn transition_accessors() {
        let press = Transition::new(3, 4, true);
        assert_eq!(press, Transition::Pressed(3, 4));
        assert!(press.is_press());
        assert_eq!(press.position(), (3, 4));
        assert!(!Transition::new(3, 4, false).is_press());
    }
}
