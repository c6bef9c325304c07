//! Test doubles for the hardware and host collaborators
extern crate std;

use core::convert::Infallible;
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;
use std::vec::Vec;

use crate::keymap::Keyboard;
use crate::matrix::MatrixDriver;
use crate::transport::{ActivityIndicator, KeyboardTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Press(Keyboard),
    Release(Keyboard),
    ReleaseAll,
}

/// Transport that remembers every call
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
}

impl Recorder {
    pub fn take(&mut self) -> Vec<Call> {
        core::mem::take(&mut self.calls)
    }
}

impl KeyboardTransport for Recorder {
    fn press(&mut self, key: Keyboard) {
        self.calls.push(Call::Press(key));
    }

    fn release(&mut self, key: Keyboard) {
        self.calls.push(Call::Release(key));
    }

    fn release_all(&mut self) {
        self.calls.push(Call::ReleaseAll);
    }
}

/// Indicator that remembers every change
#[derive(Debug, Default)]
pub struct Led {
    pub on: bool,
    pub changes: Vec<bool>,
}

impl ActivityIndicator for Led {
    fn set(&mut self, active: bool) {
        self.on = active;
        self.changes.push(active);
    }
}

#[derive(Debug, Default)]
pub struct FakePin {
    pub high: bool,
}

impl OutputPin for FakePin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

/// Delay that only adds up how long it was asked to wait
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub waited_us: u32,
    pub calls: usize,
}

impl DelayUs<u32> for FakeDelay {
    fn delay_us(&mut self, us: u32) {
        self.waited_us += us;
        self.calls += 1;
    }
}

/// Matrix whose switches are set by the test.
///
/// A column reads pressed only while its row is the single selected one, and
/// the driver keeps track of how many rows were ever driven at once.
#[derive(Debug)]
pub struct FakeMatrix<const ROWS: usize, const COLS: usize> {
    pub switches: [[bool; COLS]; ROWS],
    pub driven: [bool; ROWS],
    pub most_driven: usize,
    pub selections: usize,
    /// Fail reading once this many rows have been selected
    pub fail_after: Option<usize>,
}

impl<const ROWS: usize, const COLS: usize> Default for FakeMatrix<ROWS, COLS> {
    fn default() -> Self {
        Self {
            switches: [[false; COLS]; ROWS],
            driven: [false; ROWS],
            most_driven: 0,
            selections: 0,
            fail_after: None,
        }
    }
}

impl<const ROWS: usize, const COLS: usize> FakeMatrix<ROWS, COLS> {
    pub fn set(&mut self, row: usize, col: usize, pressed: bool) {
        self.switches[row][col] = pressed;
    }

    pub fn any_driven(&self) -> bool {
        self.driven.iter().any(|driven| *driven)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ReadFault;

impl<const ROWS: usize, const COLS: usize> MatrixDriver for FakeMatrix<ROWS, COLS> {
    type Error = ReadFault;

    fn select_row(&mut self, row: usize) -> Result<(), Self::Error> {
        self.driven = [false; ROWS];
        self.driven[row] = true;
        self.selections += 1;
        self.most_driven = self
            .most_driven
            .max(self.driven.iter().filter(|driven| **driven).count());
        Ok(())
    }

    fn deselect_all_rows(&mut self) -> Result<(), Self::Error> {
        self.driven = [false; ROWS];
        Ok(())
    }

    fn read_column(&mut self, col: usize) -> Result<bool, Self::Error> {
        if self.fail_after.map_or(false, |limit| self.selections > limit) {
            return Err(ReadFault);
        }
        let mut driven = self.driven.iter().enumerate().filter(|(_, driven)| **driven);
        Ok(match (driven.next(), driven.next()) {
            (Some((row, _)), None) => self.switches[row][col],
            _ => false,
        })
    }
}
