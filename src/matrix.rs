//! Scans a keyboard matrix

use core::ops::Sub;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use heapless::Vec;

use crate::config::ScanConfig;
use crate::debounce::{Cell, Debouncer, Transition};

/// Row and column access of a switch matrix
pub trait MatrixDriver {
    type Error;

    /// Drives `row` active and every other row inactive
    fn select_row(&mut self, row: usize) -> Result<(), Self::Error>;
    /// Leaves the matrix idle, no row driven
    fn deselect_all_rows(&mut self) -> Result<(), Self::Error>;
    /// Whether the switch between the selected row and `col` is closed
    fn read_column(&mut self, col: usize) -> Result<bool, Self::Error>;
}

/// Matrix wired to GPIO pins, rows as outputs and columns as inputs.
///
/// With `active_high == false` (diodes from column to row) the selected row is
/// driven low and a closed switch pulls its pulled-up column low.
pub struct PinMatrix<InputPinT, OutputPinT, const ROWS: usize, const COLS: usize> {
    rows: Vec<OutputPinT, ROWS>,
    cols: Vec<InputPinT, COLS>,
    active_high: bool,
}

impl<E, InputPinT, OutputPinT, const ROWS: usize, const COLS: usize>
    PinMatrix<InputPinT, OutputPinT, ROWS, COLS>
where
    InputPinT: InputPin<Error = E>,
    OutputPinT: OutputPin<Error = E>,
{
    /// Takes the pins and leaves every row deselected
    pub fn new(
        rows: Vec<OutputPinT, ROWS>,
        cols: Vec<InputPinT, COLS>,
        active_high: bool,
    ) -> Result<Self, E> {
        let mut matrix = PinMatrix {
            rows,
            cols,
            active_high,
        };
        matrix.deselect_all_rows()?;
        Ok(matrix)
    }
}

impl<E, InputPinT, OutputPinT, const ROWS: usize, const COLS: usize> MatrixDriver
    for PinMatrix<InputPinT, OutputPinT, ROWS, COLS>
where
    InputPinT: InputPin<Error = E>,
    OutputPinT: OutputPin<Error = E>,
{
    type Error = E;

    fn select_row(&mut self, row: usize) -> Result<(), E> {
        for (r, output) in self.rows.iter_mut().enumerate() {
            if r != row {
                output.set_state((!self.active_high).into())?;
            }
        }
        if let Some(output) = self.rows.get_mut(row) {
            output.set_state(self.active_high.into())?;
        }
        Ok(())
    }

    fn deselect_all_rows(&mut self) -> Result<(), E> {
        for output in self.rows.iter_mut() {
            output.set_state((!self.active_high).into())?;
        }
        Ok(())
    }

    fn read_column(&mut self, col: usize) -> Result<bool, E> {
        match self.cols.get(col) {
            Some(input) => Ok(input.is_high()? == self.active_high),
            None => Ok(false),
        }
    }
}

/// Raw and debounced state of every key, advanced one scan at a time
pub struct Matrix<Instant, Duration, const ROWS: usize, const COLS: usize> {
    debouncer: Debouncer<Instant, Duration, ROWS, COLS>,
    settle_us: u32,
    scan_interval_us: u32,
}

impl<Instant, Duration, const ROWS: usize, const COLS: usize> Matrix<Instant, Duration, ROWS, COLS>
where
    Instant: Copy + Sub<Instant, Output = Duration>,
    Duration: Copy + PartialOrd,
{
    /// Only positions set in `populated` ever report transitions
    pub fn new(config: ScanConfig<Duration>, populated: [[bool; COLS]; ROWS], start: Instant) -> Self {
        Matrix {
            debouncer: Debouncer::with_mask(config.debounce, start, populated),
            settle_us: config.settle_us,
            scan_interval_us: config.scan_interval_us,
        }
    }

    /// Samples every row, debounces against `now`, reports committed changes
    /// through `on_transition` and finally waits out the scan interval.
    ///
    /// The matrix is left idle even when the driver fails.
    pub fn scan_cycle<D: MatrixDriver, Delay: DelayUs<u32>>(
        &mut self,
        driver: &mut D,
        delay: &mut Delay,
        now: Instant,
        on_transition: impl FnMut(Transition),
    ) -> Result<(), D::Error> {
        let sampled = self.sample(driver, delay);
        let idle = driver.deselect_all_rows();
        sampled?;
        idle?;

        self.debouncer.debounce(now, on_transition);

        if self.scan_interval_us > 0 {
            delay.delay_us(self.scan_interval_us);
        }
        Ok(())
    }

    fn sample<D: MatrixDriver, Delay: DelayUs<u32>>(
        &mut self,
        driver: &mut D,
        delay: &mut Delay,
    ) -> Result<(), D::Error> {
        for row in 0..ROWS {
            driver.select_row(row)?;
            if self.settle_us > 0 {
                delay.delay_us(self.settle_us);
            }
            for col in 0..COLS {
                let raw = driver.read_column(col)?;
                self.debouncer.set_raw(row, col, raw);
            }
        }
        Ok(())
    }

    pub fn is_pressed(&self, row: usize, col: usize) -> bool {
        self.debouncer.is_pressed(row, col)
    }

    pub fn pressed_count(&self) -> usize {
        self.debouncer.pressed_count()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell<Instant> {
        self.debouncer.cell(row, col)
    }

    /// See [`Debouncer::release_all`]
    pub fn release_all(&mut self, on_transition: impl FnMut(Transition)) {
        self.debouncer.release_all(on_transition)
    }
}
