//! Owns the whole keyboard state and runs it one scan at a time

use core::ops::Sub;

use embedded_hal::blocking::delay::DelayUs;

use crate::config::ScanConfig;
use crate::dispatch::Dispatcher;
use crate::keymap::Keymap;
use crate::ledger::ModifierLedger;
use crate::matrix::{Matrix, MatrixDriver};
use crate::transport::{ActivityIndicator, KeyboardTransport};

pub struct Controller<Instant, Duration, const ROWS: usize, const COLS: usize> {
    matrix: Matrix<Instant, Duration, ROWS, COLS>,
    dispatcher: Dispatcher<ROWS, COLS>,
}

impl<Instant, Duration, const ROWS: usize, const COLS: usize>
    Controller<Instant, Duration, ROWS, COLS>
where
    Instant: Copy + Sub<Instant, Output = Duration>,
    Duration: Copy + PartialOrd,
{
    pub fn new(keymap: Keymap<ROWS, COLS>, config: ScanConfig<Duration>, start: Instant) -> Self {
        Controller {
            matrix: Matrix::new(config, keymap.populated_mask(), start),
            dispatcher: Dispatcher::new(keymap),
        }
    }

    /// Scans the matrix once and sends every committed change to `transport`
    pub fn scan_cycle<D, Delay, T, I>(
        &mut self,
        driver: &mut D,
        delay: &mut Delay,
        now: Instant,
        transport: &mut T,
        indicator: &mut I,
    ) -> Result<(), D::Error>
    where
        D: MatrixDriver,
        Delay: DelayUs<u32>,
        T: KeyboardTransport,
        I: ActivityIndicator,
    {
        let dispatcher = &mut self.dispatcher;
        self.matrix.scan_cycle(driver, delay, now, |transition| {
            dispatcher.dispatch(transition, transport, indicator)
        })
    }

    /// Releases every held key and modifier, e.g. before a reboot.
    ///
    /// Held keys go through the normal release path first so all counts stay
    /// consistent, then the host is cleared unconditionally.
    pub fn release_all<T: KeyboardTransport, I: ActivityIndicator>(
        &mut self,
        transport: &mut T,
        indicator: &mut I,
    ) {
        info!("releasing all keys");
        let dispatcher = &mut self.dispatcher;
        self.matrix
            .release_all(|transition| dispatcher.dispatch(transition, transport, indicator));
        self.dispatcher.reset(transport, indicator);
    }

    pub fn keymap(&self) -> &Keymap<ROWS, COLS> {
        self.dispatcher.keymap()
    }

    pub fn ledger(&self) -> &ModifierLedger {
        self.dispatcher.ledger()
    }

    pub fn pressed_count(&self) -> u16 {
        self.dispatcher.pressed_count()
    }

    pub fn matrix(&self) -> &Matrix<Instant, Duration, ROWS, COLS> {
        &self.matrix
    }
}
