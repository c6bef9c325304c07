//! Compile-time configuration

/// Rows on the command-wing PCB
pub const ROWS: usize = 10;
/// Columns on the command-wing PCB
pub const COLS: usize = 14;

/// Time a raw reading must stay unchanged before it is committed
pub const DEBOUNCE_MS: u32 = 5;
/// Minimum time between the starts of two scan cycles
pub const SCAN_INTERVAL_US: u32 = 1_000;
/// Time between selecting a row and reading its columns, to avoid cross-talk
pub const SETTLE_US: u32 = 5;

pub const PROJECT_NAME: &str = "EvoCmdWingKeyboard";
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timing parameters of a scan cycle.
///
/// `Duration` is whatever the caller's clock subtracts to, so this works with
/// plain tick counts as well as `fugit` durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanConfig<Duration> {
    pub debounce: Duration,
    pub settle_us: u32,
    pub scan_interval_us: u32,
}

impl<Duration> ScanConfig<Duration> {
    pub const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            settle_us: SETTLE_US,
            scan_interval_us: SCAN_INTERVAL_US,
        }
    }

    pub const fn with_settle_us(mut self, settle_us: u32) -> Self {
        self.settle_us = settle_us;
        self
    }

    pub const fn with_scan_interval_us(mut self, scan_interval_us: u32) -> Self {
        self.scan_interval_us = scan_interval_us;
        self
    }
}
