//! Microsecond clock from the RP2040 timer peripheral
use rp2040_hal::fugit;
use rp2040_hal::pac;

pub type Instant = fugit::Instant<u64, 1, 1_000_000>;
pub type Duration = fugit::Duration<u64, 1, 1_000_000>;

/// Reads the free-running 64-bit counter. The timer has to be out of reset,
/// see [`rp2040_hal::Timer::new`].
pub fn now() -> Instant {
    let timer = unsafe { &*pac::TIMER::ptr() };
    Instant::from_ticks(loop {
        let e = timer.timerawh.read().bits();
        let t = timer.timerawl.read().bits();
        let e2 = timer.timerawh.read().bits();
        // High word rolled over between the reads
        if e == e2 {
            break ((e as u64) << 32) | (t as u64);
        }
    })
}
