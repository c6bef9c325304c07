#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

mod timer;
use timer::{now, Duration, Instant};

use rp_pico as bsp;

use bsp::entry;
use bsp::{hal, hal::pac};
use hal::gpio::{DynPinId, FunctionSioInput, FunctionSioOutput, Pin as GpioPin, PullNone, PullUp};
use hal::Clock;

use embedded_hal::digital::v2::InputPin;

use hal::usb::UsbBus as Rp2040Usb;
use usb_device::class_prelude::*;
use usb_device::prelude::*;
use usbd_human_interface_device::device::keyboard::{NKROBootKeyboard, NKROBootKeyboardConfig};
use usbd_human_interface_device::prelude::*;
use usbd_serial::SerialPort;

use heapless::{String, Vec};

use cmd_wing::command::{Command, CommandReader};
use cmd_wing::config::{ScanConfig, COLS, DEBOUNCE_MS, ROWS, SCAN_INTERVAL_US};
use cmd_wing::keymap::CMD_WING;
use cmd_wing::matrix::PinMatrix;
use cmd_wing::transport::{KeySet, PinIndicator};
use cmd_wing::Controller;

type KeyboardDev<'a> = frunk::HCons<NKROBootKeyboard<'a, Rp2040Usb>, frunk::HNil>;

defmt::timestamp!("{=u64:us}", now().ticks());

const ROLLOVER: usize = 36;
const COMMAND_LINE: usize = 32;
/// Time given to the host to see the keys released before rebooting
const REBOOT_GRACE_MS: u64 = 50;
/// Longest a reboot waits for the host to read pending serial output
const REBOOT_TIMEOUT_MS: u64 = 500;

#[entry]
fn main() -> ! {
    let core = pac::CorePeripherals::take().unwrap();
    let mut pac = pac::Peripherals::take().unwrap();
    let sio = hal::Sio::new(pac.SIO);

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::watchdog::Watchdog::new(pac.WATCHDOG);
    // Configure the clocks
    let clocks = hal::clocks::init_clocks_and_plls(
        bsp::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();
    let sys_clk = clocks.system_clock.freq();

    // Takes the timer out of reset, read through `timer::now` from here on
    let _timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let mut delay = cortex_m::delay::Delay::new(core.SYST, sys_clk.to_Hz());

    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let usb_conn = pins.vbus_detect.into_floating_input();
    defmt::info!("USB input: {}", usb_conn.is_high().unwrap_or(false));

    let mut rows = Vec::<GpioPin<DynPinId, FunctionSioOutput, PullNone>, ROWS>::new();
    rows.extend([
        pins.gpio0.reconfigure().into_dyn_pin(),
        pins.gpio1.reconfigure().into_dyn_pin(),
        pins.gpio2.reconfigure().into_dyn_pin(),
        pins.gpio3.reconfigure().into_dyn_pin(),
        pins.gpio4.reconfigure().into_dyn_pin(),
        pins.gpio5.reconfigure().into_dyn_pin(),
        pins.gpio6.reconfigure().into_dyn_pin(),
        pins.gpio7.reconfigure().into_dyn_pin(),
        pins.gpio8.reconfigure().into_dyn_pin(),
        pins.gpio9.reconfigure().into_dyn_pin(),
    ]);

    let mut cols = Vec::<GpioPin<DynPinId, FunctionSioInput, PullUp>, COLS>::new();
    cols.extend([
        pins.gpio10.reconfigure().into_dyn_pin(),
        pins.gpio11.reconfigure().into_dyn_pin(),
        pins.gpio12.reconfigure().into_dyn_pin(),
        pins.gpio13.reconfigure().into_dyn_pin(),
        pins.gpio14.reconfigure().into_dyn_pin(),
        pins.gpio15.reconfigure().into_dyn_pin(),
        pins.gpio16.reconfigure().into_dyn_pin(),
        pins.gpio17.reconfigure().into_dyn_pin(),
        pins.gpio18.reconfigure().into_dyn_pin(),
        pins.gpio19.reconfigure().into_dyn_pin(),
        pins.gpio20.reconfigure().into_dyn_pin(),
        pins.gpio21.reconfigure().into_dyn_pin(),
        pins.gpio22.reconfigure().into_dyn_pin(),
        pins.gpio26.reconfigure().into_dyn_pin(),
    ]);

    // Rows are driven low to select them, columns read low through the switch
    let mut matrix = PinMatrix::new(rows, cols, false).unwrap();
    let mut led = PinIndicator(pins.led.into_push_pull_output());

    // USB
    let usb_alloc = UsbBusAllocator::new(hal::usb::UsbBus::new(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        true,
        &mut pac.RESETS,
    ));

    let mut keyboard: UsbHidClass<'_, Rp2040Usb, KeyboardDev<'_>> = UsbHidClassBuilder::new()
        .add_device(NKROBootKeyboardConfig::default())
        .build(&usb_alloc);

    let mut usb_serial = SerialPort::new(&usb_alloc);

    // https://pid.codes
    let mut usb_device = UsbDeviceBuilder::new(&usb_alloc, UsbVidPid(0x1209, 0x0001))
        .manufacturer("usbd-human-interface-device")
        .product(cmd_wing::config::PROJECT_NAME)
        .serial_number("CMDWING")
        .build();

    // Scans are paced by the loop below so that USB keeps being polled
    let config = ScanConfig::new(Duration::millis(DEBOUNCE_MS as u64)).with_scan_interval_us(0);
    let mut controller = Controller::new(CMD_WING, config, now());
    let mut keys = KeySet::<ROLLOVER>::new();
    let mut commands = CommandReader::<COMMAND_LINE>::new();
    let mut reboot: Option<(Command<COMMAND_LINE>, Instant)> = None;
    let mut serial_out = Vec::<u8, 128>::new();

    let scan_interval = Duration::micros(SCAN_INTERVAL_US as u64);
    let report_interval = Duration::millis(1);
    let mut last_scan = now();
    let mut last_report = now();

    defmt::info!(
        "{=str} v{=str} ready",
        cmd_wing::config::PROJECT_NAME,
        cmd_wing::config::PROJECT_VERSION
    );

    loop {
        let time = now();

        if usb_device.poll(&mut [&mut keyboard, &mut usb_serial]) {
            match keyboard.device().read_report() {
                Err(UsbError::WouldBlock) => {}
                Err(e) => defmt::warn!("Failed to read keyboard report: {:?}", e),
                Ok(_leds) => {}
            }

            let mut buf = [0u8; 64];
            match usb_serial.read(&mut buf) {
                Ok(0) => {}
                Err(_) => {}
                Ok(count) => commands.extend(&buf[..count], |command| match command {
                    Ok(command) => {
                        defmt::info!("host command {}", command);
                        let mut reply: String<96> = String::new();
                        let queued = command.reply(&mut reply).is_ok()
                            && serial_out.extend_from_slice(reply.as_bytes()).is_ok()
                            && serial_out.extend_from_slice(b"\r\n").is_ok();
                        if !queued {
                            defmt::warn!("serial: reply to {} dropped", command);
                        }
                        if command.requires_release() && reboot.is_none() {
                            controller.release_all(&mut keys, &mut led);
                            reboot = Some((command, time + Duration::millis(REBOOT_GRACE_MS)));
                        }
                    }
                    Err(e) => defmt::warn!("serial: {}", e),
                }),
            }
        }

        if !serial_out.is_empty() {
            match usb_serial.write(&serial_out) {
                Ok(count) => {
                    let rest = serial_out.len() - count;
                    serial_out.copy_within(count.., 0);
                    serial_out.truncate(rest);
                }
                Err(UsbError::WouldBlock) => {}
                Err(e) => {
                    defmt::warn!("serial: {} reply bytes lost: {:?}", serial_out.len(), e);
                    serial_out.clear();
                }
            }
            match usb_serial.flush() {
                Ok(()) | Err(UsbError::WouldBlock) => {}
                Err(e) => defmt::warn!("serial: flush failed: {:?}", e),
            }
        }

        // No scanning once a reboot is pending, released keys must stay released
        if reboot.is_none() && time - last_scan >= scan_interval {
            last_scan = time;
            if let Err(e) = controller.scan_cycle(&mut matrix, &mut delay, time, &mut keys, &mut led)
            {
                match e {}
            }
        }

        if time - last_report >= report_interval {
            last_report = time;

            match keyboard.device().write_report(keys.keys().iter().copied()) {
                Err(UsbHidError::WouldBlock) => {}
                Err(UsbHidError::Duplicate) => {}
                Ok(_) => {}
                Err(e) => {
                    core::panic!("Failed to write keyboard report: {:?}", e)
                }
            }

            match keyboard.tick() {
                Err(UsbHidError::WouldBlock) => {}
                Ok(_) => {}
                Err(e) => {
                    core::panic!("Failed to process keyboard tick: {:?}", e)
                }
            }
        }

        if let Some((command, at)) = &reboot {
            let flushed = serial_out.is_empty();
            if (flushed && time >= *at)
                || time >= *at + Duration::millis(REBOOT_TIMEOUT_MS - REBOOT_GRACE_MS)
            {
                match command {
                    Command::RebootBootloader => {
                        defmt::info!("entering bootloader");
                        hal::rom_data::reset_to_usb_boot(1 << 25, 0);
                    }
                    _ => {
                        defmt::info!("rebooting");
                        cortex_m::peripheral::SCB::sys_reset();
                    }
                }
            }
        }
    }
}
