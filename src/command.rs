//! Commands sent by the host over the serial port, one per line.
//!
//! These let a flashing script find a specific board among several
//! (`IDENTIFY`) and reboot it without touching the reset button.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::{PROJECT_NAME, PROJECT_VERSION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<const N: usize> {
    Identify,
    RebootBootloader,
    RebootNormal,
    Unknown(String<N>),
}

impl<const N: usize> Command<N> {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "IDENTIFY" => Command::Identify,
            "REBOOT_BOOTLOADER" => Command::RebootBootloader,
            "REBOOT_NORMAL" => Command::RebootNormal,
            other => {
                let mut unknown = String::new();
                // Truncated to capacity
                for c in other.chars() {
                    if unknown.push(c).is_err() {
                        break;
                    }
                }
                Command::Unknown(unknown)
            }
        }
    }

    /// Whether every key must be released before acting on this command
    pub fn requires_release(&self) -> bool {
        matches!(self, Command::RebootBootloader | Command::RebootNormal)
    }

    /// Writes the line sent back to the host, without line terminator
    pub fn reply<W: Write>(&self, out: &mut W) -> fmt::Result {
        match self {
            Command::Identify => write!(out, "[IDENT] {} v{}", PROJECT_NAME, PROJECT_VERSION),
            Command::RebootBootloader => write!(
                out,
                "[REBOOT] {} v{} entering bootloader...",
                PROJECT_NAME, PROJECT_VERSION
            ),
            Command::RebootNormal => write!(
                out,
                "[REBOOT] {} v{} normal reboot requested...",
                PROJECT_NAME, PROJECT_VERSION
            ),
            Command::Unknown(line) => write!(out, "[REBOOT] Unknown command: {}", line),
        }
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for Command<N> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Command::Identify => defmt::write!(f, "IDENTIFY"),
            Command::RebootBootloader => defmt::write!(f, "REBOOT_BOOTLOADER"),
            Command::RebootNormal => defmt::write!(f, "REBOOT_NORMAL"),
            Command::Unknown(line) => defmt::write!(f, "unknown {=str}", line.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The line did not fit the buffer and was dropped
    LineTooLong,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LineTooLong => f.write_str("command line too long"),
        }
    }
}

/// Assembles commands from bytes as they arrive
#[derive(Debug, Default)]
pub struct CommandReader<const N: usize> {
    line: String<N>,
    overflowed: bool,
}

impl<const N: usize> CommandReader<N> {
    pub fn new() -> Self {
        Self {
            line: String::new(),
            overflowed: false,
        }
    }

    /// Takes one byte, returning a command once its line is complete.
    ///
    /// Empty lines are skipped; bytes outside ASCII are dropped.
    pub fn push(&mut self, byte: u8) -> Option<Result<Command<N>, Error>> {
        match byte {
            b'\n' | b'\r' => {
                let overflowed = core::mem::take(&mut self.overflowed);
                let line = core::mem::take(&mut self.line);
                if overflowed {
                    warn!("dropped overlong command line");
                    return Some(Err(Error::LineTooLong));
                }
                if line.trim().is_empty() {
                    return None;
                }
                let command = Command::parse(&line);
                debug!("host command {}", command);
                Some(Ok(command))
            }
            byte if byte.is_ascii() => {
                if !self.overflowed && self.line.push(byte as char).is_err() {
                    self.overflowed = true;
                }
                None
            }
            _ => None,
        }
    }

    /// Feeds a whole chunk, handing every completed command to `on_command`
    pub fn extend(
        &mut self,
        bytes: &[u8],
        mut on_command: impl FnMut(Result<Command<N>, Error>),
    ) {
        for byte in bytes {
            if let Some(command) = self.push(*byte) {
                on_command(command);
            }
        }
    }
}
