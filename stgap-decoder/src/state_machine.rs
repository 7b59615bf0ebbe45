//! Per-device command/register state machine
//!
//! Each device in the chain shifts one 16-bit word per chain-select cycle.
//! Register reads and writes are pipelined: a read's response comes back on
//! MISO in the *next* word for that device, and a write's data byte is the
//! *next* MOSI word. Because the bus is full duplex, the response to a read
//! shares its word with the following command.

use crate::bitfield;
use crate::crc::{self, CrcStatus};
use crate::registers::{self, Opcode};
use crate::types::SpiWord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a device expects from its next word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceState {
    /// Idle, next MOSI byte is an opcode
    #[default]
    Command,
    /// A read was issued, next MISO byte is the register value
    ReadPending,
    /// A write was issued, next MOSI byte is the register value
    WritePending,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Command => write!(f, "Command"),
            DeviceState::ReadPending => write!(f, "ReadPending"),
            DeviceState::WritePending => write!(f, "WritePending"),
        }
    }
}

/// Text for one byte plus the status of its companion CRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub crc: CrcStatus,
}

/// Classification of the primary action, used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Command,
    ReadRequest,
    WriteRequest,
    WriteData,
    UnknownCommand,
}

/// Everything produced by one step of a device's state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State for this device in the next cycle
    pub next: DeviceState,
    /// What the MOSI byte meant
    pub action: Action,
    /// Command or write-completion text
    pub primary: Segment,
    /// Read response carried on MISO, when a read was pending
    pub response: Option<Segment>,
    /// True when a read/write addressed a register missing from the table
    pub unknown_register: bool,
}

impl Transition {
    /// Number of CRC mismatches in this step
    pub fn crc_errors(&self) -> usize {
        let response = self.response.as_ref().map_or(false, |r| r.crc.is_error());
        usize::from(self.primary.crc.is_error()) + usize::from(response)
    }
}

/// Advance one device by one word
///
/// `register` and `seed` are the device's pending register address and the
/// raw CRC of its last command byte; both are updated in place.
pub fn step(
    state: DeviceState,
    register: &mut u8,
    seed: &mut u8,
    mosi: SpiWord,
    miso: SpiWord,
    verify_crc: bool,
) -> Transition {
    log::trace!(
        "step state={} register=0x{:02X} mosi={} miso={}",
        state,
        *register,
        mosi,
        miso
    );

    match state {
        DeviceState::Command => decode_command(register, seed, mosi, verify_crc),
        DeviceState::ReadPending => {
            // The response belongs to the register selected by the previous
            // command, so decode it before the new command overwrites it
            let pending = *register;
            let response = read_response(pending, miso, verify_crc);
            let mut transition = decode_command(register, seed, mosi, verify_crc);
            transition.unknown_register |= registers::register(pending).is_none();
            transition.response = Some(response);
            transition
        }
        DeviceState::WritePending => write_completion(*register, *seed, mosi, verify_crc),
    }
}

fn decode_command(
    register: &mut u8,
    seed: &mut u8,
    mosi: SpiWord,
    verify_crc: bool,
) -> Transition {
    let command = mosi.byte;
    let command_crc = crc::command_crc(command);
    *seed = command_crc.seed;
    let status = verify(mosi.crc, command_crc.expected, verify_crc);

    let (next, action, text, unknown_register) = match Opcode::classify(command) {
        Opcode::Command(name) => (DeviceState::Command, Action::Command, name.to_string(), false),
        Opcode::ReadRegister(address) => {
            *register = address;
            (
                DeviceState::ReadPending,
                Action::ReadRequest,
                format!("Read {}", registers::register_label(address)),
                registers::register(address).is_none(),
            )
        }
        Opcode::WriteRegister(address) => {
            *register = address;
            (
                DeviceState::WritePending,
                Action::WriteRequest,
                format!("Write {}", registers::register_label(address)),
                registers::register(address).is_none(),
            )
        }
        Opcode::Unknown(byte) => {
            log::warn!("Unknown command 0x{:02X}", byte);
            (
                DeviceState::Command,
                Action::UnknownCommand,
                format!("Error: Unknown command {:02X}", byte),
                false,
            )
        }
    };

    if unknown_register {
        log::warn!("Command 0x{:02X} addresses an unknown register", command);
    }

    Transition {
        next,
        action,
        primary: Segment { text, crc: status },
        response: None,
        unknown_register,
    }
}

fn write_completion(register: u8, seed: u8, mosi: SpiWord, verify_crc: bool) -> Transition {
    let expected = crc::write_data_crc(mosi.byte, seed);
    let status = verify(mosi.crc, expected, verify_crc);

    Transition {
        next: DeviceState::Command,
        action: Action::WriteData,
        primary: Segment {
            text: format!(
                "{} write: {}",
                registers::register_label(register),
                register_value(register, mosi.byte)
            ),
            crc: status,
        },
        response: None,
        unknown_register: registers::register(register).is_none(),
    }
}

fn read_response(register: u8, miso: SpiWord, verify_crc: bool) -> Segment {
    let expected = crc::read_response_crc(miso.byte);

    Segment {
        text: format!(
            "{} read: {}",
            registers::register_label(register),
            register_value(register, miso.byte)
        ),
        crc: verify(miso.crc, expected, verify_crc),
    }
}

/// Field list for known registers, raw hex otherwise
fn register_value(register: u8, byte: u8) -> String {
    if registers::register(register).is_some() {
        bitfield::decode_register(register, byte)
    } else {
        format!("0x{:02X}", byte)
    }
}

fn verify(received: u8, expected: u8, verify_crc: bool) -> CrcStatus {
    if !verify_crc {
        return CrcStatus::NotChecked;
    }
    let status = crc::check(received, expected);
    if let CrcStatus::Mismatch { received, expected } = status {
        log::warn!("CRC mismatch: got 0x{:02X}, expected 0x{:02X}", received, expected);
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(byte: u8, crc: u8) -> SpiWord {
        SpiWord::new(byte, crc)
    }

    #[test]
    fn test_nop_is_plain_command() {
        let (mut register, mut seed) = (0, 0);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0x00, 0x0C),
            word(0, 0),
            true,
        );
        assert_eq!(t.next, DeviceState::Command);
        assert_eq!(t.action, Action::Command);
        assert_eq!(t.primary.text, "NOP");
        assert_eq!(t.primary.crc, CrcStatus::Ok(0x0C));
        assert!(t.response.is_none());
        assert_eq!(seed, 0xF3);
    }

    #[test]
    fn test_read_request_selects_register() {
        let (mut register, mut seed) = (0, 0);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0xAC, 0x41),
            word(0, 0),
            true,
        );
        assert_eq!(t.next, DeviceState::ReadPending);
        assert_eq!(t.primary.text, "Read CFG1");
        assert!(!t.primary.crc.is_error());
        assert_eq!(register, 0x0C);
    }

    #[test]
    fn test_pending_read_decodes_response_before_new_command() {
        // CFG1 read outstanding, next command reads STATUS1
        let (mut register, mut seed) = (0x0C, 0xBE);
        let t = step(
            DeviceState::ReadPending,
            &mut register,
            &mut seed,
            word(0xA2, crc::command_crc(0xA2).expected),
            word(0x80, 0x7A),
            true,
        );
        assert_eq!(t.primary.text, "Read STATUS1");
        let response = t.response.expect("response segment");
        assert_eq!(response.text, "CFG1 read: CRC_SPI, DT_DISABLED, IN_FILTER_DISABLED");
        assert_eq!(response.crc, CrcStatus::Ok(0x7A));
        assert_eq!(register, 0x02);
        assert_eq!(t.next, DeviceState::ReadPending);
    }

    #[test]
    fn test_write_completion_uses_chained_crc() {
        let (mut register, mut seed) = (0, 0);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0x99, 0xCA),
            word(0, 0),
            true,
        );
        assert_eq!(t.next, DeviceState::WritePending);
        assert_eq!(t.primary.text, "Write CFG5");

        let t = step(t.next, &mut register, &mut seed, word(0x01, 0x73), word(0, 0), true);
        assert_eq!(t.next, DeviceState::Command);
        assert_eq!(t.action, Action::WriteData);
        assert_eq!(t.primary.text, "CFG5 write: SENSE_EN");
        assert_eq!(t.primary.crc, CrcStatus::Ok(0x73));
    }

    #[test]
    fn test_write_completion_rejects_unchained_crc() {
        let (mut register, mut seed) = (0x19, crc::command_crc(0x99).seed);
        let unchained = crc::complement(crc::crc8(0x01, crc::CRC_INIT));
        let t = step(
            DeviceState::WritePending,
            &mut register,
            &mut seed,
            word(0x01, unchained),
            word(0, 0),
            true,
        );
        assert!(t.primary.crc.is_error());
        // The byte is still decoded
        assert_eq!(t.primary.text, "CFG5 write: SENSE_EN");
    }

    #[test]
    fn test_write_pending_ignores_miso() {
        let (mut register, mut seed) = (0x19, crc::command_crc(0x99).seed);
        let t = step(
            DeviceState::WritePending,
            &mut register,
            &mut seed,
            word(0x01, 0x73),
            word(0xFF, 0x00),
            true,
        );
        assert!(t.response.is_none());
        assert_eq!(t.crc_errors(), 0);
    }

    #[test]
    fn test_unknown_command_falls_back_to_command_state() {
        let (mut register, mut seed) = (0x0C, 0);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0x60, 0x2B),
            word(0, 0),
            true,
        );
        assert_eq!(t.next, DeviceState::Command);
        assert_eq!(t.action, Action::UnknownCommand);
        assert_eq!(t.primary.text, "Error: Unknown command 60");
        assert!(!t.primary.crc.is_error());
        // Register selection is untouched
        assert_eq!(register, 0x0C);
    }

    #[test]
    fn test_unknown_register_reports_address() {
        let (mut register, mut seed) = (0, 0);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0xBB, 0),
            word(0, 0),
            false,
        );
        assert_eq!(t.next, DeviceState::ReadPending);
        assert_eq!(t.primary.text, "Read unknown register 0x1B");
        assert!(t.unknown_register);

        let t = step(t.next, &mut register, &mut seed, word(0x00, 0), word(0x5A, 0), false);
        let response = t.response.expect("response segment");
        assert_eq!(response.text, "unknown register 0x1B read: 0x5A");
        assert!(t.unknown_register);
    }

    #[test]
    fn test_unknown_register_write_shows_raw_value() {
        let (mut register, mut seed) = (0, 0);
        let command = crc::command_crc(0x9B);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0x9B, command.expected),
            word(0, 0),
            true,
        );
        assert_eq!(t.next, DeviceState::WritePending);
        assert_eq!(t.primary.text, "Write unknown register 0x1B");
        assert!(t.unknown_register);

        let data = word(0x5A, crc::write_data_crc(0x5A, command.seed));
        let t = step(t.next, &mut register, &mut seed, data, word(0, 0), true);
        assert_eq!(t.next, DeviceState::Command);
        assert_eq!(t.primary.text, "unknown register 0x1B write: 0x5A");
        assert!(!t.primary.crc.is_error());
        assert!(t.unknown_register);
    }

    #[test]
    fn test_crc_verification_disabled() {
        let (mut register, mut seed) = (0, 0);
        let t = step(
            DeviceState::Command,
            &mut register,
            &mut seed,
            word(0x00, 0x99),
            word(0, 0),
            false,
        );
        assert_eq!(t.primary.crc, CrcStatus::NotChecked);
        assert_eq!(t.crc_errors(), 0);
        // Seed still tracks the command for a later write
        assert_eq!(seed, 0xF3);
    }

    #[test]
    fn test_crc_errors_counted_per_segment() {
        let (mut register, mut seed) = (0x0C, 0);
        let t = step(
            DeviceState::ReadPending,
            &mut register,
            &mut seed,
            word(0x00, 0x00),
            word(0x80, 0x00),
            true,
        );
        assert_eq!(t.crc_errors(), 2);
    }
}
