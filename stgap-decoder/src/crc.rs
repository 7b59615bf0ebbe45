//! CRC-8 engine for STGAP1BS SPI words
//!
//! Every byte on the bus is followed by a CRC-8 (polynomial 0x07, MSB first)
//! computed over that single byte. The seed and the final complement depend on
//! what the byte is:
//!
//! | Byte               | Seed                         | Companion CRC        |
//! |--------------------|------------------------------|----------------------|
//! | Command            | `0xFF`                       | `!crc8(cmd, 0xFF)`   |
//! | Write data         | raw CRC of the command byte  | `!crc8(data, seed)`  |
//! | Read response      | `0xFF`                       | `crc8(resp, 0xFF)`   |
//!
//! The read path is neither complemented nor chained. This matches the device
//! and must not be unified with the write path.

use crc::{Algorithm, Crc};
use serde::{Deserialize, Serialize};

/// Seed for a fresh (unchained) computation
pub const CRC_INIT: u8 = 0xFF;

/// Polynomial x^8 + x^2 + x + 1
pub const CRC_POLY: u8 = 0x07;

const STGAP_CRC8: Algorithm<u8> = Algorithm {
    width: 8,
    poly: CRC_POLY,
    init: CRC_INIT,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xFB,
    residue: 0x00,
};

/// CRC-8 calculator with 256-byte lookup table.
const CRC8: Crc<u8> = Crc::<u8>::new(&STGAP_CRC8);

/// Run one byte through the CRC-8 table starting from `seed`
///
/// Returns the raw (un-complemented) accumulator.
#[inline]
#[must_use]
pub fn crc8(byte: u8, seed: u8) -> u8 {
    let mut digest = CRC8.digest_with_initial(seed);
    digest.update(&[byte]);
    digest.finalize()
}

/// 8-bit bitwise complement used for companion CRC values
#[inline]
#[must_use]
pub const fn complement(value: u8) -> u8 {
    !value
}

/// CRC data derived from a command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCrc {
    /// Value the host must transmit after the command byte
    pub expected: u8,
    /// Raw accumulator, seed for a following write-data byte
    pub seed: u8,
}

/// Expected companion CRC of a command byte, plus the seed it leaves behind
#[must_use]
pub fn command_crc(command: u8) -> CommandCrc {
    let seed = crc8(command, CRC_INIT);
    CommandCrc {
        expected: complement(seed),
        seed,
    }
}

/// Expected companion CRC of a write-data byte chained from `command_seed`
#[must_use]
pub fn write_data_crc(data: u8, command_seed: u8) -> u8 {
    complement(crc8(data, command_seed))
}

/// Expected companion CRC of a read-response byte
#[must_use]
pub fn read_response_crc(response: u8) -> u8 {
    crc8(response, CRC_INIT)
}

/// Outcome of comparing a received CRC with the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrcStatus {
    /// Received value matched
    Ok(u8),
    /// Received value did not match
    Mismatch { received: u8, expected: u8 },
    /// CRC verification disabled
    NotChecked,
}

impl CrcStatus {
    /// True for a mismatch
    pub fn is_error(&self) -> bool {
        matches!(self, CrcStatus::Mismatch { .. })
    }

    /// Inline annotation appended to a message segment
    ///
    /// Matching CRCs are only annotated in debug mode.
    pub fn annotation(&self, debug: bool) -> String {
        match self {
            CrcStatus::Mismatch { received, expected } => format!(
                " [CRC ERROR: got 0x{:02X}, expected 0x{:02X}]",
                received, expected
            ),
            CrcStatus::Ok(value) if debug => format!(" [CRC OK: 0x{:02X}]", value),
            CrcStatus::Ok(_) | CrcStatus::NotChecked => String::new(),
        }
    }
}

/// Compare a received companion byte with the expected value
pub fn check(received: u8, expected: u8) -> CrcStatus {
    if received == expected {
        CrcStatus::Ok(received)
    } else {
        CrcStatus::Mismatch { received, expected }
    }
}
