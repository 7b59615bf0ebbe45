//! Core types for the STGAP SPI decoder library
//!
//! This module defines the events the decoder consumes (one per SPI analyzer
//! frame) and the decoded results it emits. Chain-select cycles are delimited
//! by `Enable` events; every `Result` event carries one 16-bit word per
//! direction, split into the payload byte and its companion CRC byte.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the decoder (seconds, as exported by the
/// capture tool)
pub type Timestamp = f64;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur outside of the decode stream itself
///
/// Decoding never fails: malformed bytes are annotated inline. These errors
/// cover configuration and the helpers that turn textual words into
/// [`SpiWord`]s.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid SPI word: {0}")]
    InvalidWord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// One direction of a 16-bit SPI word: the payload byte followed by its CRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpiWord {
    /// Command, register value or read response
    pub byte: u8,
    /// Companion CRC-8 byte transmitted after `byte`
    pub crc: u8,
}

impl SpiWord {
    /// Create a word from its payload and CRC bytes
    pub const fn new(byte: u8, crc: u8) -> Self {
        Self { byte, crc }
    }

    /// Split a 16-bit transfer, payload in the high byte
    pub const fn from_u16(word: u16) -> Self {
        Self {
            byte: (word >> 8) as u8,
            crc: (word & 0xFF) as u8,
        }
    }

    /// Build a word from the raw bytes of one transfer
    ///
    /// Exactly two bytes are expected: payload then CRC.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [byte, crc] => Ok(Self::new(*byte, *crc)),
            _ => Err(DecoderError::InvalidWord(format!(
                "expected 2 bytes, got {}",
                bytes.len()
            ))),
        }
    }

    /// Parse a textual word such as `0xAC41`, `AC41` or `0xAC 0x41`
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            [single] => {
                let digits = strip_hex_prefix(single);
                if digits.len() != 4 {
                    return Err(DecoderError::InvalidWord(format!(
                        "'{}' is not a 16-bit hex word",
                        text
                    )));
                }
                let value = u16::from_str_radix(digits, 16)
                    .map_err(|e| DecoderError::InvalidWord(format!("'{}': {}", text, e)))?;
                Ok(Self::from_u16(value))
            }
            [byte, crc] => {
                let byte = parse_hex_byte(byte)?;
                let crc = parse_hex_byte(crc)?;
                Ok(Self::new(byte, crc))
            }
            _ => Err(DecoderError::InvalidWord(format!(
                "'{}' does not contain one 16-bit word",
                text
            ))),
        }
    }

    /// The word as transmitted on the wire
    pub const fn as_u16(&self) -> u16 {
        ((self.byte as u16) << 8) | self.crc as u16
    }
}

impl fmt::Display for SpiWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.byte, self.crc)
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn parse_hex_byte(s: &str) -> Result<u8> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() || digits.len() > 2 {
        return Err(DecoderError::InvalidWord(format!("'{}' is not a hex byte", s)));
    }
    u8::from_str_radix(digits, 16)
        .map_err(|e| DecoderError::InvalidWord(format!("'{}': {}", s, e)))
}

/// Input event delivered by the frame-ingestion adapter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpiEvent {
    /// Chip select asserted: a new chain-select cycle begins
    Enable,
    /// One SPI word exchanged with the chain
    Result {
        /// Host to chain
        mosi: SpiWord,
        /// Chain to host
        miso: SpiWord,
        /// Start of the transfer
        start_time: Timestamp,
        /// End of the transfer
        end_time: Timestamp,
    },
}

impl SpiEvent {
    /// Convenience constructor for a `Result` event
    pub fn result(
        mosi: SpiWord,
        miso: SpiWord,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        SpiEvent::Result {
            mosi,
            miso,
            start_time,
            end_time,
        }
    }
}

/// One decoded frame, emitted for every `Result` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedResult {
    /// Start of the originating transfer
    pub start_time: Timestamp,
    /// End of the originating transfer
    pub end_time: Timestamp,
    /// 0-based chain position of the device this word belongs to
    pub device: usize,
    /// Raw MOSI word
    pub mosi: SpiWord,
    /// Raw MISO word
    pub miso: SpiWord,
    /// Human-readable protocol text
    pub text: String,
}
