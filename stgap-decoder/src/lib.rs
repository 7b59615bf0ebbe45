//! STGAP1BS SPI Decoder Library
//!
//! Decodes SPI traffic to one or more daisy-chained STGAP1BS/STGAP1AS
//! isolated gate drivers into human-readable protocol events.
//!
//! # Architecture
//!
//! - Infers the chain length from the number of words per chain-select cycle
//! - Tracks pipelined register reads and writes per device
//! - Decodes register values into named bitfields
//! - Verifies the CRC-8 byte that accompanies every byte on the bus
//!
//! The library does NOT:
//! - Acquire signals or frame SPI words (events are supplied by the caller)
//! - Persist decoded output
//!
//! Capture-file parsing and output rendering live in the application layer
//! (stgap-cli).
//!
//! # Example Usage
//!
//! ```
//! use stgap_decoder::{Decoder, DecoderConfig, SpiEvent, SpiWord};
//!
//! let mut decoder = Decoder::with_config(DecoderConfig::new()).unwrap();
//!
//! // Cycle 1: read CFG1
//! decoder.process(&SpiEvent::Enable);
//! let read = decoder
//!     .process(&SpiEvent::result(SpiWord::new(0xAC, 0x41), SpiWord::default(), 0.0, 1e-6))
//!     .unwrap();
//! assert_eq!(read.text, "Read CFG1");
//!
//! // Cycle 2: the response arrives alongside the next command
//! decoder.process(&SpiEvent::Enable);
//! let nop = decoder
//!     .process(&SpiEvent::result(SpiWord::new(0x00, 0x0C), SpiWord::new(0x80, 0x7A), 1e-5, 2e-5))
//!     .unwrap();
//! assert!(nop.text.starts_with("NOP | CFG1 read: CRC_SPI"));
//! ```

// Public modules
pub mod bitfield;
pub mod composer;
pub mod config;
pub mod crc;
pub mod decoder;
pub mod registers;
pub mod state_machine;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use crc::CrcStatus;
pub use decoder::{Decoder, DecoderStats, DecodingIterator};
pub use state_machine::DeviceState;
pub use tracker::ChainTracker;
pub use types::{DecodedResult, DecoderError, Result, SpiEvent, SpiWord, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
