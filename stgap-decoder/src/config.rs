//! Decoder configuration types
//!
//! The decoder needs very little configuration: whether to verify the CRC
//! byte that accompanies every byte on the bus, and whether matching CRCs are
//! annotated as well as mismatches.

use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Verify companion CRC bytes (false = no CRC annotations at all)
    #[serde(default = "default_true")]
    pub verify_crc: bool,

    /// Annotate matching CRCs with `[CRC OK: ..]`
    #[serde(default)]
    pub debug_crc: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            verify_crc: true,
            debug_crc: false,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable CRC verification
    pub fn with_crc_verification(mut self, enabled: bool) -> Self {
        self.verify_crc = enabled;
        self
    }

    /// Builder method: annotate matching CRCs too
    pub fn with_crc_debug(mut self, enabled: bool) -> Self {
        self.debug_crc = enabled;
        self
    }
}
