//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! A [`Decoder`] is one decoding context: feed it the events of a single
//! capture run in chronological order and it emits one [`DecodedResult`] per
//! SPI word.

use crate::composer;
use crate::config::DecoderConfig;
use crate::state_machine::Action;
use crate::tracker::ChainTracker;
use crate::types::{DecodedResult, DecoderError, Result, SpiEvent};

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone)]
pub struct Decoder {
    config: DecoderConfig,
    tracker: ChainTracker,
    stats: DecoderStats,
}

impl Decoder {
    /// Create a new decoder with the default configuration
    pub fn new() -> Self {
        Self {
            config: DecoderConfig::default(),
            tracker: ChainTracker::new(),
            stats: DecoderStats::default(),
        }
    }

    /// Create a decoder with an explicit configuration
    ///
    /// # Returns
    /// * `Err(DecoderError::InvalidConfig)` if CRC debug output is requested
    ///   while CRC verification is disabled
    ///
    /// # Example
    /// ```
    /// use stgap_decoder::{Decoder, DecoderConfig};
    ///
    /// let config = DecoderConfig::new().with_crc_debug(true);
    /// let decoder = Decoder::with_config(config).unwrap();
    /// assert!(decoder.config().debug_crc);
    /// ```
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        if config.debug_crc && !config.verify_crc {
            return Err(DecoderError::InvalidConfig(
                "debug_crc requires verify_crc".to_string(),
            ));
        }
        Ok(Self {
            config,
            tracker: ChainTracker::new(),
            stats: DecoderStats::default(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Process one event
    ///
    /// `Enable` starts a new cycle and produces nothing; every `Result`
    /// produces exactly one decoded frame.
    ///
    /// # Example
    /// ```
    /// use stgap_decoder::{Decoder, SpiEvent, SpiWord};
    ///
    /// let mut decoder = Decoder::new();
    /// assert!(decoder.process(&SpiEvent::Enable).is_none());
    ///
    /// let nop = SpiEvent::result(SpiWord::new(0x00, 0x0C), SpiWord::new(0x00, 0x00), 0.0, 1e-6);
    /// let decoded = decoder.process(&nop).unwrap();
    /// assert_eq!(decoded.text, "NOP");
    /// ```
    pub fn process(&mut self, event: &SpiEvent) -> Option<DecodedResult> {
        match *event {
            SpiEvent::Enable => {
                self.tracker.begin_cycle();
                self.stats.cycles += 1;
                None
            }
            SpiEvent::Result {
                mosi,
                miso,
                start_time,
                end_time,
            } => {
                let (device, transition) =
                    self.tracker.advance(mosi, miso, self.config.verify_crc);
                let text = composer::compose(&transition, self.config.debug_crc);

                self.stats.words += 1;
                self.stats.chain_length = self.tracker.chain_length();
                self.stats.crc_errors += transition.crc_errors();
                if transition.action == Action::UnknownCommand {
                    self.stats.unknown_commands += 1;
                }
                if transition.unknown_register {
                    self.stats.unknown_registers += 1;
                }

                log::debug!("{:.9} dev {}: {}", start_time, device, text);

                Some(DecodedResult {
                    start_time,
                    end_time,
                    device,
                    mosi,
                    miso,
                    text,
                })
            }
        }
    }

    /// Decode a sequence of events lazily
    ///
    /// # Example
    /// ```
    /// use stgap_decoder::{Decoder, SpiEvent, SpiWord};
    ///
    /// let events = vec![
    ///     SpiEvent::Enable,
    ///     SpiEvent::result(SpiWord::new(0x2A, 0xDA), SpiWord::default(), 0.0, 1e-6),
    ///     SpiEvent::result(SpiWord::new(0x2A, 0xDA), SpiWord::default(), 1e-6, 2e-6),
    /// ];
    ///
    /// let mut decoder = Decoder::new();
    /// let texts: Vec<String> = decoder.decode_events(events).map(|r| r.text).collect();
    /// assert_eq!(texts, ["START_CONFIG", "START_CONFIG"]);
    /// assert_eq!(decoder.stats().chain_length, 2);
    /// ```
    pub fn decode_events<I>(&mut self, events: I) -> DecodingIterator<'_, I::IntoIter>
    where
        I: IntoIterator<Item = SpiEvent>,
    {
        DecodingIterator {
            events: events.into_iter(),
            decoder: self,
        }
    }

    /// Statistics gathered so far
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Chain-length and per-device state
    pub fn tracker(&self) -> &ChainTracker {
        &self.tracker
    }

    /// Forget everything learned about the chain, keeping the configuration
    pub fn reset(&mut self) {
        log::debug!("Resetting decoder state");
        self.tracker = ChainTracker::new();
        self.stats = DecoderStats::default();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that decodes SPI events into decoded results
///
/// `Enable` events are consumed silently.
pub struct DecodingIterator<'a, I>
where
    I: Iterator<Item = SpiEvent>,
{
    events: I,
    decoder: &'a mut Decoder,
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator<Item = SpiEvent>,
{
    type Item = DecodedResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = self.events.next()?;
            if let Some(result) = self.decoder.process(&event) {
                return Some(result);
            }
        }
    }
}

/// Counters collected while decoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// `Enable` events seen
    pub cycles: usize,
    /// `Result` events seen
    pub words: usize,
    /// Longest chain observed
    pub chain_length: usize,
    /// CRC mismatches across all segments
    pub crc_errors: usize,
    /// Opcodes matching no command pattern
    pub unknown_commands: usize,
    /// Words that touched a register missing from the table
    pub unknown_registers: usize,
}
