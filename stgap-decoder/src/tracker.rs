//! Chain state tracker
//!
//! Owns the per-device arrays for a daisy chain of unknown length. The chain
//! length is learned from the number of words seen between two `Enable`
//! events: arrays grow the first time a position is reached and never shrink.
//! Positions not reached in a shorter cycle keep their pending register and
//! CRC seed, and restart in `Command` the next time they are reached.

use crate::state_machine::{self, DeviceState, Transition};
use crate::types::SpiWord;

/// Per-run decoding context for one chain
#[derive(Debug, Clone, Default)]
pub struct ChainTracker {
    /// State of each device for the current cycle
    state: Vec<DeviceState>,
    /// States computed during the current cycle, in position order
    next_state: Vec<DeviceState>,
    /// Register selected by each device's last read/write command
    registers: Vec<u8>,
    /// Raw CRC of each device's last command byte
    seeds: Vec<u8>,
    /// Words seen in the current cycle
    position: usize,
}

impl ChainTracker {
    /// Create an empty tracker; nothing is known about the chain yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new chain-select cycle
    pub fn begin_cycle(&mut self) {
        self.state = std::mem::take(&mut self.next_state);
        self.position = 0;
        log::trace!("cycle start, {} device states carried over", self.state.len());
    }

    /// Feed one word to the device at the next chain position
    ///
    /// Returns the 0-based position together with the device's transition.
    pub fn advance(
        &mut self,
        mosi: SpiWord,
        miso: SpiWord,
        verify_crc: bool,
    ) -> (usize, Transition) {
        self.position += 1;
        let index = self.position - 1;
        self.grow_to(self.position);

        let state = self.state[index];
        let transition = state_machine::step(
            state,
            &mut self.registers[index],
            &mut self.seeds[index],
            mosi,
            miso,
            verify_crc,
        );
        log::trace!("device {}: {} -> {}", index, state, transition.next);
        self.next_state.push(transition.next);

        (index, transition)
    }

    fn grow_to(&mut self, len: usize) {
        if self.registers.len() < len {
            log::debug!("chain length grew to {}", len);
            self.registers.resize(len, 0);
        }
        if self.seeds.len() < len {
            self.seeds.resize(len, 0);
        }
        if self.state.len() < len {
            self.state.resize(len, DeviceState::Command);
        }
    }

    /// Longest chain observed so far
    pub fn chain_length(&self) -> usize {
        self.registers.len()
    }

    /// Words seen since the last `Enable`
    pub fn position(&self) -> usize {
        self.position
    }

    /// State the device at `index` is in for the current cycle
    pub fn state(&self, index: usize) -> Option<DeviceState> {
        self.state.get(index).copied()
    }

    /// States queued for the next cycle
    pub fn next_states(&self) -> &[DeviceState] {
        &self.next_state
    }

    /// Register last selected by the device at `index`
    pub fn pending_register(&self, index: usize) -> Option<u8> {
        self.registers.get(index).copied()
    }

    /// Raw command CRC last recorded for the device at `index`
    pub fn pending_seed(&self, index: usize) -> Option<u8> {
        self.seeds.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc;

    fn command(byte: u8) -> SpiWord {
        SpiWord::new(byte, crc::command_crc(byte).expected)
    }

    fn idle() -> SpiWord {
        SpiWord::new(0, 0)
    }

    #[test]
    fn test_empty_tracker() {
        let tracker = ChainTracker::new();
        assert_eq!(tracker.chain_length(), 0);
        assert_eq!(tracker.position(), 0);
        assert_eq!(tracker.state(0), None);
    }

    #[test]
    fn test_word_before_first_enable_starts_at_position_zero() {
        let mut tracker = ChainTracker::new();
        let (index, transition) = tracker.advance(command(0x9B), idle(), true);
        assert_eq!(index, 0);
        assert_eq!(transition.next, DeviceState::WritePending);
        assert_eq!(transition.primary.text, "Write unknown register 0x1B");
        assert_eq!(tracker.chain_length(), 1);

        // The next Enable carries the pending write over
        tracker.begin_cycle();
        assert_eq!(tracker.state(0), Some(DeviceState::WritePending));
    }

    #[test]
    fn test_chain_length_discovery() {
        let mut tracker = ChainTracker::new();
        tracker.begin_cycle();
        for expected in 0..3 {
            let (index, _) = tracker.advance(command(0x00), idle(), true);
            assert_eq!(index, expected);
        }
        assert_eq!(tracker.chain_length(), 3);
        assert_eq!(tracker.next_states().len(), 3);
    }

    #[test]
    fn test_shorter_cycle_keeps_length() {
        let mut tracker = ChainTracker::new();
        tracker.begin_cycle();
        for _ in 0..4 {
            tracker.advance(command(0xAC), idle(), true);
        }
        tracker.begin_cycle();
        tracker.advance(command(0x00), idle(), true);
        tracker.advance(command(0x00), idle(), true);
        assert_eq!(tracker.chain_length(), 4);

        // Positions 2 and 3 were skipped; they restart in Command
        tracker.begin_cycle();
        for _ in 0..4 {
            tracker.advance(command(0x00), idle(), true);
        }
        assert_eq!(tracker.state(2), Some(DeviceState::Command));
        assert_eq!(tracker.state(3), Some(DeviceState::Command));
        // Their register selection survives
        assert_eq!(tracker.pending_register(3), Some(0x0C));
    }

    #[test]
    fn test_states_carry_to_next_cycle() {
        let mut tracker = ChainTracker::new();
        tracker.begin_cycle();
        tracker.advance(command(0xAC), idle(), true);
        tracker.advance(command(0x99), idle(), true);
        assert_eq!(
            tracker.next_states(),
            &[DeviceState::ReadPending, DeviceState::WritePending]
        );

        tracker.begin_cycle();
        assert_eq!(tracker.state(0), Some(DeviceState::ReadPending));
        assert_eq!(tracker.state(1), Some(DeviceState::WritePending));
        assert!(tracker.next_states().is_empty());
        assert_eq!(tracker.pending_seed(1), Some(crc::command_crc(0x99).seed));
    }

    #[test]
    fn test_unknown_command_keeps_bookkeeping_aligned() {
        let mut tracker = ChainTracker::new();
        tracker.begin_cycle();
        tracker.advance(command(0x60), idle(), true);
        tracker.advance(command(0xAC), idle(), true);

        tracker.begin_cycle();
        assert_eq!(tracker.state(0), Some(DeviceState::Command));
        assert_eq!(tracker.state(1), Some(DeviceState::ReadPending));
    }
}
