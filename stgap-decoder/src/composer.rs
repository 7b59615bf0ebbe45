//! Result composer
//!
//! Joins a state machine transition into the single line of text attached to
//! a decoded word: the primary message, its CRC status, then the pending read
//! response (if any) with its own CRC status.

use crate::state_machine::Transition;

/// Separator placed before a pipelined read response
pub const RESPONSE_SEPARATOR: &str = " | ";

/// Build the text for one decoded word
pub fn compose(transition: &Transition, debug_crc: bool) -> String {
    let mut text = String::with_capacity(64);
    text.push_str(&transition.primary.text);
    text.push_str(&transition.primary.crc.annotation(debug_crc));

    if let Some(response) = &transition.response {
        text.push_str(RESPONSE_SEPARATOR);
        text.push_str(&response.text);
        text.push_str(&response.crc.annotation(debug_crc));
    }

    text
}
