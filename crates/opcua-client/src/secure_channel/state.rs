// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Secure channel state machine.
//!
//! ```text
//!      +----------+
//!      |  Closed  |
//!      +----+-----+
//!           | open()
//!           v
//!      +----------+
//!      | Opening  |--(timeout/rejected)--> Faulted
//!      +----+-----+
//!           | OPN response
//!           v
//!      +----------+  75% lifetime   +----------+
//!      |   Open   |---------------->| Renewing |
//!      |          |<----------------|          |
//!      +----+-----+   new token     +----------+
//!           | close()
//!           v
//!      +----------+
//!      | Closing  |
//!      +----+-----+
//!           v
//!        Closed
//! ```
//!
//! `Faulted` is reachable from every state on transport, decoding or
//! security errors.

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelState {
    #[default]
    Closed,
    Opening,
    Open,
    Renewing,
    Closing,
    Faulted,
}

impl ChannelState {
    /// Requests may be sent.
    pub fn is_operational(&self) -> bool {
        matches!(self, ChannelState::Open | ChannelState::Renewing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelState::Closed | ChannelState::Faulted)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Closed => "Closed",
            ChannelState::Opening => "Opening",
            ChannelState::Open => "Open",
            ChannelState::Renewing => "Renewing",
            ChannelState::Closing => "Closing",
            ChannelState::Faulted => "Faulted",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(ChannelState::Open.is_operational());
        assert!(ChannelState::Renewing.is_operational());
        assert!(!ChannelState::Opening.is_operational());
        assert!(ChannelState::Faulted.is_terminal());
        assert!(!ChannelState::Closing.is_terminal());
        assert_eq!(ChannelState::default(), ChannelState::Closed);
        assert_eq!(ChannelState::Renewing.to_string(), "Renewing");
    }
}
