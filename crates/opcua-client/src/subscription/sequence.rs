// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Notification sequence numbers.
//!
//! Numbers start at 1 and wrap from `u32::MAX` back to 1; 0 is never used.
//! Ordering uses serial-number arithmetic so a wrapped number still counts
//! as newer.

/// Longest gap filled by Republish; older numbers are given up.
pub const MAX_REPUBLISH_GAP: u32 = 256;

/// Successor of a sequence number.
pub fn next_sequence(n: u32) -> u32 {
    if n == u32::MAX {
        1
    } else {
        n + 1
    }
}

/// True if `a` comes after `b` within half the number space.
fn is_after(a: u32, b: u32) -> bool {
    let delta = a.wrapping_sub(b);
    delta != 0 && delta < 0x8000_0000
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceCheck {
    /// Successor of the last delivered message (or the first message).
    Next,
    /// Newer, with the listed numbers missing in between (oldest first).
    Gap(Vec<u32>),
    /// Already delivered or older.
    Duplicate,
}

/// Last delivered sequence number of one subscription.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceTracker {
    last: Option<u32>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<u32> {
        self.last
    }

    pub fn check(&self, sequence_number: u32) -> SequenceCheck {
        let Some(last) = self.last else {
            return SequenceCheck::Next;
        };
        if sequence_number == next_sequence(last) {
            return SequenceCheck::Next;
        }
        if !is_after(sequence_number, last) {
            return SequenceCheck::Duplicate;
        }

        let distance = sequence_number.wrapping_sub(last) - 1;
        let mut missing = Vec::with_capacity(distance.min(MAX_REPUBLISH_GAP) as usize);
        let mut n = next_sequence(last);
        if distance > MAX_REPUBLISH_GAP {
            log::warn!(
                "[Publish] {} notifications missing, only the newest {} are republished",
                distance,
                MAX_REPUBLISH_GAP
            );
            n = sequence_number.wrapping_sub(MAX_REPUBLISH_GAP);
            if n == 0 {
                n = u32::MAX;
            }
        }
        while n != sequence_number {
            missing.push(n);
            n = next_sequence(n);
        }
        SequenceCheck::Gap(missing)
    }

    /// Record `sequence_number` as delivered (or given up).
    pub fn advance(&mut self, sequence_number: u32) {
        match self.last {
            Some(last) if !is_after(sequence_number, last) => {}
            _ => self.last = Some(sequence_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_is_next() {
        let tracker = SequenceTracker::new();
        assert_eq!(tracker.check(17), SequenceCheck::Next);
    }

    #[test]
    fn test_gap_and_duplicate() {
        let mut tracker = SequenceTracker::new();
        tracker.advance(1);
        tracker.advance(2);
        assert_eq!(tracker.check(3), SequenceCheck::Next);
        assert_eq!(tracker.check(5), SequenceCheck::Gap(vec![3, 4]));
        assert_eq!(tracker.check(2), SequenceCheck::Duplicate);
        assert_eq!(tracker.check(1), SequenceCheck::Duplicate);
    }

    #[test]
    fn test_wraparound_skips_zero() {
        let mut tracker = SequenceTracker::new();
        tracker.advance(u32::MAX - 1);
        assert_eq!(tracker.check(u32::MAX), SequenceCheck::Next);
        tracker.advance(u32::MAX);
        assert_eq!(tracker.check(1), SequenceCheck::Next);
        assert_eq!(tracker.check(3), SequenceCheck::Gap(vec![1, 2]));
        assert_eq!(tracker.check(u32::MAX - 5), SequenceCheck::Duplicate);
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let mut tracker = SequenceTracker::new();
        tracker.advance(10);
        tracker.advance(8);
        assert_eq!(tracker.last(), Some(10));
    }

    #[test]
    fn test_large_gap_is_capped() {
        let mut tracker = SequenceTracker::new();
        tracker.advance(1);
        let SequenceCheck::Gap(missing) = tracker.check(10_000) else {
            panic!("expected gap");
        };
        assert_eq!(missing.len(), MAX_REPUBLISH_GAP as usize);
        assert_eq!(missing.first(), Some(&(10_000 - MAX_REPUBLISH_GAP)));
        assert_eq!(missing.last(), Some(&9_999));
    }
}
