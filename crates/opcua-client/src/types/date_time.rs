// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecResult};

/// 100 ns ticks between 1601-01-01 and 1970-01-01.
const TICKS_TO_UNIX_EPOCH: i64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: i64 = 100;

/// OPC UA DateTime: signed count of 100 ns intervals since 1601-01-01 UTC.
///
/// `0` is the null value, `i64::MAX` the maximum ("no end date").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime(i64);

impl DateTime {
    pub const NULL: DateTime = DateTime(0);
    pub const MAX: DateTime = DateTime(i64::MAX);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => TICKS_TO_UNIX_EPOCH.saturating_add(duration_ticks(after)),
            Err(before) => TICKS_TO_UNIX_EPOCH.saturating_sub(duration_ticks(before.duration())),
        };
        // Times before 1601 are clamped to null.
        Self(ticks.max(0))
    }

    /// Convert to `SystemTime`. Null and maximum values have no equivalent.
    pub fn to_system_time(self) -> Option<SystemTime> {
        if self.is_null() || self == Self::MAX {
            return None;
        }
        let unix_ticks = self.0 - TICKS_TO_UNIX_EPOCH;
        let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
        let nanos = unix_ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
        let offset = Duration::new(secs.unsigned_abs(), nanos as u32);
        if secs >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(secs.unsigned_abs()))
                .and_then(|t| t.checked_add(Duration::from_nanos(nanos as u64)))
        }
    }

    pub fn ticks(self) -> i64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

fn duration_ticks(duration: Duration) -> i64 {
    let secs = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
    secs.saturating_mul(TICKS_PER_SECOND)
        .saturating_add(i64::from(duration.subsec_nanos()) / NANOS_PER_TICK)
}

impl From<SystemTime> for DateTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_system_time().map(|t| t.duration_since(UNIX_EPOCH)) {
            Some(Ok(since)) => write!(f, "{}.{:07}s", since.as_secs(), since.subsec_nanos() / 100),
            _ if self.is_null() => f.write_str("null"),
            _ => write!(f, "ticks:{}", self.0),
        }
    }
}

impl BinaryEncode for DateTime {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_i64(self.0);
    }
}

impl BinaryDecode for DateTime {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        reader.read_i64().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_offset() {
        assert_eq!(DateTime::from_system_time(UNIX_EPOCH).ticks(), TICKS_TO_UNIX_EPOCH);
        assert_eq!(
            DateTime::from_ticks(TICKS_TO_UNIX_EPOCH).to_system_time(),
            Some(UNIX_EPOCH)
        );
    }

    #[test]
    fn test_system_time_roundtrip_keeps_tick_precision() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_700);
        let dt = DateTime::from(time);
        assert_eq!(dt.to_system_time(), Some(time));
    }

    #[test]
    fn test_null_and_max_have_no_system_time() {
        assert!(DateTime::NULL.is_null());
        assert_eq!(DateTime::NULL.to_system_time(), None);
        assert_eq!(DateTime::MAX.to_system_time(), None);
    }

    #[test]
    fn test_wire_form_is_int64() {
        let dt = DateTime::from_ticks(0x0102_0304_0506_0708);
        assert_eq!(dt.encode_to_vec(), vec![8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(DateTime::decode_from_slice(&dt.encode_to_vec()).unwrap(), dt);
    }
}
