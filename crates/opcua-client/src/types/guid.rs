// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;
use std::str::FromStr;

use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError, CodecResult};

/// 16-byte GUID. Data1..Data3 are little-endian on the wire, Data4 is raw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl FromStr for Guid {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidData(format!("invalid GUID '{}'", s));
        let parts: Vec<&str> = s.trim().split('-').collect();
        let lens = [8, 4, 4, 4, 12];
        if parts.len() != 5 || parts.iter().zip(lens).any(|(p, len)| p.len() != len) {
            return Err(invalid());
        }
        let data1 = u32::from_str_radix(parts[0], 16).map_err(|_| invalid())?;
        let data2 = u16::from_str_radix(parts[1], 16).map_err(|_| invalid())?;
        let data3 = u16::from_str_radix(parts[2], 16).map_err(|_| invalid())?;
        let tail = format!("{}{}", parts[3], parts[4]);
        let mut data4 = [0u8; 8];
        for (i, byte) in data4.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&tail[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self::new(data1, data2, data3, data4))
    }
}

impl BinaryEncode for Guid {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.data1);
        writer.write_u16(self.data2);
        writer.write_u16(self.data3);
        writer.write_bytes(&self.data4);
    }
}

impl BinaryDecode for Guid {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let data1 = reader.read_u32()?;
        let data2 = reader.read_u16()?;
        let data3 = reader.read_u16()?;
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(reader.read_bytes(8)?);
        Ok(Self::new(data1, data2, data3, data4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: Guid = Guid::new(
        0x72962B91,
        0xFA75,
        0x4AE6,
        [0x8D, 0x28, 0xB4, 0x04, 0xDC, 0x7D, 0xAF, 0x63],
    );

    #[test]
    fn test_guid_wire_layout() {
        let bytes = SAMPLE.encode_to_vec();
        assert_eq!(
            bytes,
            vec![
                0x91, 0x2B, 0x96, 0x72, 0x75, 0xFA, 0xE6, 0x4A, 0x8D, 0x28, 0xB4, 0x04, 0xDC,
                0x7D, 0xAF, 0x63
            ]
        );
        assert_eq!(Guid::decode_from_slice(&bytes).unwrap(), SAMPLE);
    }

    #[test]
    fn test_guid_text_form() {
        let text = SAMPLE.to_string();
        assert_eq!(text, "72962B91-FA75-4AE6-8D28-B404DC7DAF63");
        assert_eq!(text.parse::<Guid>().unwrap(), SAMPLE);
        assert_eq!(
            "72962b91-fa75-4ae6-8d28-b404dc7daf63".parse::<Guid>().unwrap(),
            SAMPLE
        );
        assert!("72962B91-FA75-4AE6-8D28".parse::<Guid>().is_err());
    }
}
