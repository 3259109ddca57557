// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use opcua_client::codec::{BinaryDecode, BinaryReader, DecodingOptions};
use opcua_client::services::ResponseMessage;
use opcua_client::types::Variant;

fuzz_target!(|data: &[u8]| {
    // Full service response (type id + body)
    let _ = ResponseMessage::decode_from_slice(data);

    // Variants nest through arrays, DataValue and ExtensionObject
    let options = DecodingOptions {
        max_array_length: 1024,
        ..DecodingOptions::default()
    };
    let mut reader = BinaryReader::with_options(data, options);
    let _ = Variant::decode(&mut reader);
});
