// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use opcua_client::codec::DecodingOptions;
use opcua_client::secure_channel::chunk::{split_plain, ChunkAssembler, ChunkPrefix};
use opcua_client::secure_channel::security::Protection;

fuzz_target!(|data: &[u8]| {
    // Inbound chunk path of an unsecured channel
    let Ok(prefix) = ChunkPrefix::parse(data, &DecodingOptions::default()) else {
        return;
    };
    let Ok(plain) = Protection::None.unprotect(data, prefix.len) else {
        return;
    };
    let Ok((sequence, body)) = split_plain(&plain, prefix.len) else {
        return;
    };
    let mut assembler = ChunkAssembler::new(1 << 20, 16);
    let _ = assembler.push(prefix.header.chunk_type, sequence, body);
});
