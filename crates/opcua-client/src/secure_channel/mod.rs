// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA secure channel.
//!
//! # Layers
//!
//! ```text
//! SecureChannel::send_request
//!        |
//!   encode_chunks ---> Protection::protect ---> write half
//!                                                   |
//!                                               transport
//!                                                   |
//!   ChunkAssembler <-- Protection::unprotect <-- read_frame (reader task)
//!        |
//!   PendingRequests::complete
//! ```
//!
//! [`policy`] and [`crypto`] hold the algorithm suites and key schedule;
//! [`pki`] loads certificates and keys.

mod channel;
pub mod chunk;
pub mod crypto;
mod pending;
pub mod pki;
pub mod policy;
pub mod security;
mod state;
mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ChannelParams, SecureChannel};
pub use pki::{Certificate, ClientPki, PrivateKey};
pub use policy::{HashAlgorithm, RsaPadding, SecurityPolicy};
pub use state::ChannelState;
