// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # opcua-client - OPC UA client protocol stack
//!
//! A pure Rust, tokio-based client for OPC UA servers over `opc.tcp`:
//! binary encoding, secure channels (None, Basic128Rsa15, Basic256,
//! Basic256Sha256), sessions, the attribute/view/method services and
//! subscriptions with gap-free notification delivery.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use opcua_client::{Client, ClientConfig, MonitoredItemRequest, NodeId, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new(ClientConfig::new("opc.tcp://localhost:4840"))?;
//!     client.connect().await?;
//!
//!     // One-shot read
//!     let value = client.read_value(&NodeId::numeric(2, 1001)).await?;
//!     println!("{:?}", value.value());
//!
//!     // Subscribe to changes
//!     let settings = client.subscription_settings();
//!     let (id, mut stream) = client.create_subscription(&settings).await?;
//!     client
//!         .create_monitored_items(id, &[MonitoredItemRequest::value(NodeId::numeric(2, 1001))])
//!         .await?;
//!     if let Ok(Some(batch)) = tokio::time::timeout(Duration::from_secs(5), stream.recv()).await {
//!         println!("#{}: {:?}", batch.sequence_number, batch.notifications);
//!     }
//!
//!     client.disconnect().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                              Client                                 |
//! |   connect | read/write | browse | call | subscriptions | Node      |
//! +---------------------------------------------------------------------+
//! |                   Session            |      Subscription engine     |
//! |   create/activate/close | keep-alive |  registry | publish loop     |
//! +---------------------------------------------------------------------+
//! |                         Secure channel                              |
//! |   OPN/renew | chunking | sign/encrypt | request correlation        |
//! +---------------------------------------------------------------------+
//! |                   Transport (opc.tcp)        |        Codec          |
//! |   HEL/ACK | framing | TCP or any stream     |  built-ins, services   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Connection owner and service façade |
//! | [`ClientConfig`] | Endpoint, security, identity and timing settings |
//! | [`Session`] | Activated session; raw service calls via [`Session::send`] |
//! | [`NotificationStream`] | Ordered notification batches of one subscription |
//! | [`Error`] | Failure classification shared by every layer |
//!
//! ## Modules Overview
//!
//! - [`client`] - Client façade, node handles, discovery, blocking wrapper
//! - [`subscription`] - Subscription and monitored item management
//! - [`session`] - Session lifecycle
//! - [`secure_channel`] - Secure conversation and security policies
//! - [`transport`] - opc.tcp framing and handshake
//! - [`services`] - Request and response structures
//! - [`types`] - Built-in data types
//! - [`codec`] - Binary encoding

/// Async client, node handles, endpoint discovery and a blocking wrapper.
pub mod client;
/// OPC UA binary encoding traits and primitives.
pub mod codec;
/// Client configuration, defaults and YAML loading.
pub mod config;
/// Error type shared by every layer.
pub mod error;
/// Secure channel: OPN, chunking, signing and encryption.
pub mod secure_channel;
/// Service request and response structures.
pub mod services;
/// Session creation, activation, keep-alive and close.
pub mod session;
/// Subscriptions, monitored items and the publish loop.
pub mod subscription;
/// opc.tcp transport (framing, HEL/ACK).
pub mod transport;
/// Built-in types (NodeId, Variant, DataValue, StatusCode...).
pub mod types;

pub use client::{Client, Node};
pub use config::{ClientConfig, IdentityToken, TransportLimits};
pub use error::{Error, Result};
pub use secure_channel::{Certificate, ClientPki, SecurityPolicy};
pub use session::{Session, SessionInfo, SessionState};
pub use subscription::{
    ItemResult, MonitoredItem, MonitoredItemRequest, MonitoringSettings, Notification,
    NotificationBatch, NotificationStream, SubscriptionId, SubscriptionInfo, SubscriptionSettings,
};
pub use types::{
    AttributeId, DataValue, DateTime, LocalizedText, MessageSecurityMode, MonitoringMode, NodeId,
    QualifiedName, StatusCode, TimestampsToReturn, Variant,
};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
