// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Security tokens and their keys.
//!
//! Outbound traffic always uses the current token. Inbound chunks may carry
//! the current token or, until it expires, the one it replaced.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::crypto::ChannelKeys;
use crate::config::TOKEN_RENEWAL_RATIO;
use crate::services::ChannelSecurityToken;

#[derive(Debug)]
pub struct SecurityToken {
    pub channel_id: u32,
    pub token_id: u32,
    pub created_at: Instant,
    pub lifetime: Duration,
    /// `None` for SecurityPolicy None.
    pub keys: Option<ChannelKeys>,
}

impl SecurityToken {
    pub fn new(token: &ChannelSecurityToken, keys: Option<ChannelKeys>) -> Self {
        Self {
            channel_id: token.channel_id,
            token_id: token.token_id,
            created_at: Instant::now(),
            lifetime: Duration::from_millis(u64::from(token.revised_lifetime)),
            keys,
        }
    }

    /// When renewal starts.
    pub fn renew_at(&self) -> Instant {
        self.created_at + self.lifetime.mul_f64(TOKEN_RENEWAL_RATIO)
    }

    pub fn expires_at(&self) -> Instant {
        self.created_at + self.lifetime
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// Current token plus the one it replaced.
#[derive(Debug, Default)]
pub struct TokenSet {
    pub current: Option<Arc<SecurityToken>>,
    pub previous: Option<Arc<SecurityToken>>,
}

impl TokenSet {
    /// Set after installing `token` as the current one.
    pub fn rotate(&self, token: SecurityToken) -> TokenSet {
        TokenSet {
            current: Some(Arc::new(token)),
            previous: self.current.clone(),
        }
    }

    /// Token accepted for inbound chunks carrying `token_id`.
    pub fn inbound(&self, token_id: u32, now: Instant) -> Option<&Arc<SecurityToken>> {
        if let Some(current) = self.current.as_ref().filter(|t| t.token_id == token_id) {
            return Some(current);
        }
        self.previous
            .as_ref()
            .filter(|t| t.token_id == token_id && !t.is_expired(now))
    }
}
