// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `opc.tcp://host[:port][/path]` endpoint URLs.

use std::fmt;

use crate::error::{Error, Result};

/// IANA registered OPC UA TCP port.
pub const DEFAULT_PORT: u16 = 4840;

const SCHEME: &str = "opc.tcp://";

/// Parsed endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointUrl {
    pub host: String,
    pub port: u16,
    /// Path including the leading `/`, empty if absent.
    pub path: String,
}

impl EndpointUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Config(format!("invalid endpoint URL '{}': {}", url, reason));
        let scheme_len = SCHEME.len();
        if !url
            .get(..scheme_len)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(SCHEME))
        {
            return Err(invalid("scheme must be opc.tcp"));
        }
        let rest = &url[scheme_len..];
        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            // IPv6 literal
            let end = bracketed.find(']').ok_or_else(|| invalid("unterminated IPv6 address"))?;
            let host = &bracketed[..end];
            let port = match &bracketed[end + 1..] {
                "" => None,
                tail => Some(tail.strip_prefix(':').ok_or_else(|| invalid("bad port separator"))?),
            };
            (host, port)
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = match port {
            Some(p) => p.parse::<u16>().map_err(|_| invalid("bad port"))?,
            None => DEFAULT_PORT,
        };
        if port == 0 {
            return Err(invalid("port 0"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// `host:port` for socket connection.
    pub fn socket_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", SCHEME, self.socket_address(), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url() {
        let url = EndpointUrl::parse("opc.tcp://plc.local:4841/UA/Server").unwrap();
        assert_eq!(url.host, "plc.local");
        assert_eq!(url.port, 4841);
        assert_eq!(url.path, "/UA/Server");
        assert_eq!(url.to_string(), "opc.tcp://plc.local:4841/UA/Server");
    }

    #[test]
    fn test_default_port() {
        let url = EndpointUrl::parse("opc.tcp://10.0.0.5").unwrap();
        assert_eq!(url.port, DEFAULT_PORT);
        assert_eq!(url.socket_address(), "10.0.0.5:4840");
    }

    #[test]
    fn test_ipv6() {
        let url = EndpointUrl::parse("opc.tcp://[::1]:4850/").unwrap();
        assert_eq!(url.host, "::1");
        assert_eq!(url.socket_address(), "[::1]:4850");
    }

    #[test]
    fn test_rejects_invalid() {
        for bad in ["", "http://x", "opc.tcp://", "opc.tcp://:4840", "opc.tcp://h:99999", "opc.tcp://h:0"] {
            assert!(EndpointUrl::parse(bad).is_err(), "{} accepted", bad);
        }
    }
}
