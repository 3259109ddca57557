// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy of the client stack.
//!
//! Every public operation returns either a value or one of these kinds.
//! `Transport`, `Decoding` and `SecurityViolation` raised on the shared read
//! path fault the whole channel; `ServiceFault` fails only the caller whose
//! response carried it.

use std::fmt;

use crate::codec::CodecError;
use crate::types::StatusCode;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the client stack
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    // ========================================================================
    // Connection
    // ========================================================================
    /// Connection refused, reset or closed by the peer
    Transport(String),

    /// Malformed wire data
    Decoding(CodecError),

    /// Frame, chunk count or reassembled message above the negotiated limits
    MessageTooLarge { size: usize, limit: usize },

    /// Hello/Acknowledge or OpenSecureChannel did not succeed
    ChannelOpenFailed(String),

    /// Signature or decryption failure, or an out-of-order sequence number
    SecurityViolation(String),

    // ========================================================================
    // Session
    // ========================================================================
    /// ActivateSession rejected (bad credentials, certificate rejected)
    ActivationFailed(StatusCode),

    /// No response before the request deadline
    RequestTimedOut { request_handle: u32 },

    /// Channel or session closed while the request was pending
    Cancelled,

    /// Server returned a bad StatusCode for a well-formed exchange
    ServiceFault(StatusCode),

    // ========================================================================
    // Configuration
    // ========================================================================
    /// Invalid or unreadable configuration
    Config(String),
}

impl Error {
    /// StatusCode that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) => StatusCode::BadCommunicationError,
            Self::Decoding(_) => StatusCode::BadDecodingError,
            Self::MessageTooLarge { .. } => StatusCode::BadTcpMessageTooLarge,
            Self::ChannelOpenFailed(_) => StatusCode::BadConnectionRejected,
            Self::SecurityViolation(_) => StatusCode::BadSecurityChecksFailed,
            Self::ActivationFailed(status) | Self::ServiceFault(status) => *status,
            Self::RequestTimedOut { .. } => StatusCode::BadTimeout,
            Self::Cancelled => StatusCode::BadRequestCancelledByClient,
            Self::Config(_) => StatusCode::BadInvalidArgument,
        }
    }

    /// True for errors that leave the channel unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Decoding(_)
                | Self::SecurityViolation(_)
                | Self::ChannelOpenFailed(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::Decoding(e) => write!(f, "Decoding error: {}", e),
            Self::MessageTooLarge { size, limit } => {
                write!(f, "Message too large: {} bytes (limit {})", size, limit)
            }
            Self::ChannelOpenFailed(msg) => write!(f, "Secure channel open failed: {}", msg),
            Self::SecurityViolation(msg) => write!(f, "Security violation: {}", msg),
            Self::ActivationFailed(status) => write!(f, "Session activation failed: {}", status),
            Self::RequestTimedOut { request_handle } => {
                write!(f, "Request {} timed out", request_handle)
            }
            Self::Cancelled => write!(f, "Request cancelled"),
            Self::ServiceFault(status) => write!(f, "Service fault: {}", status),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decoding(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Decoding(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_converts() {
        let err: Error = CodecError::UnexpectedEof {
            offset: 3,
            needed: 4,
        }
        .into();
        assert!(matches!(err, Error::Decoding(_)));
        assert_eq!(err.status_code(), StatusCode::BadDecodingError);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_service_fault_is_not_fatal() {
        let fault = Error::ServiceFault(StatusCode::BadNodeIdUnknown);
        assert!(!fault.is_fatal());
        assert_eq!(fault.status_code(), StatusCode::BadNodeIdUnknown);
        assert!(Error::Transport("reset".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::RequestTimedOut { request_handle: 9 }.to_string(),
            "Request 9 timed out"
        );
        assert_eq!(
            Error::ServiceFault(StatusCode::BadTimeout).to_string(),
            "Service fault: BadTimeout (0x800A0000)"
        );
    }
}
