// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;

use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecResult};

/// OPC UA StatusCode.
///
/// Bits 31..30 carry the severity (`00` Good, `01` Uncertain, `10`/`11` Bad),
/// bits 29..16 the sub-code, the low 16 bits are info flags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u32);

const SEVERITY_MASK: u32 = 0xC000_0000;
const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
const CODE_MASK: u32 = 0xFFFF_0000;

macro_rules! status_codes {
    ($( $konst:ident = $value:expr ),+ $(,)?) => {
        #[allow(non_upper_case_globals)]
        impl StatusCode {
            $( pub const $konst: StatusCode = StatusCode($value); )+

            /// Symbolic name of a known code (info bits ignored).
            pub fn name(self) -> Option<&'static str> {
                match self.0 & CODE_MASK {
                    $( v if v == $value => Some(stringify!($konst)), )+
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    Good = 0x0000_0000,
    Uncertain = 0x4000_0000,
    Bad = 0x8000_0000,
    BadUnexpectedError = 0x8001_0000,
    BadInternalError = 0x8002_0000,
    BadOutOfMemory = 0x8003_0000,
    BadResourceUnavailable = 0x8004_0000,
    BadCommunicationError = 0x8005_0000,
    BadEncodingError = 0x8006_0000,
    BadDecodingError = 0x8007_0000,
    BadEncodingLimitsExceeded = 0x8008_0000,
    BadRequestTooLarge = 0x80B8_0000,
    BadResponseTooLarge = 0x80B9_0000,
    BadUnknownResponse = 0x8009_0000,
    BadTimeout = 0x800A_0000,
    BadServiceUnsupported = 0x800B_0000,
    BadShutdown = 0x800C_0000,
    BadServerNotConnected = 0x800D_0000,
    BadServerHalted = 0x800E_0000,
    BadNothingToDo = 0x800F_0000,
    BadTooManyOperations = 0x8010_0000,
    BadDataTypeIdUnknown = 0x8011_0000,
    BadCertificateInvalid = 0x8012_0000,
    BadSecurityChecksFailed = 0x8013_0000,
    BadCertificateUntrusted = 0x801A_0000,
    BadUserAccessDenied = 0x801F_0000,
    BadIdentityTokenInvalid = 0x8020_0000,
    BadIdentityTokenRejected = 0x8021_0000,
    BadSecureChannelIdInvalid = 0x8022_0000,
    BadInvalidTimestamp = 0x8023_0000,
    BadNonceInvalid = 0x8024_0000,
    BadSessionIdInvalid = 0x8025_0000,
    BadSessionClosed = 0x8026_0000,
    BadSessionNotActivated = 0x8027_0000,
    BadSubscriptionIdInvalid = 0x8028_0000,
    BadRequestHeaderInvalid = 0x802A_0000,
    BadTimestampsToReturnInvalid = 0x802B_0000,
    BadRequestCancelledByClient = 0x802C_0000,
    BadNodeIdInvalid = 0x8033_0000,
    BadNodeIdUnknown = 0x8034_0000,
    BadAttributeIdInvalid = 0x8035_0000,
    BadIndexRangeInvalid = 0x8036_0000,
    BadIndexRangeNoData = 0x8037_0000,
    BadDataEncodingInvalid = 0x8038_0000,
    BadDataEncodingUnsupported = 0x8039_0000,
    BadNotReadable = 0x803A_0000,
    BadNotWritable = 0x803B_0000,
    BadOutOfRange = 0x803C_0000,
    BadNotSupported = 0x803D_0000,
    BadNotFound = 0x803E_0000,
    BadMonitoringModeInvalid = 0x8041_0000,
    BadMonitoredItemIdInvalid = 0x8042_0000,
    BadMonitoredItemFilterInvalid = 0x8043_0000,
    BadFilterNotAllowed = 0x8045_0000,
    BadContinuationPointInvalid = 0x804A_0000,
    BadNoContinuationPoints = 0x804B_0000,
    BadReferenceTypeIdInvalid = 0x804C_0000,
    BadBrowseDirectionInvalid = 0x804D_0000,
    BadNodeNotInView = 0x804E_0000,
    BadServerUriInvalid = 0x804F_0000,
    BadSecurityModeRejected = 0x8054_0000,
    BadSecurityPolicyRejected = 0x8055_0000,
    BadTooManySessions = 0x8056_0000,
    BadUserSignatureInvalid = 0x8057_0000,
    BadApplicationSignatureInvalid = 0x8058_0000,
    BadNoValidCertificates = 0x8059_0000,
    BadRequestCancelledByRequest = 0x805A_0000,
    BadMethodInvalid = 0x8075_0000,
    BadArgumentsMissing = 0x8076_0000,
    BadTooManySubscriptions = 0x8077_0000,
    BadTooManyPublishRequests = 0x8078_0000,
    BadNoSubscription = 0x8079_0000,
    BadSequenceNumberUnknown = 0x807A_0000,
    BadMessageNotAvailable = 0x807B_0000,
    BadInsufficientClientProfile = 0x807C_0000,
    BadTcpServerTooBusy = 0x807D_0000,
    BadTcpMessageTypeInvalid = 0x807E_0000,
    BadTcpSecureChannelUnknown = 0x807F_0000,
    BadTcpMessageTooLarge = 0x8080_0000,
    BadTcpNotEnoughResources = 0x8081_0000,
    BadTcpInternalError = 0x8082_0000,
    BadTcpEndpointUrlInvalid = 0x8083_0000,
    BadRequestInterrupted = 0x8084_0000,
    BadRequestTimeout = 0x8085_0000,
    BadSecureChannelClosed = 0x8086_0000,
    BadSecureChannelTokenUnknown = 0x8087_0000,
    BadSequenceNumberInvalid = 0x8088_0000,
    BadProtocolVersionUnsupported = 0x80BE_0000,
    BadConnectionRejected = 0x80AC_0000,
    BadDisconnect = 0x80AD_0000,
    BadConnectionClosed = 0x80AE_0000,
    BadInvalidState = 0x80AF_0000,
    BadTypeMismatch = 0x8074_0000,
    BadWriteNotSupported = 0x8073_0000,
    BadInvalidArgument = 0x80AB_0000,
    BadNoMatch = 0x806F_0000,
    BadBrowseNameDuplicated = 0x8061_0000,
    BadMaxConnectionsReached = 0x80B7_0000,
    GoodSubscriptionTransferred = 0x002D_0000,
    GoodCompletesAsynchronously = 0x002E_0000,
    GoodOverload = 0x002F_0000,
    GoodClamped = 0x0030_0000,
}

impl StatusCode {
    pub fn is_good(self) -> bool {
        self.0 & SEVERITY_MASK == 0
    }

    pub fn is_uncertain(self) -> bool {
        self.0 & SEVERITY_MASK == SEVERITY_UNCERTAIN
    }

    /// Both `10` and `11` severities count as Bad.
    pub fn is_bad(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// The code without its info bits.
    pub fn code(self) -> StatusCode {
        StatusCode(self.0 & CODE_MASK)
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl BinaryEncode for StatusCode {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.0);
    }
}

impl BinaryDecode for StatusCode {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        reader.read_u32().map(Self)
    }
}
