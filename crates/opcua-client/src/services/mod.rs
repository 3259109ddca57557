// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service request/response structures.
//!
//! On the wire every service message is prefixed by the NodeId of its
//! DefaultBinary encoding. [`RequestMessage`] and [`ResponseMessage`] wrap the
//! concrete structures and handle that prefix; [`ServiceRequest`] ties each
//! request type to its response type.

mod attribute;
mod channel;
mod discovery;
mod method;
mod monitored_item;
mod node_management;
mod session;
mod subscription;
mod view;

pub use attribute::*;
pub use channel::*;
pub use discovery::*;
pub use method::*;
pub use monitored_item::*;
pub use node_management::*;
pub use session::*;
pub use subscription::*;
pub use view::*;

use crate::codec::{
    impl_binary_struct, BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError,
    CodecResult,
};
use crate::error::Error;
use crate::types::{
    ids, DateTime, DiagnosticInfo, ExtensionObject, NodeId, StatusCode, UaString,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeader {
    pub authentication_token: NodeId,
    pub timestamp: DateTime,
    pub request_handle: u32,
    pub return_diagnostics: u32,
    pub audit_entry_id: UaString,
    /// Milliseconds; 0 means no hint.
    pub timeout_hint: u32,
    pub additional_header: ExtensionObject,
}

impl_binary_struct!(RequestHeader {
    authentication_token,
    timestamp,
    request_handle,
    return_diagnostics,
    audit_entry_id,
    timeout_hint,
    additional_header,
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeader {
    pub timestamp: DateTime,
    pub request_handle: u32,
    pub service_result: StatusCode,
    pub service_diagnostics: DiagnosticInfo,
    pub string_table: Vec<UaString>,
    pub additional_header: ExtensionObject,
}

impl_binary_struct!(ResponseHeader {
    timestamp,
    request_handle,
    service_result,
    service_diagnostics,
    string_table,
    additional_header,
});

impl ResponseHeader {
    pub fn new(request_handle: u32, service_result: StatusCode) -> Self {
        Self {
            timestamp: DateTime::now(),
            request_handle,
            service_result,
            ..Self::default()
        }
    }
}

/// Sent by the server instead of the expected response when a service fails as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFault {
    pub response_header: ResponseHeader,
}

impl_binary_struct!(ServiceFault { response_header });

macro_rules! message_enum {
    ($name:ident, $header:ty, $field:ident { $($variant:ident($ty:ty) = $id:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $( $variant($ty), )+
        }

        impl $name {
            /// Numeric DefaultBinary encoding id (namespace 0).
            pub fn encoding_id(&self) -> u32 {
                match self {
                    $( Self::$variant(_) => ids::encoding::$id, )+
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => stringify!($variant), )+
                }
            }

            pub fn header(&self) -> &$header {
                match self {
                    $( Self::$variant(m) => &m.$field, )+
                }
            }

            pub fn header_mut(&mut self) -> &mut $header {
                match self {
                    $( Self::$variant(m) => &mut m.$field, )+
                }
            }
        }

        impl BinaryEncode for $name {
            fn encode(&self, writer: &mut BinaryWriter) {
                NodeId::ns0(self.encoding_id()).encode(writer);
                match self {
                    $( Self::$variant(m) => m.encode(writer), )+
                }
            }
        }

        impl BinaryDecode for $name {
            fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
                let type_id = NodeId::decode(reader)?;
                let id = type_id.as_ns0().ok_or_else(|| {
                    CodecError::InvalidData(format!("message type {} is not a standard encoding", type_id))
                })?;
                match id {
                    $( ids::encoding::$id => Ok(Self::$variant(<$ty>::decode(reader)?)), )+
                    other => Err(CodecError::UnknownEncoding {
                        what: stringify!($name),
                        value: other,
                    }),
                }
            }
        }

        $(
            impl From<$ty> for $name {
                fn from(message: $ty) -> Self {
                    Self::$variant(message)
                }
            }

            impl TryFrom<$name> for $ty {
                type Error = $name;

                fn try_from(message: $name) -> Result<Self, $name> {
                    match message {
                        $name::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

message_enum!(RequestMessage, RequestHeader, request_header {
    OpenSecureChannel(OpenSecureChannelRequest) = OPEN_SECURE_CHANNEL_REQUEST,
    CloseSecureChannel(CloseSecureChannelRequest) = CLOSE_SECURE_CHANNEL_REQUEST,
    GetEndpoints(GetEndpointsRequest) = GET_ENDPOINTS_REQUEST,
    CreateSession(CreateSessionRequest) = CREATE_SESSION_REQUEST,
    ActivateSession(ActivateSessionRequest) = ACTIVATE_SESSION_REQUEST,
    CloseSession(CloseSessionRequest) = CLOSE_SESSION_REQUEST,
    Read(ReadRequest) = READ_REQUEST,
    Write(WriteRequest) = WRITE_REQUEST,
    Browse(BrowseRequest) = BROWSE_REQUEST,
    BrowseNext(BrowseNextRequest) = BROWSE_NEXT_REQUEST,
    Call(CallRequest) = CALL_REQUEST,
    AddNodes(AddNodesRequest) = ADD_NODES_REQUEST,
    CreateSubscription(CreateSubscriptionRequest) = CREATE_SUBSCRIPTION_REQUEST,
    ModifySubscription(ModifySubscriptionRequest) = MODIFY_SUBSCRIPTION_REQUEST,
    SetPublishingMode(SetPublishingModeRequest) = SET_PUBLISHING_MODE_REQUEST,
    DeleteSubscriptions(DeleteSubscriptionsRequest) = DELETE_SUBSCRIPTIONS_REQUEST,
    CreateMonitoredItems(CreateMonitoredItemsRequest) = CREATE_MONITORED_ITEMS_REQUEST,
    ModifyMonitoredItems(ModifyMonitoredItemsRequest) = MODIFY_MONITORED_ITEMS_REQUEST,
    SetMonitoringMode(SetMonitoringModeRequest) = SET_MONITORING_MODE_REQUEST,
    DeleteMonitoredItems(DeleteMonitoredItemsRequest) = DELETE_MONITORED_ITEMS_REQUEST,
    Publish(PublishRequest) = PUBLISH_REQUEST,
    Republish(RepublishRequest) = REPUBLISH_REQUEST,
});

message_enum!(ResponseMessage, ResponseHeader, response_header {
    ServiceFault(ServiceFault) = SERVICE_FAULT,
    OpenSecureChannel(OpenSecureChannelResponse) = OPEN_SECURE_CHANNEL_RESPONSE,
    CloseSecureChannel(CloseSecureChannelResponse) = CLOSE_SECURE_CHANNEL_RESPONSE,
    GetEndpoints(GetEndpointsResponse) = GET_ENDPOINTS_RESPONSE,
    CreateSession(CreateSessionResponse) = CREATE_SESSION_RESPONSE,
    ActivateSession(ActivateSessionResponse) = ACTIVATE_SESSION_RESPONSE,
    CloseSession(CloseSessionResponse) = CLOSE_SESSION_RESPONSE,
    Read(ReadResponse) = READ_RESPONSE,
    Write(WriteResponse) = WRITE_RESPONSE,
    Browse(BrowseResponse) = BROWSE_RESPONSE,
    BrowseNext(BrowseNextResponse) = BROWSE_NEXT_RESPONSE,
    Call(CallResponse) = CALL_RESPONSE,
    AddNodes(AddNodesResponse) = ADD_NODES_RESPONSE,
    CreateSubscription(CreateSubscriptionResponse) = CREATE_SUBSCRIPTION_RESPONSE,
    ModifySubscription(ModifySubscriptionResponse) = MODIFY_SUBSCRIPTION_RESPONSE,
    SetPublishingMode(SetPublishingModeResponse) = SET_PUBLISHING_MODE_RESPONSE,
    DeleteSubscriptions(DeleteSubscriptionsResponse) = DELETE_SUBSCRIPTIONS_RESPONSE,
    CreateMonitoredItems(CreateMonitoredItemsResponse) = CREATE_MONITORED_ITEMS_RESPONSE,
    ModifyMonitoredItems(ModifyMonitoredItemsResponse) = MODIFY_MONITORED_ITEMS_RESPONSE,
    SetMonitoringMode(SetMonitoringModeResponse) = SET_MONITORING_MODE_RESPONSE,
    DeleteMonitoredItems(DeleteMonitoredItemsResponse) = DELETE_MONITORED_ITEMS_RESPONSE,
    Publish(PublishResponse) = PUBLISH_RESPONSE,
    Republish(RepublishResponse) = REPUBLISH_RESPONSE,
});

impl ResponseMessage {
    /// Service-level result: the fault code for a ServiceFault, otherwise the header's result.
    pub fn service_result(&self) -> StatusCode {
        self.header().service_result
    }

    pub fn request_handle(&self) -> u32 {
        self.header().request_handle
    }

    /// Unwrap the expected response structure.
    ///
    /// ServiceFaults and bad service results become [`Error::ServiceFault`];
    /// any other response type is a decoding error.
    pub fn into_response<T>(self) -> crate::Result<T>
    where
        T: TryFrom<ResponseMessage, Error = ResponseMessage>,
    {
        let status = self.service_result();
        if status.is_bad() {
            return Err(Error::ServiceFault(status));
        }
        T::try_from(self).map_err(|other| {
            Error::Decoding(CodecError::InvalidData(format!(
                "unexpected {} response",
                other.name()
            )))
        })
    }
}

/// A request structure with a known response structure.
pub trait ServiceRequest: Into<RequestMessage> {
    type Response: TryFrom<ResponseMessage, Error = ResponseMessage>;
}

macro_rules! service_pairs {
    ($($request:ty => $response:ty),+ $(,)?) => {
        $(
            impl ServiceRequest for $request {
                type Response = $response;
            }
        )+
    };
}

service_pairs! {
    OpenSecureChannelRequest => OpenSecureChannelResponse,
    GetEndpointsRequest => GetEndpointsResponse,
    CreateSessionRequest => CreateSessionResponse,
    ActivateSessionRequest => ActivateSessionResponse,
    CloseSessionRequest => CloseSessionResponse,
    ReadRequest => ReadResponse,
    WriteRequest => WriteResponse,
    BrowseRequest => BrowseResponse,
    BrowseNextRequest => BrowseNextResponse,
    CallRequest => CallResponse,
    AddNodesRequest => AddNodesResponse,
    CreateSubscriptionRequest => CreateSubscriptionResponse,
    ModifySubscriptionRequest => ModifySubscriptionResponse,
    SetPublishingModeRequest => SetPublishingModeResponse,
    DeleteSubscriptionsRequest => DeleteSubscriptionsResponse,
    CreateMonitoredItemsRequest => CreateMonitoredItemsResponse,
    ModifyMonitoredItemsRequest => ModifyMonitoredItemsResponse,
    SetMonitoringModeRequest => SetMonitoringModeResponse,
    DeleteMonitoredItemsRequest => DeleteMonitoredItemsResponse,
    PublishRequest => PublishResponse,
    RepublishRequest => RepublishResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeId, DataValue, TimestampsToReturn, Variant};

    fn read_request() -> ReadRequest {
        ReadRequest {
            request_header: RequestHeader {
                request_handle: 42,
                timeout_hint: 5_000,
                ..RequestHeader::default()
            },
            max_age: 0.0,
            timestamps_to_return: TimestampsToReturn::Both,
            nodes_to_read: vec![ReadValueId::new(NodeId::string(2, "T"), AttributeId::Value)],
        }
    }

    #[test]
    fn test_request_message_prefix() {
        let message = RequestMessage::from(read_request());
        let bytes = message.encode_to_vec();
        // FourByte NodeId 631 = 0x0277.
        assert_eq!(&bytes[..4], &[0x01, 0x00, 0x77, 0x02]);
        let decoded = RequestMessage::decode_from_slice(&bytes).unwrap();
        assert_eq!(decoded.header().request_handle, 42);
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_response_try_from() {
        let response = ResponseMessage::from(ReadResponse {
            response_header: ResponseHeader::new(7, StatusCode::Good),
            results: vec![DataValue::new(Variant::Double(1.5))],
            diagnostic_infos: Vec::new(),
        });
        let bytes = response.encode_to_vec();
        let decoded = ResponseMessage::decode_from_slice(&bytes).unwrap();
        assert_eq!(decoded.request_handle(), 7);
        let read = ReadResponse::try_from(decoded).unwrap();
        assert_eq!(read.results[0].value().as_f64(), Some(1.5));

        let fault = ResponseMessage::from(ServiceFault {
            response_header: ResponseHeader::new(7, StatusCode::BadNodeIdUnknown),
        });
        assert_eq!(fault.service_result(), StatusCode::BadNodeIdUnknown);
        assert!(ReadResponse::try_from(fault).is_err());
    }

    #[test]
    fn test_unknown_message_type() {
        let mut writer = BinaryWriter::new();
        NodeId::ns0(9999).encode(&mut writer);
        assert!(matches!(
            ResponseMessage::decode_from_slice(writer.as_slice()),
            Err(CodecError::UnknownEncoding { value: 9999, .. })
        ));
    }

    #[test]
    fn test_every_truncation_fails() {
        let bytes = RequestMessage::from(read_request()).encode_to_vec();
        for len in 0..bytes.len() {
            assert!(
                RequestMessage::decode_from_slice(&bytes[..len]).is_err(),
                "prefix of {} bytes decoded",
                len
            );
        }
    }
}
