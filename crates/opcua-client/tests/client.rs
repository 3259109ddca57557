// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client façade against the in-process server.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{config, fault, ok_header, session_reply, MockServer, Reply, ServerOptions};
use opcua_client::codec::DecodingOptions;
use opcua_client::services::{
    AddNodesItem, AddNodesResponse, AddNodesResult, BrowseNextResponse, BrowseResponse,
    BrowseResult, CallMethodResult, CallResponse, EndpointDescription, GetEndpointsResponse,
    ObjectAttributes, ReadResponse, ReadValueId, ReferenceDescription, RequestMessage,
    ResponseMessage, VariableAttributes, WriteResponse,
};
use parking_lot::Mutex;
use opcua_client::types::{
    ids, ByteString, ExpandedNodeId, Identifier, LocalizedText, NodeClass, UaString,
};
use opcua_client::{
    AttributeId, Client, DataValue, Error, NodeId, QualifiedName, SessionState, StatusCode,
    TimestampsToReturn, Variant,
};

const MISSING: u32 = 404;
const READ_ONLY: u32 = 500;
const CONTINUATION: u8 = 7;

fn numeric(node_id: &NodeId) -> Option<u32> {
    match (&node_id.identifier, node_id.namespace) {
        (Identifier::Numeric(n), 2) => Some(*n),
        _ => None,
    }
}

fn read_one(item: &ReadValueId) -> DataValue {
    match numeric(&item.node_id) {
        Some(MISSING) | None => DataValue::with_status(StatusCode::BadNodeIdUnknown),
        Some(n) if item.attribute_id == AttributeId::BrowseName.id() => {
            DataValue::new(QualifiedName::new(2, format!("Item{}", n)))
        }
        Some(n) => DataValue::new(Variant::Int32(n as i32)),
    }
}

fn reference(n: u32, node_class: NodeClass) -> ReferenceDescription {
    ReferenceDescription {
        reference_type_id: NodeId::ns0(ids::reference_type::HAS_COMPONENT),
        is_forward: true,
        node_id: ExpandedNodeId::from(NodeId::numeric(2, n)),
        browse_name: QualifiedName::new(2, format!("Item{}", n)),
        display_name: LocalizedText::from(format!("Item {}", n).as_str()),
        node_class,
        type_definition: ExpandedNodeId::default(),
    }
}

/// Three children under Objects, served in two browse pages.
fn address_space(request: &RequestMessage) -> Reply {
    if let Some(response) = session_reply(request) {
        return response.into();
    }
    let response: ResponseMessage = match request {
        RequestMessage::Read(read) => ReadResponse {
            response_header: ok_header(request),
            results: read.nodes_to_read.iter().map(read_one).collect(),
            diagnostic_infos: Vec::new(),
        }
        .into(),
        RequestMessage::Write(write) => WriteResponse {
            response_header: ok_header(request),
            results: write
                .nodes_to_write
                .iter()
                .map(|w| match numeric(&w.node_id) {
                    Some(READ_ONLY) => StatusCode::BadWriteNotSupported,
                    _ => StatusCode::Good,
                })
                .collect(),
            diagnostic_infos: Vec::new(),
        }
        .into(),
        RequestMessage::Browse(browse) => BrowseResponse {
            response_header: ok_header(request),
            results: browse
                .nodes_to_browse
                .iter()
                .map(|_| BrowseResult {
                    status_code: StatusCode::Good,
                    continuation_point: ByteString::from(vec![CONTINUATION]),
                    references: vec![
                        reference(1, NodeClass::Object),
                        reference(2, NodeClass::Object),
                    ],
                })
                .collect(),
            diagnostic_infos: Vec::new(),
        }
        .into(),
        RequestMessage::BrowseNext(next) => BrowseNextResponse {
            response_header: ok_header(request),
            results: next
                .continuation_points
                .iter()
                .map(|_| BrowseResult {
                    status_code: StatusCode::Good,
                    continuation_point: ByteString::null(),
                    references: vec![reference(3, NodeClass::Variable)],
                })
                .collect(),
            diagnostic_infos: Vec::new(),
        }
        .into(),
        RequestMessage::Call(call) => CallResponse {
            response_header: ok_header(request),
            results: call
                .methods_to_call
                .iter()
                .map(|m| CallMethodResult {
                    status_code: StatusCode::Good,
                    input_argument_results: Vec::new(),
                    input_argument_diagnostic_infos: Vec::new(),
                    output_arguments: m.input_arguments.iter().rev().cloned().collect(),
                })
                .collect(),
            diagnostic_infos: Vec::new(),
        }
        .into(),
        RequestMessage::GetEndpoints(get) => GetEndpointsResponse {
            response_header: ok_header(request),
            endpoints: vec![EndpointDescription {
                endpoint_url: get.endpoint_url.clone(),
                ..EndpointDescription::default()
            }],
        }
        .into(),
        _ => fault(request, StatusCode::BadServiceUnsupported),
    };
    response.into()
}

async fn connected<F>(options: ServerOptions, handler: F) -> (Client, MockServer)
where
    F: Fn(&RequestMessage) -> Reply + Send + Sync + 'static,
{
    connected_with(config(), options, handler).await
}

async fn connected_with<F>(
    config: opcua_client::ClientConfig,
    options: ServerOptions,
    handler: F,
) -> (Client, MockServer)
where
    F: Fn(&RequestMessage) -> Reply + Send + Sync + 'static,
{
    let (stream, server) = MockServer::start(options, handler);
    let client = Client::new(config).unwrap();
    client.connect_with(stream).await.unwrap();
    (client, server)
}

#[tokio::test]
async fn test_end_to_end_services() {
    let (client, _server) = connected(ServerOptions::default(), address_space).await;
    assert_eq!(client.state(), SessionState::Activated);

    let value = client.read_value(&NodeId::numeric(2, 17)).await.unwrap();
    assert_eq!(value.value(), &Variant::Int32(17));

    let values = client
        .read(
            &[
                ReadValueId::new(NodeId::numeric(2, 1), AttributeId::Value),
                ReadValueId::new(NodeId::numeric(2, MISSING), AttributeId::Value),
            ],
            TimestampsToReturn::Neither,
        )
        .await
        .unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1].status(), StatusCode::BadNodeIdUnknown);

    client
        .write_value(&NodeId::numeric(2, 5), 12.5f64)
        .await
        .unwrap();
    assert_eq!(
        client
            .write_value(&NodeId::numeric(2, READ_ONLY), 1i32)
            .await,
        Err(Error::ServiceFault(StatusCode::BadWriteNotSupported))
    );

    let outputs = client
        .call_method(
            &NodeId::numeric(2, 100),
            &NodeId::numeric(2, 101),
            vec![Variant::Int32(1), Variant::from("two")],
        )
        .await
        .unwrap();
    assert_eq!(outputs, vec![Variant::from("two"), Variant::Int32(1)]);

    let endpoints = client.get_endpoints().await.unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].endpoint_url, UaString::from(common::ENDPOINT));

    let channel = Arc::clone(client.session().unwrap().channel());
    assert_eq!(channel.pending_count(), 0);
    client.disconnect().await.unwrap();
    assert!(!channel.state().is_operational());
    assert_eq!(client.state(), SessionState::Closed);
    assert_eq!(
        client.read_value(&NodeId::numeric(2, 17)).await,
        Err(Error::ServiceFault(StatusCode::BadServerNotConnected))
    );
}

#[tokio::test]
async fn test_browse_follows_continuation_points() {
    let (client, _server) = connected(ServerOptions::default(), address_space).await;

    let objects = client.objects_node();
    let children = objects.children().await.unwrap();
    let ids: Vec<NodeId> = children.iter().map(|n| n.id().clone()).collect();
    assert_eq!(
        ids,
        vec![
            NodeId::numeric(2, 1),
            NodeId::numeric(2, 2),
            NodeId::numeric(2, 3)
        ]
    );

    let variables = objects.variables().await.unwrap();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].value().await.unwrap(), Variant::Int32(3));

    let item = objects.child("2:Item2").await.unwrap();
    assert_eq!(item.id(), &NodeId::numeric(2, 2));
    assert_eq!(
        item.browse_name().await.unwrap(),
        QualifiedName::new(2, "Item2")
    );
    assert!(matches!(
        objects.child("2:Nope").await,
        Err(Error::ServiceFault(StatusCode::BadNoMatch))
    ));
}

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let handler = |request: &RequestMessage| match address_space(request) {
        Reply::Now(response) if matches!(request, RequestMessage::Read(_)) => {
            Reply::After(Duration::from_millis(fastrand::u64(0..40)), response)
        }
        reply => reply,
    };
    let (client, _server) = connected(ServerOptions::default(), handler).await;
    let client = Arc::new(client);

    let mut tasks = Vec::new();
    for n in 1..=40u32 {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            let value = client.read_value(&NodeId::numeric(2, n)).await.unwrap();
            (n, value)
        }));
    }
    for task in tasks {
        let (n, value) = task.await.unwrap();
        assert_eq!(value.value(), &Variant::Int32(n as i32));
    }
    let session = client.session().unwrap();
    assert_eq!(session.channel().pending_count(), 0);
}

#[tokio::test]
async fn test_request_timeout_clears_pending_entry() {
    let handler = |request: &RequestMessage| match request {
        RequestMessage::Read(_) => Reply::Never,
        _ => address_space(request),
    };
    let config = config().with_request_timeout(Duration::from_millis(100));
    let (client, _server) = connected_with(config, ServerOptions::default(), handler).await;

    let started = Instant::now();
    let result = client.read_value(&NodeId::numeric(2, 1)).await;
    let elapsed = started.elapsed();
    assert!(matches!(result, Err(Error::RequestTimedOut { .. })), "{:?}", result);
    assert!(elapsed >= Duration::from_millis(100), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "{:?}", elapsed);

    let session = client.session().unwrap();
    assert_eq!(session.channel().pending_count(), 0);
    // Later calls on the same session still work.
    assert!(client
        .write_value(&NodeId::numeric(2, 1), 3i32)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_multi_chunk_response_is_reassembled() {
    let big = "x".repeat(100_000);
    let expected = big.clone();
    let handler = move |request: &RequestMessage| match request {
        RequestMessage::Read(read) => ResponseMessage::from(ReadResponse {
            response_header: ok_header(request),
            results: read
                .nodes_to_read
                .iter()
                .map(|_| DataValue::new(big.as_str()))
                .collect(),
            diagnostic_infos: Vec::new(),
        })
        .into(),
        _ => address_space(request),
    };
    let options = ServerOptions {
        send_buffer_size: 8192,
    };
    let (client, _server) = connected(options, handler).await;

    let value = client.read_value(&NodeId::numeric(2, 1)).await.unwrap();
    assert_eq!(value.value(), &Variant::from(expected.as_str()));
}

#[tokio::test]
async fn test_not_connected() {
    let client = Client::new(config()).unwrap();
    assert_eq!(client.state(), SessionState::Closed);
    assert!(!client.is_connected());
    assert!(matches!(
        client.session(),
        Err(Error::ServiceFault(StatusCode::BadServerNotConnected))
    ));
    client.disconnect().await.unwrap();
}

/// AddNodes: assigns ns=2;i=1000.. unless an id is requested; rejects "Dup".
fn node_manager(
    added: Arc<Mutex<Vec<AddNodesItem>>>,
) -> impl Fn(&RequestMessage) -> Reply + Send + Sync + 'static {
    move |request| match request {
        RequestMessage::AddNodes(add) => {
            let mut added = added.lock();
            let results = add
                .nodes_to_add
                .iter()
                .map(|item| {
                    if item.browse_name.name.as_str() == "Dup" {
                        return AddNodesResult {
                            status_code: StatusCode::BadBrowseNameDuplicated,
                            added_node_id: NodeId::null(),
                        };
                    }
                    let id = match item.requested_new_node_id.as_local() {
                        Some(id) if !id.is_null() => id.clone(),
                        _ => NodeId::numeric(2, 1000 + added.len() as u32),
                    };
                    added.push(item.clone());
                    AddNodesResult {
                        status_code: StatusCode::Good,
                        added_node_id: id,
                    }
                })
                .collect();
            ResponseMessage::from(AddNodesResponse {
                response_header: ok_header(request),
                results,
                diagnostic_infos: Vec::new(),
            })
            .into()
        }
        _ => address_space(request),
    }
}

#[tokio::test]
async fn test_add_folder_variable_and_property() {
    let added = Arc::new(Mutex::new(Vec::new()));
    let (client, _server) =
        connected(ServerOptions::default(), node_manager(Arc::clone(&added))).await;
    let options = DecodingOptions::default();

    let folder = client.objects_node().add_folder("2:Plant").await.unwrap();
    assert_eq!(folder.id(), &NodeId::numeric(2, 1000));
    let speed = folder.add_variable("Speed", 12.5f64).await.unwrap();
    assert_eq!(speed.id(), &NodeId::numeric(2, 1001));
    let unit = folder
        .add_property_with_id(NodeId::string(2, "Plant.Unit"), "2:Unit", "rpm")
        .await
        .unwrap();
    assert_eq!(unit.id(), &NodeId::string(2, "Plant.Unit"));

    let added = added.lock().clone();
    assert_eq!(added.len(), 3);

    let item = &added[0];
    assert_eq!(item.parent_node_id.as_local(), Some(&NodeId::ns0(ids::object::OBJECTS_FOLDER)));
    assert_eq!(item.reference_type_id, NodeId::ns0(ids::reference_type::ORGANIZES));
    assert_eq!(item.node_class, NodeClass::Object);
    assert_eq!(
        item.type_definition.as_local(),
        Some(&NodeId::ns0(ids::type_definition::FOLDER_TYPE))
    );
    assert!(item.requested_new_node_id.node_id.is_null());
    let attributes: ObjectAttributes = item.node_attributes.decode_inner(options).unwrap();
    assert_eq!(attributes.display_name, LocalizedText::from("Plant"));

    // Bare browse names take the parent's namespace.
    let item = &added[1];
    assert_eq!(item.parent_node_id.as_local(), Some(&NodeId::numeric(2, 1000)));
    assert_eq!(item.browse_name, QualifiedName::new(2, "Speed"));
    assert_eq!(item.reference_type_id, NodeId::ns0(ids::reference_type::HAS_COMPONENT));
    assert_eq!(item.node_class, NodeClass::Variable);
    let attributes: VariableAttributes = item.node_attributes.decode_inner(options).unwrap();
    assert_eq!(attributes.value, Variant::Double(12.5));
    assert_eq!(attributes.data_type, NodeId::ns0(11));
    assert_eq!(attributes.value_rank, -1);

    let item = &added[2];
    assert_eq!(item.reference_type_id, NodeId::ns0(ids::reference_type::HAS_PROPERTY));
    assert_eq!(
        item.type_definition.as_local(),
        Some(&NodeId::ns0(ids::type_definition::PROPERTY_TYPE))
    );
    let attributes: VariableAttributes = item.node_attributes.decode_inner(options).unwrap();
    assert_eq!(attributes.value, Variant::from("rpm"));
    assert_eq!(attributes.data_type, NodeId::ns0(12));

    assert!(matches!(
        client.objects_node().add_folder("2:Dup").await,
        Err(Error::ServiceFault(StatusCode::BadBrowseNameDuplicated))
    ));
}
