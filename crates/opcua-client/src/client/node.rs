// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Borrowed node handle with attribute, browse and AddNodes shortcuts.

use super::Client;
use crate::error::{Error, Result};
use crate::services::{
    attributes_mask, AddNodesItem, BrowseDescription, ObjectAttributes, ReferenceDescription,
    VariableAttributes, ACCESS_LEVEL_CURRENT_READ, ACCESS_LEVEL_CURRENT_WRITE,
    BROWSE_RESULT_MASK_ALL, VALUE_RANK_ONE_DIMENSION, VALUE_RANK_SCALAR,
};
use crate::types::{
    ids, AttributeId, BrowseDirection, DataValue, ExpandedNodeId, ExtensionObject,
    LocalizedText, NodeClass, NodeId, QualifiedName, StatusCode, Variant,
};

/// What [`Node::add_child`] creates.
enum NewChild {
    Folder,
    Variable(Variant),
    Property(Variant),
}

/// A node of the connected server's address space.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    client: &'a Client,
    id: NodeId,
}

impl<'a> Node<'a> {
    pub(crate) fn new(client: &'a Client, id: NodeId) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Value attribute; a bad status becomes `ServiceFault`.
    pub async fn value(&self) -> Result<Variant> {
        let value = self.attribute(AttributeId::Value).await?;
        good(value).map(|v| v.value.unwrap_or(Variant::Empty))
    }

    pub async fn set_value(&self, value: impl Into<Variant>) -> Result<()> {
        self.client.write_value(&self.id, value).await
    }

    /// Raw read of any attribute; the status is left to the caller.
    pub async fn attribute(&self, attribute: AttributeId) -> Result<DataValue> {
        self.client.read_attribute(&self.id, attribute).await
    }

    pub async fn set_attribute(&self, attribute: AttributeId, value: DataValue) -> Result<()> {
        self.client
            .write_attribute(&self.id, attribute, value)
            .await
    }

    pub async fn browse_name(&self) -> Result<QualifiedName> {
        match good(self.attribute(AttributeId::BrowseName).await?)?.value {
            Some(Variant::QualifiedName(name)) => Ok(name),
            _ => Err(Error::ServiceFault(StatusCode::BadTypeMismatch)),
        }
    }

    pub async fn display_name(&self) -> Result<LocalizedText> {
        match good(self.attribute(AttributeId::DisplayName).await?)?.value {
            Some(Variant::LocalizedText(text)) => Ok(text),
            _ => Err(Error::ServiceFault(StatusCode::BadTypeMismatch)),
        }
    }

    /// Forward hierarchical references, as descriptions.
    pub async fn references(&self) -> Result<Vec<ReferenceDescription>> {
        self.client
            .browse_all(BrowseDescription::children_of(self.id.clone()))
            .await
    }

    /// Hierarchical children on this server.
    pub async fn children(&self) -> Result<Vec<Node<'a>>> {
        Ok(self.local_nodes(self.references().await?, |_| true))
    }

    /// Children of class Variable.
    pub async fn variables(&self) -> Result<Vec<Node<'a>>> {
        Ok(self.local_nodes(self.references().await?, |r| {
            r.node_class == NodeClass::Variable
        }))
    }

    /// Targets of HasProperty references.
    pub async fn properties(&self) -> Result<Vec<Node<'a>>> {
        let description = BrowseDescription {
            node_id: self.id.clone(),
            browse_direction: BrowseDirection::Forward,
            reference_type_id: NodeId::ns0(ids::reference_type::HAS_PROPERTY),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: BROWSE_RESULT_MASK_ALL,
        };
        let references = self.client.browse_all(description).await?;
        Ok(self.local_nodes(references, |_| true))
    }

    /// Follow a `/`-separated path of browse names, e.g. `"2:Boiler/2:Drum"`.
    /// A missing segment yields `ServiceFault(BadNoMatch)`.
    pub async fn child(&self, path: &str) -> Result<Node<'a>> {
        let mut current = self.id.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let name: QualifiedName = segment.parse()?;
            let references = self
                .client
                .browse_all(BrowseDescription::children_of(current.clone()))
                .await?;
            current = references
                .into_iter()
                .find(|r| r.browse_name == name)
                .and_then(|r| r.node_id.as_local().cloned())
                .ok_or_else(|| {
                    log::debug!("[Client] no child '{}' under {}", segment, current);
                    Error::ServiceFault(StatusCode::BadNoMatch)
                })?;
        }
        Ok(Node::new(self.client, current))
    }

    /// Add a folder (FolderType, Organizes). `browse_name` is `"ns:name"`;
    /// without a prefix the namespace of this node is used.
    pub async fn add_folder(&self, browse_name: &str) -> Result<Node<'a>> {
        self.add_child(None, browse_name, NewChild::Folder).await
    }

    /// [`add_folder`](Self::add_folder) with a requested node id.
    pub async fn add_folder_with_id(&self, node_id: NodeId, browse_name: &str) -> Result<Node<'a>> {
        self.add_child(Some(node_id), browse_name, NewChild::Folder).await
    }

    /// Add a readable and writable variable (BaseDataVariableType, HasComponent).
    pub async fn add_variable(
        &self,
        browse_name: &str,
        value: impl Into<Variant>,
    ) -> Result<Node<'a>> {
        self.add_child(None, browse_name, NewChild::Variable(value.into())).await
    }

    pub async fn add_variable_with_id(
        &self,
        node_id: NodeId,
        browse_name: &str,
        value: impl Into<Variant>,
    ) -> Result<Node<'a>> {
        self.add_child(Some(node_id), browse_name, NewChild::Variable(value.into())).await
    }

    /// Add a property (PropertyType, HasProperty).
    pub async fn add_property(
        &self,
        browse_name: &str,
        value: impl Into<Variant>,
    ) -> Result<Node<'a>> {
        self.add_child(None, browse_name, NewChild::Property(value.into())).await
    }

    pub async fn add_property_with_id(
        &self,
        node_id: NodeId,
        browse_name: &str,
        value: impl Into<Variant>,
    ) -> Result<Node<'a>> {
        self.add_child(Some(node_id), browse_name, NewChild::Property(value.into())).await
    }

    async fn add_child(
        &self,
        requested: Option<NodeId>,
        browse_name: &str,
        child: NewChild,
    ) -> Result<Node<'a>> {
        let mut name: QualifiedName = browse_name.parse()?;
        if name.namespace_index == 0 && !browse_name.starts_with("0:") {
            name.namespace_index = self.id.namespace;
        }
        let display_name = LocalizedText::from(name.name.as_str());
        let (node_class, reference, type_definition, attributes) = match child {
            NewChild::Folder => (
                NodeClass::Object,
                ids::reference_type::ORGANIZES,
                ids::type_definition::FOLDER_TYPE,
                ExtensionObject::from_encodable(
                    NodeId::ns0(ids::encoding::OBJECT_ATTRIBUTES),
                    &ObjectAttributes {
                        specified_attributes: attributes_mask::DISPLAY_NAME,
                        display_name,
                        ..ObjectAttributes::default()
                    },
                ),
            ),
            NewChild::Variable(value) => (
                NodeClass::Variable,
                ids::reference_type::HAS_COMPONENT,
                ids::type_definition::BASE_DATA_VARIABLE_TYPE,
                variable_attributes(display_name, value),
            ),
            NewChild::Property(value) => (
                NodeClass::Variable,
                ids::reference_type::HAS_PROPERTY,
                ids::type_definition::PROPERTY_TYPE,
                variable_attributes(display_name, value),
            ),
        };
        let item = AddNodesItem {
            parent_node_id: ExpandedNodeId::from(self.id.clone()),
            reference_type_id: NodeId::ns0(reference),
            requested_new_node_id: requested.map(ExpandedNodeId::from).unwrap_or_default(),
            browse_name: name,
            node_class,
            node_attributes: attributes,
            type_definition: ExpandedNodeId::from(NodeId::ns0(type_definition)),
        };

        let result = self
            .client
            .add_nodes(std::slice::from_ref(&item))
            .await?
            .pop()
            .ok_or(Error::ServiceFault(StatusCode::BadUnexpectedError))?;
        if result.status_code.is_bad() {
            log::warn!(
                "[Client] adding '{}' under {} failed: {}",
                browse_name,
                self.id,
                result.status_code
            );
            return Err(Error::ServiceFault(result.status_code));
        }
        log::debug!("[Client] added {} under {}", result.added_node_id, self.id);
        Ok(Node::new(self.client, result.added_node_id))
    }

    fn local_nodes<F>(&self, references: Vec<ReferenceDescription>, keep: F) -> Vec<Node<'a>>
    where
        F: Fn(&ReferenceDescription) -> bool,
    {
        references
            .into_iter()
            .filter(|r| keep(r))
            .filter_map(|r| r.node_id.as_local().cloned())
            .map(|id| Node::new(self.client, id))
            .collect()
    }
}

/// Attributes of a new variable or property: data type and rank follow the
/// initial value, access is read/write.
fn variable_attributes(display_name: LocalizedText, value: Variant) -> ExtensionObject {
    let data_type = value
        .type_id()
        .map_or(ids::data_type::BASE_DATA_TYPE, |t| u32::from(t as u8));
    let value_rank = if value.is_array() {
        VALUE_RANK_ONE_DIMENSION
    } else {
        VALUE_RANK_SCALAR
    };
    let access = ACCESS_LEVEL_CURRENT_READ | ACCESS_LEVEL_CURRENT_WRITE;
    let attributes = VariableAttributes {
        specified_attributes: attributes_mask::DISPLAY_NAME
            | attributes_mask::VALUE
            | attributes_mask::DATA_TYPE
            | attributes_mask::VALUE_RANK
            | attributes_mask::ACCESS_LEVEL
            | attributes_mask::USER_ACCESS_LEVEL,
        display_name,
        description: LocalizedText::default(),
        write_mask: 0,
        user_write_mask: 0,
        value,
        data_type: NodeId::ns0(data_type),
        value_rank,
        array_dimensions: Vec::new(),
        access_level: access,
        user_access_level: access,
        minimum_sampling_interval: 0.0,
        historizing: false,
    };
    ExtensionObject::from_encodable(NodeId::ns0(ids::encoding::VARIABLE_ATTRIBUTES), &attributes)
}

fn good(value: DataValue) -> Result<DataValue> {
    let status = value.status();
    if status.is_bad() {
        return Err(Error::ServiceFault(status));
    }
    Ok(value)
}
