// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Well-known numeric node ids in namespace 0.

/// DefaultBinary encoding ids of the structures this stack exchanges.
pub mod encoding {
    pub const SERVICE_FAULT: u32 = 397;
    pub const ANONYMOUS_IDENTITY_TOKEN: u32 = 321;
    pub const USER_NAME_IDENTITY_TOKEN: u32 = 324;
    pub const OBJECT_ATTRIBUTES: u32 = 354;
    pub const VARIABLE_ATTRIBUTES: u32 = 357;

    pub const GET_ENDPOINTS_REQUEST: u32 = 428;
    pub const GET_ENDPOINTS_RESPONSE: u32 = 431;
    pub const OPEN_SECURE_CHANNEL_REQUEST: u32 = 446;
    pub const OPEN_SECURE_CHANNEL_RESPONSE: u32 = 449;
    pub const CLOSE_SECURE_CHANNEL_REQUEST: u32 = 452;
    pub const CLOSE_SECURE_CHANNEL_RESPONSE: u32 = 455;
    pub const CREATE_SESSION_REQUEST: u32 = 461;
    pub const CREATE_SESSION_RESPONSE: u32 = 464;
    pub const ACTIVATE_SESSION_REQUEST: u32 = 467;
    pub const ACTIVATE_SESSION_RESPONSE: u32 = 470;
    pub const CLOSE_SESSION_REQUEST: u32 = 473;
    pub const CLOSE_SESSION_RESPONSE: u32 = 476;
    pub const ADD_NODES_REQUEST: u32 = 488;
    pub const ADD_NODES_RESPONSE: u32 = 491;
    pub const BROWSE_REQUEST: u32 = 527;
    pub const BROWSE_RESPONSE: u32 = 530;
    pub const BROWSE_NEXT_REQUEST: u32 = 533;
    pub const BROWSE_NEXT_RESPONSE: u32 = 536;
    pub const READ_REQUEST: u32 = 631;
    pub const READ_RESPONSE: u32 = 634;
    pub const WRITE_REQUEST: u32 = 673;
    pub const WRITE_RESPONSE: u32 = 676;
    pub const CALL_REQUEST: u32 = 712;
    pub const CALL_RESPONSE: u32 = 715;
    pub const DATA_CHANGE_FILTER: u32 = 724;
    pub const CREATE_MONITORED_ITEMS_REQUEST: u32 = 751;
    pub const CREATE_MONITORED_ITEMS_RESPONSE: u32 = 754;
    pub const MODIFY_MONITORED_ITEMS_REQUEST: u32 = 763;
    pub const MODIFY_MONITORED_ITEMS_RESPONSE: u32 = 766;
    pub const SET_MONITORING_MODE_REQUEST: u32 = 769;
    pub const SET_MONITORING_MODE_RESPONSE: u32 = 772;
    pub const DELETE_MONITORED_ITEMS_REQUEST: u32 = 781;
    pub const DELETE_MONITORED_ITEMS_RESPONSE: u32 = 784;
    pub const CREATE_SUBSCRIPTION_REQUEST: u32 = 787;
    pub const CREATE_SUBSCRIPTION_RESPONSE: u32 = 790;
    pub const MODIFY_SUBSCRIPTION_REQUEST: u32 = 793;
    pub const MODIFY_SUBSCRIPTION_RESPONSE: u32 = 796;
    pub const SET_PUBLISHING_MODE_REQUEST: u32 = 799;
    pub const SET_PUBLISHING_MODE_RESPONSE: u32 = 802;
    pub const DATA_CHANGE_NOTIFICATION: u32 = 811;
    pub const STATUS_CHANGE_NOTIFICATION: u32 = 820;
    pub const PUBLISH_REQUEST: u32 = 826;
    pub const PUBLISH_RESPONSE: u32 = 829;
    pub const REPUBLISH_REQUEST: u32 = 832;
    pub const REPUBLISH_RESPONSE: u32 = 835;
    pub const DELETE_SUBSCRIPTIONS_REQUEST: u32 = 847;
    pub const DELETE_SUBSCRIPTIONS_RESPONSE: u32 = 850;
    pub const EVENT_NOTIFICATION_LIST: u32 = 916;
}

/// Standard objects.
pub mod object {
    pub const ROOT_FOLDER: u32 = 84;
    pub const OBJECTS_FOLDER: u32 = 85;
    pub const TYPES_FOLDER: u32 = 86;
    pub const VIEWS_FOLDER: u32 = 87;
    pub const SERVER: u32 = 2253;
}

/// Standard variables.
pub mod variable {
    pub const SERVER_NAMESPACE_ARRAY: u32 = 2255;
    pub const SERVER_SERVER_STATUS: u32 = 2256;
    pub const SERVER_SERVER_STATUS_CURRENT_TIME: u32 = 2258;
    pub const SERVER_SERVER_STATUS_STATE: u32 = 2259;
}

/// Data types.
pub mod data_type {
    /// Abstract root of all data types; built-in types 1..=25 share their ids.
    pub const BASE_DATA_TYPE: u32 = 24;
}

/// Object and variable types used as type definitions.
pub mod type_definition {
    pub const BASE_DATA_VARIABLE_TYPE: u32 = 63;
    pub const FOLDER_TYPE: u32 = 61;
    pub const PROPERTY_TYPE: u32 = 68;
}

/// Reference types.
pub mod reference_type {
    pub const REFERENCES: u32 = 31;
    pub const HIERARCHICAL_REFERENCES: u32 = 33;
    pub const HAS_CHILD: u32 = 34;
    pub const ORGANIZES: u32 = 35;
    pub const HAS_TYPE_DEFINITION: u32 = 40;
    pub const HAS_SUBTYPE: u32 = 45;
    pub const HAS_PROPERTY: u32 = 46;
    pub const HAS_COMPONENT: u32 = 47;
}

/// Node attributes (Part 6 Annex A.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AttributeId {
    NodeId = 1,
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Description = 5,
    WriteMask = 6,
    UserWriteMask = 7,
    IsAbstract = 8,
    Symmetric = 9,
    InverseName = 10,
    ContainsNoLoops = 11,
    EventNotifier = 12,
    Value = 13,
    DataType = 14,
    ValueRank = 15,
    ArrayDimensions = 16,
    AccessLevel = 17,
    UserAccessLevel = 18,
    MinimumSamplingInterval = 19,
    Historizing = 20,
    Executable = 21,
    UserExecutable = 22,
}

impl AttributeId {
    pub fn id(self) -> u32 {
        self as u32
    }
}
