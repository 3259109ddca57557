// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumerations used by the service set. All are Int32 on the wire.

use serde::Deserialize;

use crate::codec::impl_binary_enum;

/// Security applied to MSG chunks of a secure channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum MessageSecurityMode {
    Invalid,
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

impl_binary_enum!(MessageSecurityMode {
    Invalid = 0,
    None = 1,
    Sign = 2,
    SignAndEncrypt = 3,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityTokenRequestType {
    Issue,
    Renew,
}

impl_binary_enum!(SecurityTokenRequestType { Issue = 0, Renew = 1 });

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampsToReturn {
    Source,
    Server,
    #[default]
    Both,
    Neither,
}

impl_binary_enum!(TimestampsToReturn {
    Source = 0,
    Server = 1,
    Both = 2,
    Neither = 3,
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowseDirection {
    #[default]
    Forward,
    Inverse,
    Both,
}

impl_binary_enum!(BrowseDirection {
    Forward = 0,
    Inverse = 1,
    Both = 2,
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NodeClass {
    #[default]
    Unspecified,
    Object,
    Variable,
    Method,
    ObjectType,
    VariableType,
    ReferenceType,
    DataType,
    View,
}

impl_binary_enum!(NodeClass {
    Unspecified = 0,
    Object = 1,
    Variable = 2,
    Method = 4,
    ObjectType = 8,
    VariableType = 16,
    ReferenceType = 32,
    DataType = 64,
    View = 128,
});

impl NodeClass {
    /// Bit for a BrowseDescription node class mask.
    pub fn mask_bit(self) -> u32 {
        self.repr() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonitoringMode {
    Disabled,
    Sampling,
    #[default]
    Reporting,
}

impl_binary_enum!(MonitoringMode {
    Disabled = 0,
    Sampling = 1,
    Reporting = 2,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTokenType {
    Anonymous,
    UserName,
    Certificate,
    IssuedToken,
}

impl_binary_enum!(UserTokenType {
    Anonymous = 0,
    UserName = 1,
    Certificate = 2,
    IssuedToken = 3,
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplicationType {
    Server,
    #[default]
    Client,
    ClientAndServer,
    DiscoveryServer,
}

impl_binary_enum!(ApplicationType {
    Server = 0,
    Client = 1,
    ClientAndServer = 2,
    DiscoveryServer = 3,
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataChangeTrigger {
    Status,
    #[default]
    StatusValue,
    StatusValueTimestamp,
}

impl_binary_enum!(DataChangeTrigger {
    Status = 0,
    StatusValue = 1,
    StatusValueTimestamp = 2,
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeadbandType {
    #[default]
    None,
    Absolute,
    Percent,
}

impl_binary_enum!(DeadbandType : u32, read_u32, write_u32 {
    None = 0,
    Absolute = 1,
    Percent = 2,
});
