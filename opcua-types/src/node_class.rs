// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! `NodeClass`, `AttributeId` and the bit-mask attributes (`AccessLevel`,
//! `WriteMask`, `EventNotifier`) shared by every node in the address space.

use bitflags::bitflags;

/// The class of a node in the address space. Encoded on the wire as the bit
/// mask below rather than a plain ordinal, so that a single `NodeClass` value
/// can be used as a mask selecting several classes at once (e.g. in browse
/// filters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NodeClass {
    /// No node class, or an unspecified mask matching any class.
    Unspecified = 0,
    /// An `Object` node.
    Object = 1,
    /// A `Variable` node.
    Variable = 2,
    /// A `Method` node.
    Method = 4,
    /// An `ObjectType` node.
    ObjectType = 8,
    /// A `VariableType` node.
    VariableType = 16,
    /// A `ReferenceType` node.
    ReferenceType = 32,
    /// A `DataType` node.
    DataType = 64,
    /// A `View` node.
    View = 128,
}

impl NodeClass {
    /// Recover a `NodeClass` from its wire representation, if valid.
    pub fn from_i32(v: i32) -> Option<NodeClass> {
        Some(match v {
            0 => NodeClass::Unspecified,
            1 => NodeClass::Object,
            2 => NodeClass::Variable,
            4 => NodeClass::Method,
            8 => NodeClass::ObjectType,
            16 => NodeClass::VariableType,
            32 => NodeClass::ReferenceType,
            64 => NodeClass::DataType,
            128 => NodeClass::View,
            _ => return None,
        })
    }
}

/// Identifies one of the attributes that may be read or written on a node.
/// Numbering matches the OPC UA `Attributes` identifiers so that a generated
/// codec can map directly between the two without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AttributeId {
    /// The node id of the node.
    NodeId = 1,
    /// The node class of the node.
    NodeClass,
    /// The browse name of the node.
    BrowseName,
    /// The display name of the node.
    DisplayName,
    /// A human readable description of the node.
    Description,
    /// Bit mask of the attributes an admin user may write.
    WriteMask,
    /// Bit mask of the attributes the current user may write.
    UserWriteMask,
    /// `true` if this node is the root of an instance that should not be deleted without its parent.
    IsAbstract,
    /// `true` if a `HasChild` reference from this reference type is symmetric.
    Symmetric,
    /// The forward browse name of a reference type.
    InverseName,
    /// `true` if this view node only includes nodes in the current server.
    ContainsNoLoops,
    /// Bit mask of the ways an object may raise events.
    EventNotifier,
    /// The current value of a variable.
    Value,
    /// The node id of the variable's or variable type's data type.
    DataType,
    /// The number of array dimensions implied by the variable's value, or -1/0/1 for scalar/any/1-d arrays.
    ValueRank,
    /// The length of each dimension of an array value.
    ArrayDimensions,
    /// Bit mask of the ways a variable may be accessed by any user.
    AccessLevel,
    /// Bit mask of the ways a variable may be accessed by the current user.
    UserAccessLevel,
    /// Suggested rate, in milliseconds, at which the server samples this variable for monitoring.
    MinimumSamplingInterval,
    /// `true` if the server maintains history for this variable.
    Historizing,
    /// `true` if the method is currently executable.
    Executable,
    /// `true` if the method is currently executable by the current user.
    UserExecutable,
    /// Definition of a custom data type's structure.
    DataTypeDefinition,
    /// Role permissions granted on this node.
    RolePermissions,
    /// Role permissions granted on this node for the current user.
    UserRolePermissions,
    /// Encoding-specific access restrictions on this node.
    AccessRestrictions,
    /// Extended, 32-bit version of `AccessLevel`.
    AccessLevelEx,
}

impl AttributeId {
    /// Recover an `AttributeId` from its wire representation, if valid.
    pub fn from_u32(v: u32) -> Option<AttributeId> {
        Some(match v {
            1 => AttributeId::NodeId,
            2 => AttributeId::NodeClass,
            3 => AttributeId::BrowseName,
            4 => AttributeId::DisplayName,
            5 => AttributeId::Description,
            6 => AttributeId::WriteMask,
            7 => AttributeId::UserWriteMask,
            8 => AttributeId::IsAbstract,
            9 => AttributeId::Symmetric,
            10 => AttributeId::InverseName,
            11 => AttributeId::ContainsNoLoops,
            12 => AttributeId::EventNotifier,
            13 => AttributeId::Value,
            14 => AttributeId::DataType,
            15 => AttributeId::ValueRank,
            16 => AttributeId::ArrayDimensions,
            17 => AttributeId::AccessLevel,
            18 => AttributeId::UserAccessLevel,
            19 => AttributeId::MinimumSamplingInterval,
            20 => AttributeId::Historizing,
            21 => AttributeId::Executable,
            22 => AttributeId::UserExecutable,
            23 => AttributeId::DataTypeDefinition,
            24 => AttributeId::RolePermissions,
            25 => AttributeId::UserRolePermissions,
            26 => AttributeId::AccessRestrictions,
            27 => AttributeId::AccessLevelEx,
            _ => return None,
        })
    }

    /// `true` if this attribute is present on every node class (the attributes
    /// defined on `BaseNode` in the object model).
    pub fn is_common(&self) -> bool {
        matches!(
            self,
            AttributeId::NodeId
                | AttributeId::NodeClass
                | AttributeId::BrowseName
                | AttributeId::DisplayName
                | AttributeId::Description
                | AttributeId::WriteMask
                | AttributeId::UserWriteMask
                | AttributeId::RolePermissions
                | AttributeId::UserRolePermissions
                | AttributeId::AccessRestrictions
        )
    }
}

bitflags! {
    /// Bit mask of which attributes of a node an administrative user may write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WriteMask: u32 {
        /// The `AccessLevel` attribute is writable.
        const ACCESS_LEVEL = 1;
        /// The `ArrayDimensions` attribute is writable.
        const ARRAY_DIMENSIONS = 1 << 1;
        /// The `BrowseName` attribute is writable.
        const BROWSE_NAME = 1 << 2;
        /// The `ContainsNoLoops` attribute is writable.
        const CONTAINS_NO_LOOPS = 1 << 3;
        /// The `DataType` attribute is writable.
        const DATA_TYPE = 1 << 4;
        /// The `Description` attribute is writable.
        const DESCRIPTION = 1 << 5;
        /// The `DisplayName` attribute is writable.
        const DISPLAY_NAME = 1 << 6;
        /// The `EventNotifier` attribute is writable.
        const EVENT_NOTIFIER = 1 << 7;
        /// The `Executable` attribute is writable.
        const EXECUTABLE = 1 << 8;
        /// The `Historizing` attribute is writable.
        const HISTORIZING = 1 << 9;
        /// The `InverseName` attribute is writable.
        const INVERSE_NAME = 1 << 10;
        /// The `IsAbstract` attribute is writable.
        const IS_ABSTRACT = 1 << 11;
        /// The `MinimumSamplingInterval` attribute is writable.
        const MINIMUM_SAMPLING_INTERVAL = 1 << 12;
        /// The `NodeClass` attribute is writable.
        const NODE_CLASS = 1 << 13;
        /// The `NodeId` attribute is writable.
        const NODE_ID = 1 << 14;
        /// The `Symmetric` attribute is writable.
        const SYMMETRIC = 1 << 15;
        /// The `UserAccessLevel` attribute is writable.
        const USER_ACCESS_LEVEL = 1 << 16;
        /// The `UserExecutable` attribute is writable.
        const USER_EXECUTABLE = 1 << 17;
        /// The `UserWriteMask` attribute is writable.
        const USER_WRITE_MASK = 1 << 18;
        /// The `ValueRank` attribute is writable.
        const VALUE_RANK = 1 << 19;
        /// The `WriteMask` attribute is writable.
        const WRITE_MASK = 1 << 20;
        /// The `Value` attribute of a non-variable node is writable (historical).
        const VALUE_FOR_VARIABLE_TYPE = 1 << 21;
        /// The `DataTypeDefinition` attribute is writable.
        const DATA_TYPE_DEFINITION = 1 << 22;
        /// The `RolePermissions` attribute is writable.
        const ROLE_PERMISSIONS = 1 << 23;
        /// The `AccessRestrictions` attribute is writable.
        const ACCESS_RESTRICTIONS = 1 << 24;
        /// The `AccessLevelEx` attribute is writable.
        const ACCESS_LEVEL_EX = 1 << 25;
    }
}

bitflags! {
    /// Bit mask of the ways in which a variable's value may be accessed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessLevel: u8 {
        /// The current value may be read.
        const CURRENT_READ = 1;
        /// The current value may be written.
        const CURRENT_WRITE = 1 << 1;
        /// History may be read.
        const HISTORY_READ = 1 << 2;
        /// History may be written.
        const HISTORY_WRITE = 1 << 3;
        /// The value may be used as the target of a semantic change event.
        const SEMANTIC_CHANGE = 1 << 4;
        /// The status code of the value may change independent of its value.
        const STATUS_WRITE = 1 << 5;
        /// The timestamp of the value may change independent of its value.
        const TIMESTAMP_WRITE = 1 << 6;
    }
}

bitflags! {
    /// Bit mask describing the ways an object may raise events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventNotifier: u8 {
        /// The object subscribes to events from another node.
        const SUBSCRIBE_TO_EVENTS = 1;
        /// The object maintains an event history.
        const HISTORY_READ = 1 << 2;
        /// The object supports writing to its event history.
        const HISTORY_WRITE = 1 << 3;
    }
}
