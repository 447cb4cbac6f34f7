// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Well-known numeric identifiers from namespace 0, the OPC UA standard
//! namespace. Only the subset the core actually branches on is listed here;
//! the full register lives in the generated `NodeIds` table the external
//! codegen produces.

/// Numeric identifiers of built-in data types, reference types and object
/// types in namespace 0 that the core's type-checking and instantiation
/// logic needs to recognise by name.
pub mod object_id {
    /// `i=0`, the null node id's numeric part.
    pub const NULL: u32 = 0;

    // --- built-in data types (namespace 0, numeric <= 25 is the "builtin" band) ---
    /// `Boolean` data type.
    pub const BOOLEAN: u32 = 1;
    /// `SByte` data type.
    pub const SBYTE: u32 = 2;
    /// `Byte` data type.
    pub const BYTE: u32 = 3;
    /// `Int16` data type.
    pub const INT16: u32 = 4;
    /// `UInt16` data type.
    pub const UINT16: u32 = 5;
    /// `Int32` data type.
    pub const INT32: u32 = 6;
    /// `UInt32` data type.
    pub const UINT32: u32 = 7;
    /// `Int64` data type.
    pub const INT64: u32 = 8;
    /// `UInt64` data type.
    pub const UINT64: u32 = 9;
    /// `Float` data type.
    pub const FLOAT: u32 = 10;
    /// `Double` data type.
    pub const DOUBLE: u32 = 11;
    /// `String` data type.
    pub const STRING: u32 = 12;
    /// `DateTime` data type.
    pub const DATE_TIME: u32 = 13;
    /// `Guid` data type.
    pub const GUID: u32 = 14;
    /// `ByteString` data type.
    pub const BYTE_STRING: u32 = 15;
    /// `XmlElement` data type.
    pub const XML_ELEMENT: u32 = 16;
    /// `NodeId` data type.
    pub const NODE_ID: u32 = 17;
    /// `ExpandedNodeId` data type.
    pub const EXPANDED_NODE_ID: u32 = 18;
    /// `StatusCode` data type.
    pub const STATUS_CODE: u32 = 19;
    /// `QualifiedName` data type.
    pub const QUALIFIED_NAME: u32 = 20;
    /// `LocalizedText` data type.
    pub const LOCALIZED_TEXT: u32 = 21;
    /// `Structure` data type, the abstract ancestor of all structured types.
    pub const STRUCTURE: u32 = 22;
    /// `DataValue` data type.
    pub const DATA_VALUE: u32 = 23;
    /// `BaseDataType`, the root of the data type hierarchy: matches anything non-null.
    pub const BASE_DATA_TYPE: u32 = 24;
    /// `DiagnosticInfo` data type.
    pub const DIAGNOSTIC_INFO: u32 = 25;
    /// `Number`, abstract ancestor of all numeric types.
    pub const NUMBER: u32 = 26;
    /// `Integer`, abstract ancestor of all signed/unsigned integer types.
    pub const INTEGER: u32 = 27;
    /// `UInteger`, abstract ancestor of all unsigned integer types.
    pub const UINTEGER: u32 = 28;
    /// `Enumeration`, abstract ancestor of all enumerated types; compatible
    /// values are carried as `Int32`.
    pub const ENUMERATION: u32 = 29;
    /// `Image` data type.
    pub const IMAGE: u32 = 30;
    /// `UtcTime`, subtype of `DateTime`.
    pub const UTC_TIME: u32 = 294;

    /// Highest numeric identifier considered part of the "built-in" band for
    /// rule 6 of `compatible_data_type`.
    pub const BUILTIN_DATA_TYPE_MAX: u32 = 25;

    // --- reference types ---
    /// `References`, the abstract root of all reference types.
    pub const REFERENCES: u32 = 31;
    /// `HierarchicalReferences`.
    pub const HIERARCHICAL_REFERENCES: u32 = 33;
    /// `HasChild`.
    pub const HAS_CHILD: u32 = 34;
    /// `Organizes`.
    pub const ORGANIZES: u32 = 35;
    /// `HasEventSource`.
    pub const HAS_EVENT_SOURCE: u32 = 36;
    /// `HasModellingRule`.
    pub const HAS_MODELLING_RULE: u32 = 37;
    /// `HasEncoding`.
    pub const HAS_ENCODING: u32 = 38;
    /// `HasDescription`.
    pub const HAS_DESCRIPTION: u32 = 39;
    /// `HasTypeDefinition`.
    pub const HAS_TYPE_DEFINITION: u32 = 40;
    /// `GeneratesEvent`.
    pub const GENERATES_EVENT: u32 = 41;
    /// `Aggregates`.
    pub const AGGREGATES: u32 = 44;
    /// `HasSubtype`.
    pub const HAS_SUBTYPE: u32 = 45;
    /// `HasProperty`.
    pub const HAS_PROPERTY: u32 = 46;
    /// `HasComponent`.
    pub const HAS_COMPONENT: u32 = 47;
    /// `HasNotifier`.
    pub const HAS_NOTIFIER: u32 = 48;
    /// `HasOrderedComponent`.
    pub const HAS_ORDERED_COMPONENT: u32 = 49;

    // --- object types / variable types ---
    /// `FolderType`.
    pub const FOLDER_TYPE: u32 = 61;
    /// `BaseObjectType`.
    pub const BASE_OBJECT_TYPE: u32 = 58;
    /// `BaseVariableType`.
    pub const BASE_VARIABLE_TYPE: u32 = 62;
    /// `BaseDataVariableType`.
    pub const BASE_DATA_VARIABLE_TYPE: u32 = 63;
    /// `PropertyType`.
    pub const PROPERTY_TYPE: u32 = 68;
    /// `ServerType`.
    pub const SERVER_TYPE: u32 = 2004;
    /// `ModellingRule_Mandatory`.
    pub const MODELLING_RULE_MANDATORY: u32 = 78;
    /// `ModellingRule_Optional`.
    pub const MODELLING_RULE_OPTIONAL: u32 = 80;

    /// `Server_ServerStatus_CurrentTime`, used as the default well-known
    /// variable in examples and tests.
    pub const SERVER_SERVER_STATUS_CURRENT_TIME: u32 = 2258;

    /// `FunctionalGroupType` from the DI companion specification, used as the
    /// indirection target for the Call service's "functional group" allowance.
    /// Outside namespace 0 in a real server; kept here as the numeric part
    /// recognised when the DI namespace is loaded under a known namespace index.
    pub const DI_FUNCTIONAL_GROUP_TYPE: u32 = 5946;
}

/// Property browse names (namespace 0) the core looks up by name rather than
/// by reference type, e.g. `InputArguments` on a Method node.
pub mod property_name {
    /// Browse name of the `InputArguments` property on a Method node.
    pub const INPUT_ARGUMENTS: &str = "InputArguments";
    /// Browse name of the `OutputArguments` property on a Method node.
    pub const OUTPUT_ARGUMENTS: &str = "OutputArguments";
    /// Browse name of the `EURange` property used by percent deadband.
    pub const EU_RANGE: &str = "EURange";
}
