// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Facade over the individual OPC UA crates (§A): `opcua::types`,
//! `opcua::crypto`, `opcua::core`, and, behind their features,
//! `opcua::nodes`, `opcua::server`, `opcua::client`.

pub use opcua_core as core;
pub use opcua_crypto as crypto;
pub use opcua_types as types;

#[cfg(feature = "server")]
pub use opcua_nodes as nodes;
#[cfg(feature = "server")]
pub use opcua_server as server;

#[cfg(feature = "client")]
pub use opcua_client as client;
