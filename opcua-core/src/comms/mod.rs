// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! OPC UA Binary/TCP framing (§6): the `HEL/ACK/OPN/MSG/CLO` message types,
//! chunk headers, and the reassembly state machine that turns a chunk
//! sequence into one logical message. Byte-level encode/decode of request and
//! response bodies is left to an external codec layered on top of
//! `opcua-types`; this module models the framing envelope and state only.

pub mod hello;
pub mod message_chunk;
pub mod secure_channel;
