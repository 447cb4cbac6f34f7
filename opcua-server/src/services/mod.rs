// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Service handlers (§4.4–§4.8), one module per service group. Each function
//! takes the shared state it needs directly rather than a request context
//! struct, so it can be called both from [`crate::dispatch`] and from the
//! subscription engine's sampling path (`attribute::read_value`).

pub mod attribute;
pub mod channel;
pub mod method;
pub mod node_management;
pub mod session;
pub mod subscription;
pub mod view;
