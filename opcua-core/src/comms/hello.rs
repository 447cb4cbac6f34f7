// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! `HEL`/`ACK`, the connection-establishment handshake that precedes any
//! `OPN` (§6).

use opcua_types::UAString;

/// Minimum receive buffer size this core will negotiate down to.
pub const MIN_BUFFER_SIZE: u32 = 8192;

/// Parameters a client proposes in `HEL`.
#[derive(Debug, Clone)]
pub struct HelloMessage {
    /// Highest protocol version the client supports.
    pub protocol_version: u32,
    /// Client's proposed send buffer size.
    pub receive_buffer_size: u32,
    /// Client's proposed receive buffer size.
    pub send_buffer_size: u32,
    /// Largest message the client will accept, 0 meaning unlimited.
    pub max_message_size: u32,
    /// Largest number of chunks the client will accept per message, 0 meaning unlimited.
    pub max_chunk_count: u32,
    /// The endpoint URL the client is connecting to.
    pub endpoint_url: UAString,
}

/// The server's reply, with buffer sizes revised down to what it will honour.
#[derive(Debug, Clone)]
pub struct AcknowledgeMessage {
    /// The protocol version the server will use (min of client's and its own).
    pub protocol_version: u32,
    /// Revised receive buffer size.
    pub receive_buffer_size: u32,
    /// Revised send buffer size.
    pub send_buffer_size: u32,
    /// Revised maximum message size.
    pub max_message_size: u32,
    /// Revised maximum chunk count.
    pub max_chunk_count: u32,
}

impl HelloMessage {
    /// Negotiate an `Acknowledge` from this `Hello`, clamping every buffer
    /// parameter to this server's own limits and never going below
    /// `MIN_BUFFER_SIZE`.
    pub fn negotiate(
        &self,
        server_protocol_version: u32,
        server_receive_buffer_size: u32,
        server_send_buffer_size: u32,
        server_max_message_size: u32,
        server_max_chunk_count: u32,
    ) -> AcknowledgeMessage {
        let clamp = |requested: u32, server_limit: u32| -> u32 {
            if requested == 0 {
                server_limit
            } else {
                requested.min(server_limit).max(MIN_BUFFER_SIZE)
            }
        };
        AcknowledgeMessage {
            protocol_version: self.protocol_version.min(server_protocol_version),
            receive_buffer_size: clamp(self.receive_buffer_size, server_receive_buffer_size),
            send_buffer_size: clamp(self.send_buffer_size, server_send_buffer_size),
            max_message_size: non_zero_min(self.max_message_size, server_max_message_size),
            max_chunk_count: non_zero_min(self.max_chunk_count, server_max_chunk_count),
        }
    }
}

/// `0` means "unlimited" on the wire; take the non-zero minimum, or `0` if
/// both sides claim unlimited.
fn non_zero_min(a: u32, b: u32) -> u32 {
    match (a, b) {
        (0, 0) => 0,
        (0, b) => b,
        (a, 0) => a,
        (a, b) => a.min(b),
    }
}
