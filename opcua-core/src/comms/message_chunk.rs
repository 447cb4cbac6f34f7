// OPCUA core for Rust
// SPDX-License-Identifier: MPL-2.0

//! Chunk header and reassembly state (§6): the 3-byte message type tag, the
//! `F/C/A` chunk type tag, and the size/channel-id fields every chunk opens
//! with.

use crate::errors::FramingError;

/// Size in bytes of the fixed chunk header (type tag + chunk tag + size + channel id).
pub const MESSAGE_CHUNK_HEADER_SIZE: usize = 3 + 1 + 4 + 4;

/// Which of the three message kinds a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageChunkType {
    /// `MSG`: a normal service request or response.
    Message,
    /// `OPN`: OpenSecureChannel.
    OpenSecureChannel,
    /// `CLO`: CloseSecureChannel.
    CloseSecureChannel,
}

impl MessageChunkType {
    /// `true` for `OPN`.
    pub fn is_open_secure_channel(&self) -> bool {
        matches!(self, MessageChunkType::OpenSecureChannel)
    }

    /// `true` for `CLO`.
    pub fn is_close_secure_channel(&self) -> bool {
        matches!(self, MessageChunkType::CloseSecureChannel)
    }
}

/// The `F`/`C`/`A` chunk continuation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// `C`: more chunks follow.
    Intermediate,
    /// `F`: this is the last chunk of the message.
    Final,
    /// `A`: sender aborted; the whole message (all chunks so far) is discarded.
    Abort,
}

/// The fixed-size header every chunk opens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageChunkHeader {
    /// `MSG`/`OPN`/`CLO`.
    pub message_type: MessageChunkType,
    /// `F`/`C`/`A`.
    pub chunk_type: ChunkType,
    /// Total chunk size, header included.
    pub message_size: u32,
    /// The channel this chunk belongs to.
    pub secure_channel_id: u32,
}

/// Accumulates chunks belonging to one logical message, enforcing the
/// `maxMessageSize`/`maxChunkCount` limits negotiated at `HEL`/`ACK` time.
#[derive(Debug, Default)]
pub struct ChunkAssembly {
    channel_id: Option<u32>,
    message_type: Option<MessageChunkType>,
    total_size: usize,
    chunk_count: u32,
    bodies: Vec<Vec<u8>>,
}

impl ChunkAssembly {
    /// A fresh, empty assembly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk's header and body in. Returns the reassembled body
    /// bytes once a `Final` chunk completes the message, `None` if more
    /// chunks are expected, or a `FramingError` if the chunk violates the
    /// channel binding or negotiated limits.
    pub fn push(
        &mut self,
        header: &MessageChunkHeader,
        body: &[u8],
        max_message_size: u32,
        max_chunk_count: u32,
    ) -> Result<Option<Vec<u8>>, FramingError> {
        match self.channel_id {
            None => self.channel_id = Some(header.secure_channel_id),
            Some(id) if id != header.secure_channel_id => return Err(FramingError::ChannelIdMismatch),
            Some(_) => {}
        }
        self.message_type.get_or_insert(header.message_type);

        if header.chunk_type == ChunkType::Abort {
            self.reset();
            return Err(FramingError::Aborted);
        }

        self.chunk_count += 1;
        if max_chunk_count != 0 && self.chunk_count > max_chunk_count {
            self.reset();
            return Err(FramingError::TooManyChunks);
        }
        self.total_size += body.len();
        if max_message_size != 0 && self.total_size > max_message_size as usize {
            self.reset();
            return Err(FramingError::MessageTooLarge);
        }
        self.bodies.push(body.to_vec());

        if header.chunk_type == ChunkType::Final {
            let mut assembled = Vec::with_capacity(self.total_size);
            for chunk in self.bodies.drain(..) {
                assembled.extend_from_slice(&chunk);
            }
            self.reset();
            Ok(Some(assembled))
        } else {
            Ok(None)
        }
    }

    fn reset(&mut self) {
        self.channel_id = None;
        self.message_type = None;
        self.total_size = 0;
        self.chunk_count = 0;
        self.bodies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(chunk_type: ChunkType) -> MessageChunkHeader {
        MessageChunkHeader {
            message_type: MessageChunkType::Message,
            chunk_type,
            message_size: 0,
            secure_channel_id: 7,
        }
    }

    #[test]
    fn single_final_chunk_completes_immediately() {
        let mut assembly = ChunkAssembly::new();
        let result = assembly
            .push(&header(ChunkType::Final), b"hello", 0, 0)
            .unwrap();
        assert_eq!(result, Some(b"hello".to_vec()));
    }

    #[test]
    fn intermediate_then_final_concatenates() {
        let mut assembly = ChunkAssembly::new();
        assert_eq!(assembly.push(&header(ChunkType::Intermediate), b"ab", 0, 0).unwrap(), None);
        let result = assembly.push(&header(ChunkType::Final), b"cd", 0, 0).unwrap();
        assert_eq!(result, Some(b"abcd".to_vec()));
    }

    #[test]
    fn mismatched_channel_id_rejected() {
        let mut assembly = ChunkAssembly::new();
        assembly.push(&header(ChunkType::Intermediate), b"ab", 0, 0).unwrap();
        let mut other = header(ChunkType::Final);
        other.secure_channel_id = 8;
        assert_eq!(
            assembly.push(&other, b"cd", 0, 0).unwrap_err(),
            FramingError::ChannelIdMismatch
        );
    }

    #[test]
    fn abort_chunk_discards_progress() {
        let mut assembly = ChunkAssembly::new();
        assembly.push(&header(ChunkType::Intermediate), b"ab", 0, 0).unwrap();
        assert_eq!(
            assembly.push(&header(ChunkType::Abort), b"", 0, 0).unwrap_err(),
            FramingError::Aborted
        );
        // the assembly is clean afterwards and can start a fresh message
        let result = assembly.push(&header(ChunkType::Final), b"xy", 0, 0).unwrap();
        assert_eq!(result, Some(b"xy".to_vec()));
    }

    #[test]
    fn max_message_size_enforced() {
        let mut assembly = ChunkAssembly::new();
        assert_eq!(
            assembly.push(&header(ChunkType::Final), b"abcdef", 4, 0).unwrap_err(),
            FramingError::MessageTooLarge
        );
    }

    #[test]
    fn max_chunk_count_enforced() {
        let mut assembly = ChunkAssembly::new();
        assembly.push(&header(ChunkType::Intermediate), b"a", 0, 1).unwrap();
        assert_eq!(
            assembly.push(&header(ChunkType::Final), b"b", 0, 1).unwrap_err(),
            FramingError::TooManyChunks
        );
    }
}
