//! Splits the receiver's byte stream into `< ... >` frames.
//!
//! Frames end at every `>` byte. Whatever follows the last `>` stays buffered
//! until more bytes arrive, so frames split across reads and several frames in
//! one read both decode the same way.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Byte that terminates every frame
pub const FRAME_END: u8 = b'>';

/// Pending bytes allowed without a terminator before the buffer is discarded
pub const MAX_PENDING: usize = 64 * 1024;

/// Incremental frame decoder
///
/// Emits the raw text before each `>`, including the opening `<` and any
/// surrounding whitespace; [`crate::protocol::Inbound::parse`] strips those.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completes, in arrival order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        self.enforce_limit();
        frames
    }

    /// Bytes received after the last complete frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn next_frame(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == FRAME_END)?;
        let frame = self.buf.split_to(end);
        self.buf.advance(1);
        Some(String::from_utf8_lossy(&frame).into_owned())
    }

    fn enforce_limit(&mut self) {
        if self.buf.len() > MAX_PENDING {
            tracing::warn!(
                "Discarding {} buffered bytes without a frame terminator",
                self.buf.len()
            );
            self.buf.clear();
        }
    }
}

impl Decoder for FrameDecoder {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if !src.is_empty() {
            self.buf.extend_from_slice(&src.split());
        }
        let frame = self.next_frame();
        if frame.is_none() {
            self.enforce_limit();
        }
        Ok(frame)
    }
}
