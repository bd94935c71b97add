//! [`tokio_util::codec`] support for using the protocol with asynchronous streams.
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    error::ReadError,
    protocol::{MAX_REPLY_BYTES, Message, TERMINATOR},
};

/// Splits a byte stream into messages at the final terminator, reassembling
/// partial replies on the way.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    max_len: usize,
}

impl MessageCodec {
    /// Creates a codec that rejects replies longer than `max_len` bytes,
    /// counting all partial chunks of a reply together.
    pub fn with_max_len(max_len: usize) -> MessageCodec {
        MessageCodec { max_len }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::with_max_len(MAX_REPLY_BYTES)
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ReadError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ReadError> {
        let Some(pos) = src.iter().position(|b| *b == TERMINATOR as u8) else {
            if src.len() > self.max_len {
                return Err(ReadError::TooManyBytes {
                    max: self.max_len,
                    got: src.len(),
                });
            }
            return Ok(None);
        };
        let frame = src.split_to(pos + 1);
        Message::decode_partial(str::from_utf8(&frame)?).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Message>, ReadError> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None if buf.is_empty() => Ok(None),
            None => Err(ReadError::InvalidFrame(
                String::from_utf8_lossy(buf).to_string(),
            )),
        }
    }
}

impl Encoder<&Message> for MessageCodec {
    type Error = ReadError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), ReadError> {
        dst.put_slice(&item.encode());
        Ok(())
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ReadError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), ReadError> {
        self.encode(&item, dst)
    }
}
