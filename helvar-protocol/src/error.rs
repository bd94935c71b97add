use std::{io, str::Utf8Error};

/// Errors that may occur when reading a message from a stream or a string.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("{0}")]
    Io(#[from] io::Error),
    /// The peer closed the connection before sending any byte of a frame.
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Invalid frame {0:?}")]
    InvalidFrame(String),
    #[error("{0:?} is not a valid message parameter")]
    MalformedParameter(String),
    /// No final terminator within the first `max` bytes of a reply.
    #[error("Message too large, maximum is {max} bytes but got {got}")]
    TooManyBytes { max: usize, got: usize },
    /// A piece of an answer could not be interpreted as expected.
    #[error("Invalid answer {0:?}")]
    InvalidAnswer(String),
}

impl From<Utf8Error> for ReadError {
    fn from(value: Utf8Error) -> Self {
        ReadError::InvalidFrame(format!("Invalid UTF8: {}", value))
    }
}
