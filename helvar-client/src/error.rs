use std::io;

use helvar_protocol::{command::CommandId, error::ReadError};

use crate::transceiver::TransceiveError;

/// Errors returned by the [`crate::Client`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening connection number `index` (counting from one) failed.
    /// Connections opened before it have been closed again.
    #[error("couldn't establish connection #{index} to {address}: {source}")]
    Connect {
        index: usize,
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("client is already connected")]
    AlreadyConnected,
    #[error("client is not connected")]
    NotConnected,
    #[error("client has been disconnected")]
    Disconnected,
    /// Every transceiver of the pool has stopped.
    #[error("no transceiver left to serve the request")]
    PoolExhausted,
    /// The request was dropped without being served.
    #[error("request was dropped before a reply arrived")]
    ReplyDropped,
    #[error("failed to transceive message: {0}")]
    Transceive(#[from] TransceiveError),
    /// The router answered with an error frame. The answer holds the error code.
    #[error("received a message with an error: {frame}")]
    Remote { answer: String, frame: String },
    #[error("no reply received for command {0:?}")]
    MissingReply(Option<CommandId>),
    #[error("invalid reply: {0}")]
    InvalidReply(#[from] ReadError),
}
