use std::{
    io::{self, BufReader, ErrorKind, Write},
    net::{Shutdown, TcpStream},
    sync::Arc,
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use helvar_protocol::{MAX_MESSAGE_BYTES, MAX_REPLY_BYTES, Message, command, error::ReadError};

/// Outcome of one exchange. `None` if the command is not answered by the router.
pub type Reply = Result<Option<Message>, TransceiveError>;

/// A request waiting in the queue together with the slot for its reply.
pub(crate) struct Exchange {
    pub request: Message,
    pub reply: Sender<Reply>,
}

/// Failure of a single exchange on one connection.
///
/// Errors that leave the connection in an unknown state stop the transceiver,
/// see [`TransceiveError::closes_connection`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransceiveError {
    #[error("failed to send message {frame}: {source}")]
    Send {
        frame: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("message was sent partially ({sent} of {expected} bytes): {frame}")]
    ShortWrite {
        frame: String,
        sent: usize,
        expected: usize,
    },
    #[error("failed to receive response for {frame}: {source}")]
    Receive {
        frame: String,
        #[source]
        source: Arc<ReadError>,
    },
    #[error("message of {size} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
    /// The probe sent on an idle connection failed.
    #[error("keep-alive failed: {0}")]
    KeepAlive(#[source] Box<TransceiveError>),
}

impl TransceiveError {
    /// Whether the connection can no longer be used after this error.
    /// Frames refused before writing leave the connection untouched.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, TransceiveError::FrameTooLarge { .. })
    }
}

/// Owns one connection and serves exchanges from the shared queue, one at a time.
pub(crate) struct Transceiver {
    id: usize,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    queue: Receiver<Exchange>,
    keep_alive: Duration,
}

impl Transceiver {
    pub fn new(
        id: usize,
        stream: TcpStream,
        queue: Receiver<Exchange>,
        keep_alive: Duration,
    ) -> io::Result<Transceiver> {
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Transceiver {
            id,
            stream,
            reader,
            queue,
            keep_alive,
        })
    }

    /// Starts serving on a dedicated thread.
    /// The returned channel yields the error that stopped the transceiver, if any.
    pub fn spawn(self) -> io::Result<Receiver<TransceiveError>> {
        let (errors, errors_rx) = bounded(1);
        thread::Builder::new()
            .name(format!("helvar-transceiver-{}", self.id))
            .spawn(move || self.run(errors))?;
        Ok(errors_rx)
    }

    fn run(mut self, errors: Sender<TransceiveError>) {
        log::debug!("Transceiver {} started", self.id);
        loop {
            match self.queue.recv_timeout(self.keep_alive) {
                Ok(Exchange { request, reply }) => {
                    let result = self.transceive(&request);
                    let failure = result.as_ref().err().cloned();
                    let _ = reply.send(result);
                    match failure {
                        Some(err) if err.closes_connection() => {
                            log::error!("Transceiver {} stopped: {}", self.id, err);
                            let _ = errors.send(err);
                            break;
                        }
                        Some(err) => log::warn!("Transceiver {} refused request: {}", self.id, err),
                        None => {}
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!("Transceiver {} idle, sending keep-alive", self.id);
                    if let Err(err) = self.transceive(&command::query_time()) {
                        let err = TransceiveError::KeepAlive(Box::new(err));
                        log::error!("Transceiver {} stopped: {}", self.id, err);
                        let _ = errors.send(err);
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("Transceiver {} queue closed", self.id);
                    break;
                }
            }
        }
        self.close();
    }

    fn transceive(&mut self, msg: &Message) -> Reply {
        let out = msg.encode();
        if out.len() > MAX_MESSAGE_BYTES {
            return Err(TransceiveError::FrameTooLarge {
                size: out.len(),
                max: MAX_MESSAGE_BYTES,
            });
        }

        log::debug!("Transceiver {} sending {}", self.id, msg);
        let sent = loop {
            match self.stream.write(&out) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        }
        .map_err(|err| TransceiveError::Send {
            frame: msg.to_string(),
            source: Arc::new(err),
        })?;
        if sent != out.len() {
            return Err(TransceiveError::ShortWrite {
                frame: msg.to_string(),
                sent,
                expected: out.len(),
            });
        }

        if !msg.expects_reply() {
            return Ok(None);
        }

        let reply =
            Message::from_reader(&mut self.reader, MAX_REPLY_BYTES).map_err(|err| TransceiveError::Receive {
                frame: msg.to_string(),
                source: Arc::new(err),
            })?;
        log::debug!("Transceiver {} received {}", self.id, reply);
        Ok(Some(reply))
    }

    fn close(self) {
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            log::debug!(
                "Transceiver {} failed to close connection properly: {}",
                self.id,
                err
            );
        }
        log::debug!("Transceiver {} stopped", self.id);
    }
}
