use std::{
    io::{BufReader, ErrorKind, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    sync::Arc,
    thread,
    time::Duration,
};

use crate::{Workgroup, error_code};
use helvar_protocol::{
    DELIMITER, FrameType, MAX_MESSAGE_BYTES, Message, PARTIAL_TERMINATOR, command::CommandId,
    error::ReadError,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Answers longer than this are split into partial frames
    pub max_answer_len: usize,
    pub read_write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_answer_len: 1400,
            read_write_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
pub struct Server<T: Workgroup> {
    workgroup: Arc<T>,
    config: Config,
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use helvar_router::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .max_answer_len(64)
///     .rw_timeout(Duration::from_secs(20))
///     .build(network);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the longest answer sent in a single frame.
    pub fn max_answer_len(mut self, len: usize) -> Self {
        self.config.max_answer_len = len;
        self
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Build and return the server
    pub fn build<T: Workgroup>(self, workgroup: T) -> Server<T> {
        Server::new(workgroup, self.config)
    }
}

impl<T: Workgroup> Server<T> {
    pub fn new(workgroup: T, config: Config) -> Server<T> {
        Server {
            workgroup: Arc::new(workgroup),
            config,
        }
    }

    /// Serves clients on the current thread until accepting fails.
    pub fn listen(&self, addr: impl ToSocketAddrs) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr)?;
        log::info!("Server listening for connections");
        self.accept(listener);
        Ok(())
    }

    /// Binds to `addr` and serves clients on a background thread.
    /// Returns the bound address, which is useful when binding to port 0.
    pub fn spawn(self, addr: impl ToSocketAddrs) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        log::info!("Server listening for connections on {}", local_addr);
        thread::Builder::new()
            .name("helvar-router".to_string())
            .spawn(move || self.accept(listener))?;
        Ok(local_addr)
    }

    fn accept(&self, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(tcp) => {
                    let peer_addr = tcp.peer_addr().ok();
                    if let Some(addr) = peer_addr {
                        log::info!("New client connection from {}", addr);
                    }
                    let session = Session {
                        workgroup: Arc::clone(&self.workgroup),
                        config: self.config.clone(),
                    };
                    let spawned = thread::Builder::new()
                        .name("helvar-router-client".to_string())
                        .spawn(move || {
                            if let Err(e) = session.handle_client(tcp) {
                                log::error!("Client error: {}", e);
                            }
                        });
                    if let Err(e) = spawned {
                        log::error!("Failed to start client thread: {}", e);
                    }
                }
                Err(e) => log::error!("Connection error: {}", e),
            }
        }
    }
}

/// Serves a single client connection.
struct Session<T> {
    workgroup: Arc<T>,
    config: Config,
}

impl<T: Workgroup> Session<T> {
    fn handle_client(&self, mut tcp: TcpStream) -> Result<(), ReadError> {
        tcp.set_read_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_write_timeout(Some(self.config.read_write_timeout))?;
        let mut reader = BufReader::new(tcp.try_clone()?);

        loop {
            match Message::from_reader(&mut reader, MAX_MESSAGE_BYTES) {
                Ok(message) => self.process_message(message, &mut tcp)?,
                Err(ReadError::ConnectionClosed) => break,
                Err(err @ ReadError::TooManyBytes { .. }) => {
                    log::error!("{}, closing connection", err);
                    break;
                }
                Err(ReadError::Io(err))
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    log::error!("Client read timeout, closing connection");
                    break;
                }
                Err(ReadError::Io(err))
                    if err.kind() == ErrorKind::ConnectionAborted
                        || err.kind() == ErrorKind::ConnectionReset =>
                {
                    break;
                } // Client disconnected
                Err(ReadError::Io(err)) => return Err(err.into()),
                Err(other) => log::error!("Failed to parse incoming message: {}", other),
            }
        }
        log::info!("Client disconnected");
        Ok(())
    }

    fn process_message(&self, message: Message, tcp: &mut TcpStream) -> Result<(), ReadError> {
        log::debug!("Received {}", message);
        if !message.expects_reply() {
            self.workgroup.control(&message);
            return Ok(());
        }

        let reply = self.reply(&message);
        for frame in split_answer(&reply, self.config.max_answer_len) {
            tcp.write_all(frame.as_bytes())?;
        }
        log::debug!("Sent {}", reply);
        Ok(())
    }

    fn reply(&self, message: &Message) -> Message {
        let reply = Message::new(FrameType::Reply).with_parameters(message.parameters.clone());
        let workgroup = &*self.workgroup;
        let answer = match message.command() {
            Some(CommandId::QueryClusters) => Ok(join(workgroup.cluster_ids())),
            Some(CommandId::QueryRouters) => Ok(join(workgroup.router_ids())),
            Some(CommandId::QueryGroups) => Ok(join(workgroup.groups().iter().map(|g| g.id))),
            Some(CommandId::QueryGroupDescription) => message
                .group()
                .and_then(|id| workgroup.group(id))
                .map(|g| g.name.clone())
                .ok_or(error_code::INVALID_GROUP_INDEX),
            Some(CommandId::QueryGroup) => message
                .group()
                .and_then(|id| workgroup.group(id))
                .map(|g| join(g.devices.iter().map(|d| format!("@{}", d.address))))
                .ok_or(error_code::INVALID_GROUP_INDEX),
            Some(CommandId::QueryDeviceDescription) => message
                .address()
                .and_then(|address| workgroup.device(address))
                .map(|d| d.name.clone())
                .ok_or(error_code::DEVICE_DOESNT_EXIST),
            Some(CommandId::QueryDeviceState) => message
                .address()
                .and_then(|address| workgroup.device(address))
                .map(|d| d.state.bits().to_string())
                .ok_or(error_code::DEVICE_DOESNT_EXIST),
            Some(CommandId::QueryTime) => Ok(workgroup.time().to_string()),
            _ => Err(error_code::INVALID_MESSAGE_COMMAND),
        };

        match answer {
            Ok(answer) => reply.with_answer(answer),
            Err(code) => Message {
                frame_type: FrameType::Error,
                ..reply.with_answer(code.to_string())
            },
        }
    }
}

fn join<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: ToString,
{
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Renders a reply as one or more frames. Every frame but the last ends in the
/// partial terminator. Answers are only split at the delimiter.
fn split_answer(reply: &Message, max_answer_len: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    for piece in reply.answer.split(DELIMITER) {
        match chunks.last_mut() {
            Some(chunk) if chunk.len() + 1 + piece.len() <= max_answer_len => {
                chunk.push(DELIMITER);
                chunk.push_str(piece);
            }
            _ => chunks.push(piece.to_string()),
        }
    }

    let last = chunks.len().saturating_sub(1);
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, answer)| {
            let mut frame = Message {
                answer,
                ..reply.clone()
            }
            .to_string();
            if i < last {
                frame.pop();
                frame.push(PARTIAL_TERMINATOR);
            }
            frame
        })
        .collect()
}
