//! # HelvarNET Client
//!
//! A Rust client library for querying and controlling Helvar lighting routers
//! over the ASCII HelvarNET protocol.
//!
//! ## Overview
//!
//! The [`Client`] keeps a pool of TCP connections to a router. All connections pull
//! requests from one bounded queue, so several threads can share a client and issue
//! requests concurrently. Each connection serves one request at a time: it writes the
//! request and, unless the command is not answered by the router, waits for the reply.
//!
//! Idle connections send a time query every [`Config::keep_alive`]. A connection whose
//! request or keep-alive fails on the wire reports the error on its error channel and
//! stops. Requests refused before writing, like oversized frames, only fail the caller.
//! The pool is not refilled; reconnecting is up to the caller.
//!
//! For detailed protocol information, see the [`helvar_protocol`] crate.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use helvar_client::Client;
//! use helvar_protocol::command::Destination;
//!
//! let client = Client::new("10.254.1.1", helvar_client::DEFAULT_PORT);
//! let errors = client.connect(4, 16)?;
//!
//! for group in client.groups()? {
//!     println!("{}: {}", group.id, client.group_name(group.id)?);
//! }
//! client.recall_scene(Destination::Group(12), 1, 3, &[])?;
//!
//! client.disconnect();
//! ```
//!
//! ## Logging
//!
//! This crate uses the `log` crate. Every frame sent and received is logged at debug level.
use std::{
    net::TcpStream,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crossbeam_channel::{Receiver, Sender, bounded};
use helvar_protocol::{
    FrameType, Message, Parameter,
    color::Chromaticity,
    command::{self, Destination},
    error::ReadError,
    members::{Cluster, Device, DeviceState, Group, Router},
};

mod error;
mod transceiver;

pub use error::Error;
pub use transceiver::{Reply, TransceiveError};
use transceiver::{Exchange, Transceiver};

/// TCP port routers listen on
pub const DEFAULT_PORT: u16 = 50000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Idle time after which a connection sends a keep-alive query
    pub keep_alive: Duration,
    /// TCP read and write timeout, none by default
    pub read_write_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(120),
            read_write_timeout: None,
        }
    }
}

/// Builder to create a [Client] instance and modify configuration options
///
/// # Example
///
/// ```
/// use helvar_client::Builder;
/// use std::time::Duration;
///
/// let client = Builder::new()
///     .keep_alive(Duration::from_secs(30))
///     .rw_timeout(Duration::from_secs(5))
///     .build("localhost", helvar_client::DEFAULT_PORT);
/// assert_eq!(client.address(), "127.0.0.1:50000");
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the idle time after which a keep-alive query is sent
    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.keep_alive = keep_alive;
        self
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = Some(timeout);
        self
    }

    /// Build and return the client
    pub fn build(self, host: &str, port: u16) -> Client {
        Client::with_config(host, port, self.config)
    }
}

enum State {
    Unconnected,
    Connected(Sender<Exchange>),
    Disconnected,
}

/// HelvarNET client backed by a pool of connections.
pub struct Client {
    address: String,
    config: Config,
    state: Mutex<State>,
}

impl Client {
    pub fn new(host: &str, port: u16) -> Client {
        Client::with_config(host, port, Config::default())
    }

    pub fn with_config(host: &str, port: u16, config: Config) -> Client {
        let host = if host == "localhost" { "127.0.0.1" } else { host };
        Client {
            address: format!("{}:{}", host, port),
            config,
            state: Mutex::new(State::Unconnected),
        }
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    /// The `host:port` this client connects to
    pub fn address(&self) -> &str {
        &self.address
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> std::io::Result<TcpStream> {
        let tcp = TcpStream::connect(&self.address)?;
        tcp.set_read_timeout(self.config.read_write_timeout)?;
        tcp.set_write_timeout(self.config.read_write_timeout)?;
        Ok(tcp)
    }

    /// Opens `transceivers` connections sharing a queue of `queue_capacity` requests.
    ///
    /// Returns one channel per connection that yields the error which stopped it.
    /// If any connection cannot be opened, those opened so far are closed and
    /// the client stays unconnected.
    pub fn connect(
        &self,
        transceivers: usize,
        queue_capacity: usize,
    ) -> Result<Vec<Receiver<TransceiveError>>, Error> {
        let mut state = self.state();
        if matches!(*state, State::Connected(_)) {
            return Err(Error::AlreadyConnected);
        }

        let mut streams = Vec::with_capacity(transceivers);
        for index in 1..=transceivers {
            match self.open() {
                Ok(tcp) => streams.push(tcp),
                Err(source) => {
                    log::error!(
                        "Connection #{} to {} failed, closing {} open connection(s)",
                        index,
                        self.address,
                        streams.len()
                    );
                    for tcp in streams {
                        let _ = tcp.shutdown(std::net::Shutdown::Both);
                    }
                    return Err(Error::Connect {
                        index,
                        address: self.address.clone(),
                        source,
                    });
                }
            }
        }

        let (queue, queue_rx) = bounded(queue_capacity);
        let mut errors = Vec::with_capacity(transceivers);
        for (i, tcp) in streams.into_iter().enumerate() {
            // Transceivers started so far stop once `queue` is dropped
            let errors_rx = Transceiver::new(i + 1, tcp, queue_rx.clone(), self.config.keep_alive)
                .and_then(Transceiver::spawn)
                .map_err(|source| Error::Connect {
                    index: i + 1,
                    address: self.address.clone(),
                    source,
                })?;
            errors.push(errors_rx);
        }

        log::info!(
            "Connected to {} with {} transceiver(s)",
            self.address,
            transceivers
        );
        *state = State::Connected(queue);
        Ok(errors)
    }

    /// Closes the request queue.
    ///
    /// Requests already queued are still served, after which every connection is closed.
    /// Later calls to [`Client::transceive`] fail with [`Error::Disconnected`].
    pub fn disconnect(&self) {
        let mut state = self.state();
        if matches!(*state, State::Connected(_)) {
            log::info!("Disconnecting from {}", self.address);
        }
        *state = State::Disconnected;
    }

    /// Number of requests waiting for a free connection
    pub fn queued(&self) -> usize {
        match &*self.state() {
            State::Connected(queue) => queue.len(),
            State::Unconnected | State::Disconnected => 0,
        }
    }

    /// Sends a message and waits for its reply.
    ///
    /// Blocks while the queue is full. Returns `None` for commands that are not
    /// answered by the router. An error frame from the router is returned as
    /// [`Error::Remote`].
    pub fn transceive(&self, msg: Message) -> Result<Option<Message>, Error> {
        let queue = match &*self.state() {
            State::Unconnected => return Err(Error::NotConnected),
            State::Disconnected => return Err(Error::Disconnected),
            State::Connected(queue) => queue.clone(),
        };

        let (reply, reply_rx) = bounded(1);
        queue
            .send(Exchange {
                request: msg,
                reply,
            })
            .map_err(|_| Error::PoolExhausted)?;
        drop(queue);

        match reply_rx.recv().map_err(|_| Error::ReplyDropped)?? {
            Some(msg) if msg.frame_type == FrameType::Error => Err(Error::Remote {
                answer: msg.answer.clone(),
                frame: msg.to_string(),
            }),
            reply => Ok(reply),
        }
    }

    fn query(&self, msg: Message) -> Result<Message, Error> {
        let command = msg.command();
        self.transceive(msg)?.ok_or(Error::MissingReply(command))
    }

    fn query_ids<T: TryFrom<i64>>(&self, msg: Message) -> Result<Vec<T>, Error> {
        let reply = self.query(msg)?;
        if reply.answer.is_empty() {
            return Ok(Vec::new());
        }
        reply
            .answer_integers()?
            .into_iter()
            .map(|id| T::try_from(id).map_err(|_| ReadError::InvalidAnswer(id.to_string()).into()))
            .collect()
    }

    pub fn clusters(&self) -> Result<Vec<Cluster>, Error> {
        let ids: Vec<u8> = self.query_ids(command::query_clusters())?;
        Ok(ids.into_iter().map(|id| Cluster { id }).collect())
    }

    /// Routers of the cluster with the given address, e.g. `1`.
    pub fn routers(&self, cluster: &str) -> Result<Vec<Router>, Error> {
        let ids: Vec<u8> = self.query_ids(command::query_routers(cluster))?;
        Ok(ids.into_iter().map(|id| Router { id }).collect())
    }

    /// The groups of the workgroup. Only the identifier of each group is filled in.
    pub fn groups(&self) -> Result<Vec<Group>, Error> {
        let ids: Vec<u16> = self.query_ids(command::query_groups())?;
        Ok(ids
            .into_iter()
            .map(|id| Group {
                id,
                ..Group::default()
            })
            .collect())
    }

    pub fn group_name(&self, group: u16) -> Result<String, Error> {
        Ok(self.query(command::query_group_description(group))?.answer)
    }

    /// The devices of a group. Only the address of each device is filled in.
    pub fn group_devices(&self, group: u16) -> Result<Vec<Device>, Error> {
        let reply = self.query(command::query_group(group))?;
        if reply.answer.is_empty() {
            return Ok(Vec::new());
        }
        Ok(reply
            .answer_strings()
            .into_iter()
            .map(|address| Device {
                address: address.trim_start_matches('@').to_string(),
                ..Device::default()
            })
            .collect())
    }

    pub fn device_name(&self, address: &str) -> Result<String, Error> {
        Ok(self.query(command::query_device_description(address))?.answer)
    }

    pub fn device_state(&self, address: &str) -> Result<DeviceState, Error> {
        let reply = self.query(command::query_device_state(address))?;
        let bits = reply
            .answer
            .parse::<u32>()
            .map_err(|_| ReadError::InvalidAnswer(reply.answer.clone()))?;
        Ok(DeviceState(bits))
    }

    /// The time of the router network.
    pub fn network_time(&self) -> Result<SystemTime, Error> {
        let reply = self.query(command::query_time())?;
        let invalid = || ReadError::InvalidAnswer(reply.answer.clone());
        let timestamp = reply.answer.parse::<i64>().map_err(|_| invalid())?;
        let offset = Duration::from_secs(timestamp.unsigned_abs());
        let time = if timestamp >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        Ok(time.ok_or_else(invalid)?)
    }

    pub fn recall_scene(
        &self,
        destination: Destination<'_>,
        block: u8,
        scene: u8,
        extra: &[Parameter],
    ) -> Result<(), Error> {
        self.transceive(command::recall_scene(destination, block, scene, extra))
            .map(|_| ())
    }

    pub fn direct_level(
        &self,
        destination: Destination<'_>,
        level: u8,
        extra: &[Parameter],
    ) -> Result<(), Error> {
        self.transceive(command::direct_level(destination, level, extra))
            .map(|_| ())
    }

    pub fn color_temperature(
        &self,
        destination: Destination<'_>,
        kelvin: u16,
        level: u8,
        extra: &[Parameter],
    ) -> Result<(), Error> {
        self.transceive(command::color_temperature(destination, kelvin, level, extra))
            .map(|_| ())
    }

    pub fn color(
        &self,
        destination: Destination<'_>,
        color: impl Into<Chromaticity>,
        level: u8,
        extra: &[Parameter],
    ) -> Result<(), Error> {
        self.transceive(command::color(destination, color, level, extra))
            .map(|_| ())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn localhost_is_normalized() {
        assert_eq!(Client::new("localhost", 50000).address(), "127.0.0.1:50000");
        assert_eq!(Client::new("10.254.1.2", 60).address(), "10.254.1.2:60");
    }

    #[test]
    fn transceive_before_connect_fails() {
        let client = Client::new("localhost", DEFAULT_PORT);
        assert!(matches!(
            client.transceive(command::query_time()),
            Err(Error::NotConnected)
        ));
        assert_eq!(client.queued(), 0);
    }

    #[test]
    fn transceive_after_disconnect_fails() {
        let client = Client::new("localhost", DEFAULT_PORT);
        client.disconnect();
        assert!(matches!(
            client.transceive(command::query_time()),
            Err(Error::Disconnected)
        ));
    }

    #[test]
    fn builder_sets_config() {
        let client = Builder::new()
            .keep_alive(Duration::from_millis(10))
            .rw_timeout(Duration::from_secs(1))
            .build("host", 1);
        assert_eq!(client.config.keep_alive, Duration::from_millis(10));
        assert_eq!(client.config.read_write_timeout, Some(Duration::from_secs(1)));
    }
}
