//! # HelvarNET Router Emulation
//!
//! This crate provides a small HelvarNET router that serves the ASCII protocol from an
//! in-memory description of a lighting network. It is used to test clients without
//! access to real hardware.
//!
//! ## Architecture
//!
//! The crate is built around two main components:
//!
//! - **[`Workgroup`] Trait**: Defines the data a router answers queries from and the
//!   hook that receives control commands
//! - **[`server::Server`]**: A generic server that handles protocol communication,
//!   message parsing, and client connections
//!
//! [`network::Network`] implements [`Workgroup`] for a network loaded from YAML:
//!
//! ```yaml
//! clusters:
//!   - id: 1
//! routers:
//!   - id: 251
//! groups:
//!   - id: 11
//!     name: Group 11
//!     devices:
//!       - address: 1.251.1.1
//!         name: Lamp 1 in Group 11
//! ```
//!
//! ## Basic Usage
//!
//! ```ignore
//! use helvar_router::{network::Network, server::Server};
//!
//! let network = Network::from_yaml_file("network.yml")?;
//! let server = Server::new(network, Default::default());
//! server.listen("127.0.0.1:50000")?;
//! ```
//!
//! ## Replies
//!
//! - Control commands (recall scene, direct level) are passed to [`Workgroup::control`]
//!   and never answered
//! - Supported queries are answered with a reply carrying the query parameters
//! - Answers longer than [`server::Config::max_answer_len`] are split into partial frames
//! - Unknown groups, devices and commands are answered with an error frame
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics: client connections and disconnections
//! at info level, every message received and sent at debug level.
//!
//! ## Thread Model
//!
//! Every client connection is served on its own thread.
use helvar_protocol::{
    Message,
    members::{Device, Group},
};

pub mod network;
pub mod server;

/// Error codes sent in the answer of error frames.
pub mod error_code {
    pub const INVALID_GROUP_INDEX: u8 = 1;
    pub const DEVICE_DOESNT_EXIST: u8 = 11;
    pub const INVALID_MESSAGE_COMMAND: u8 = 15;
}

/// The lighting network a router answers queries about.
///
/// Implementations must be shareable between the threads serving clients.
pub trait Workgroup: Send + Sync + 'static {
    fn cluster_ids(&self) -> Vec<u8>;

    fn router_ids(&self) -> Vec<u8>;

    fn groups(&self) -> &[Group];

    fn group(&self, id: u16) -> Option<&Group> {
        self.groups().iter().find(|g| g.id == id)
    }

    fn device(&self, address: &str) -> Option<&Device> {
        self.groups()
            .iter()
            .flat_map(|g| g.devices.iter())
            .find(|d| d.address == address)
    }

    /// Seconds since the unix epoch
    fn time(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    /// Receives control commands, which are never answered.
    fn control(&self, message: &Message) {
        log::info!("Control command {}", message);
    }
}
