//! # HelvarNET Protocol Library
//!
//! This crate provides a Rust implementation of the ASCII variant of the HelvarNET protocol,
//! used to query and control Helvar lighting routers over TCP.
//!
//! ## Overview
//!
//! A controller sends commands to a router. Query commands are answered with a reply that
//! carries the parameters of the query and an answer; control commands are not answered.
//! This library implements the message format, allowing you to:
//!
//! - Serialize and deserialize protocol messages
//! - Reassemble replies that a router splits across several frames
//! - Build control commands (recall scene, direct level, colour) and queries
//!
//! ## Basic Usage
//!
//! ### Parsing a Reply
//!
//! ```
//! use helvar_protocol::{Message, FrameType, command::CommandId};
//!
//! let reply = Message::decode_partial("?V:1,C:165=1,2$?V:1,C:165=3,4#").expect("Reply should parse");
//! assert_eq!(reply.frame_type, FrameType::Reply);
//! assert_eq!(reply.command(), Some(CommandId::QueryGroups));
//! assert_eq!(reply.answer_integers().unwrap(), vec![1, 2, 3, 4]);
//! assert!(reply.is_partial);
//! ```
//!
//! ### Building Commands
//!
//! ```
//! use helvar_protocol::command::{self, Destination};
//! use helvar_protocol::Parameter;
//!
//! let msg = command::recall_scene(Destination::Group(2), 3, 4, &[Parameter::fade_time(100)]);
//! assert_eq!(msg.to_string(), ">V:1,C:11,G:2,B:3,S:4,F:100#");
//! ```
//!
//! ## Message Format
//!
//! `<type><parameter>[,<parameter>...][=<answer>]<terminator>`
//!
//! - **type**: `>` command, `<` internal command, `?` reply, `!` error
//! - **parameter**: `<key>:<value>`, or `@<address>` for device addresses
//! - **terminator**: `#`, or `$` for a chunk of a reply that continues in the next frame
//!
//! Floating point values are always written with two decimals.
//!
//! ## Error Handling
//!
//! This library uses the [`error::ReadError`] type for protocol parsing errors.
//!
//! ## Features
//!
//! - `tokio`: a [`tokio_util::codec`] implementation in [`framed`]
//! - `serde`: `Deserialize` for the types in [`members`]

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod color;
pub mod command;
pub mod error;
#[cfg(feature = "tokio")]
pub mod framed;
pub mod members;
