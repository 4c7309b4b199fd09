//! Line-oriented TCP chat client.
//!
//! A session owns one TCP connection. As soon as it connects, a spawned reader task prints
//! whatever the server pushes. Once a `$name\r\n` register frame is sent, the outbound loop sends
//! each line the user types as a `#text\r\n` message frame.
//!
//! - [`cli`] parses the command line.
//! - [`config`] holds the connection defaults and [`config::SessionConfig`].
//! - [`frame`] encodes and decodes the prefix framing.
//! - [`inbound`] reads and displays server output.
//! - [`outbound`] turns user input into message frames.
//! - [`session`] connects, starts the reader, registers, and supervises both loops until teardown.
//! - [`error`] defines the error types shared by the modules above.
//!
//! Integration tests drive [`session`] against an in-process loopback listener.

pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod inbound;
pub mod outbound;
pub mod session;
