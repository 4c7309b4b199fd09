use std::time::Duration;

use crate::cli::{Cli, InboundMode};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6378;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const READ_BUFFER_SIZE: usize = 512;

/// Everything a [`Session`](crate::session::Session) needs to know before it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Upper bound on the bytes taken from the socket per read.
    pub read_buffer_size: usize,
    pub inbound_mode: InboundMode,
    /// Print `> ` before each line of user input.
    pub prompt: bool,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_buffer_size: READ_BUFFER_SIZE,
            inbound_mode: InboundMode::Raw,
            prompt: true,
        }
    }
}

impl From<&Cli> for SessionConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            port: cli.port,
            connect_timeout: Duration::from_secs(cli.connect_timeout),
            read_buffer_size: cli.buffer_size,
            inbound_mode: cli.inbound,
            prompt: !cli.no_prompt,
        }
    }
}
