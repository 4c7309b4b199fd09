use std::{io, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out after {timeout:?} connecting to {addr}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("connection i/o failed")]
    Io(#[from] io::Error),

    #[error("username cannot be empty")]
    InvalidUsername,

    #[error("username was already registered for this session")]
    AlreadyRegistered,

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("inbound reader stopped unexpectedly")]
    ReaderPanicked,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame payload must not contain CR or LF")]
    LineBreakInPayload,

    #[error("empty buffer")]
    Empty,

    #[error("frame is missing its CRLF terminator")]
    Incomplete,

    #[error("unexpected frame tag byte {0:#04x}")]
    UnknownTag(u8),

    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8,
}
