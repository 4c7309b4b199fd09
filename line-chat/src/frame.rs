//! Client-to-server framing.
//!
//! Every frame is one tag byte, a UTF-8 payload, and a CRLF terminator:
//!
//! ```text
//! $alice\r\n     register the username "alice"
//! #hello\r\n     send the chat message "hello"
//! ```

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

const REGISTER_TAG: u8 = b'$';
const MESSAGE_TAG: u8 = b'#';
const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Register,
    Message,
}

impl FrameKind {
    fn tag(self) -> u8 {
        match self {
            FrameKind::Register => REGISTER_TAG,
            FrameKind::Message => MESSAGE_TAG,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, FrameError> {
        match tag {
            REGISTER_TAG => Ok(FrameKind::Register),
            MESSAGE_TAG => Ok(FrameKind::Message),
            other => Err(FrameError::UnknownTag(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    payload: String,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<String>) -> Result<Self, FrameError> {
        let payload = payload.into();
        if payload.contains(['\r', '\n']) {
            return Err(FrameError::LineBreakInPayload);
        }
        Ok(Self { kind, payload })
    }

    pub fn register(username: impl Into<String>) -> Result<Self, FrameError> {
        Self::new(FrameKind::Register, username)
    }

    pub fn message(text: impl Into<String>) -> Result<Self, FrameError> {
        Self::new(FrameKind::Message, text)
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(self.payload.len() + 3);
        encoded.push(self.kind.tag());
        encoded.extend_from_slice(self.payload.as_bytes());
        encoded.extend_from_slice(CRLF);
        encoded
    }

    /// Parses the frame at the start of `buf`, returning it with the number of bytes it spans.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), FrameError> {
        let (&tag, rest) = buf.split_first().ok_or(FrameError::Empty)?;
        let kind = FrameKind::from_tag(tag)?;
        let end = rest
            .windows(CRLF.len())
            .position(|window| window == CRLF)
            .ok_or(FrameError::Incomplete)?;
        let payload = std::str::from_utf8(&rest[..end]).map_err(|_| FrameError::InvalidUtf8)?;

        let frame = Self::new(kind, payload)?;
        Ok((frame, 1 + end + CRLF.len()))
    }
}

/// Writes `frame` with a single `write_all` and flushes it.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame.encode()).await?;
    writer.flush().await
}
