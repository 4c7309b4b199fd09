use std::{future::Future, io};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    select,
};
use tracing::debug;

use crate::cli::InboundMode;

/// Why the inbound reader stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundEnd {
    /// The server closed its side of the connection.
    PeerClosed,
    /// The owning session asked the reader to stop.
    Shutdown,
}

/// Incremental UTF-8 decoder that carries an incomplete trailing sequence over to the next chunk.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::with_capacity(self.pending.len());
        let mut input = self.pending.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    text.push_str(valid);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[invalid..];
                        }
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - input.len();
        self.pending.drain(..consumed);
        text
    }

    /// Flushes whatever is still held back, replacing it lossily.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

struct Display<W> {
    out: W,
    mode: InboundMode,
    line: String,
}

impl<W> Display<W>
where
    W: AsyncWrite + Unpin,
{
    fn new(out: W, mode: InboundMode) -> Self {
        Self {
            out,
            mode,
            line: String::new(),
        }
    }

    async fn show(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        match self.mode {
            InboundMode::Raw => {
                self.out.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    self.out.write_all(b"\n").await?;
                }
            }
            InboundMode::Lines => {
                self.line.push_str(text);
                while let Some(end) = self.line.find('\n') {
                    let line: String = self.line.drain(..=end).collect();
                    self.out
                        .write_all(line.trim_end_matches(['\r', '\n']).as_bytes())
                        .await?;
                    self.out.write_all(b"\n").await?;
                }
            }
        }
        self.out.flush().await
    }

    async fn finish(&mut self, rest: &str) -> io::Result<()> {
        self.show(rest).await?;
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.out.write_all(line.as_bytes()).await?;
            self.out.write_all(b"\n").await?;
        }
        self.out.flush().await
    }
}

/// Reads from the server until it closes the connection or `shutdown` resolves.
///
/// Every chunk is decoded and written to `output` according to `mode`. The read half is only
/// ever read from here; the outbound loop owns the write half.
pub async fn run_inbound_loop<R, W, S>(
    mut reader: R,
    output: W,
    buffer_size: usize,
    mode: InboundMode,
    shutdown: S,
) -> io::Result<InboundEnd>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut decoder = Utf8Decoder::default();
    let mut display = Display::new(output, mode);

    let end = loop {
        select! {
            _ = &mut shutdown => {
                debug!("inbound reader asked to stop");
                break InboundEnd::Shutdown;
            }
            read = reader.read(&mut buf) => {
                let bytes = read?;
                if bytes == 0 {
                    debug!("server closed the connection");
                    break InboundEnd::PeerClosed;
                }
                debug!(bytes, "received chunk");
                let text = decoder.decode(&buf[..bytes]);
                display.show(&text).await?;
            }
        }
    };

    display.finish(&decoder.finish()).await?;
    Ok(end)
}

#[cfg(test)]
mod tests {
    use std::future;

    use tokio::io::AsyncWriteExt;

    use super::*;

    #[test]
    fn decoder_joins_split_multibyte_characters() {
        let snowman = "☃".as_bytes();
        let mut decoder = Utf8Decoder::default();

        assert_eq!(decoder.decode(&[b'a', snowman[0]]), "a");
        assert_eq!(decoder.decode(&snowman[1..]), "☃");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"ok\xffgo"), "ok\u{FFFD}go");
    }

    #[test]
    fn decoder_flushes_dangling_prefix_lossily() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(&[0xe2, 0x98]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn raw_mode_ends_each_chunk_on_its_own_line() {
        let (mut server, client) = tokio::io::duplex(64);
        server.write_all(b"hi\npartial").await.expect("write");
        drop(server);

        let mut printed = Vec::new();
        let end = run_inbound_loop(client, &mut printed, 512, InboundMode::Raw, future::pending())
            .await
            .expect("inbound loop");

        assert_eq!(end, InboundEnd::PeerClosed);
        assert_eq!(printed, b"hi\npartial\n");
    }

    #[tokio::test]
    async fn raw_mode_keeps_unterminated_messages_apart() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut printed = Vec::new();

        let writer = async move {
            server.write_all(b"alice entered the chat.").await.expect("first message");
            tokio::task::yield_now().await;
            server.write_all(b"alice: hi").await.expect("second message");
        };
        let reader = run_inbound_loop(client, &mut printed, 512, InboundMode::Raw, future::pending());

        let (_, end) = tokio::join!(writer, reader);
        assert_eq!(end.expect("inbound loop"), InboundEnd::PeerClosed);
        assert_eq!(printed, b"alice entered the chat.\nalice: hi\n");
    }

    #[tokio::test]
    async fn raw_mode_does_not_double_existing_newlines() {
        let (mut server, client) = tokio::io::duplex(64);
        server.write_all(b"bob: yo\n").await.expect("write");
        drop(server);

        let mut printed = Vec::new();
        run_inbound_loop(client, &mut printed, 512, InboundMode::Raw, future::pending())
            .await
            .expect("inbound loop");

        assert_eq!(printed, b"bob: yo\n");
    }

    #[tokio::test]
    async fn lines_mode_reassembles_lines_across_reads() {
        let (mut server, client) = tokio::io::duplex(64);
        let mut printed = Vec::new();

        let writer = async move {
            server.write_all(b"hel").await.expect("first half");
            tokio::task::yield_now().await;
            server.write_all(b"lo\r\nbye").await.expect("second half");
        };
        let reader = run_inbound_loop(client, &mut printed, 4, InboundMode::Lines, future::pending());

        let (_, end) = tokio::join!(writer, reader);
        assert_eq!(end.expect("inbound loop"), InboundEnd::PeerClosed);
        assert_eq!(printed, b"hello\nbye\n");
    }

    #[tokio::test]
    async fn shutdown_unblocks_pending_read() {
        let (_server, client) = tokio::io::duplex(64);
        let mut printed = Vec::new();

        let end = run_inbound_loop(client, &mut printed, 512, InboundMode::Raw, async {})
            .await
            .expect("inbound loop");

        assert_eq!(end, InboundEnd::Shutdown);
        assert!(printed.is_empty());
    }
}
