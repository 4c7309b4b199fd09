use std::{future::Future, io};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    select,
};
use tracing::{debug, info, warn};

use crate::{
    error::SessionError,
    frame::{Frame, write_frame},
};

pub const INPUT_PROMPT: &str = "> ";
pub const USERNAME_PROMPT: &str = "Insert username: ";

/// Why the outbound loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundEnd<T> {
    /// The stop future resolved with this value.
    Stopped(T),
    /// User input reached end of file.
    InputClosed,
}

/// Forwards every line of `input` to `writer` as a message frame until `stop` resolves or
/// input runs out.
///
/// Empty and whitespace-only lines are sent as typed. Only the line terminator is removed.
/// `stop` is only raced against waiting for input, so a frame is never cut off mid-write.
pub async fn run_outbound_loop<I, W, P, C>(
    input: &mut I,
    writer: &mut W,
    mut prompt: Option<&mut P>,
    stop: C,
) -> Result<OutboundEnd<C::Output>, SessionError>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    P: AsyncWrite + Unpin,
    C: Future,
{
    tokio::pin!(stop);
    let mut line = String::new();

    loop {
        if let Some(prompt) = prompt.as_mut() {
            show_prompt(prompt, INPUT_PROMPT).await?;
        }

        line.clear();
        let bytes_read = select! {
            stopped = &mut stop => {
                info!("outbound loop stopped");
                return Ok(OutboundEnd::Stopped(stopped));
            }
            read = input.read_line(&mut line) => read?,
        };
        if bytes_read == 0 {
            info!("user input closed");
            return Ok(OutboundEnd::InputClosed);
        }

        match Frame::message(strip_line_ending(&line)) {
            Ok(frame) => {
                write_frame(writer, &frame).await?;
                debug!(bytes = frame.payload().len(), "sent message");
            }
            Err(err) => warn!(error = %err, "skipping line that cannot be framed"),
        }
    }
}

/// Asks for a username until a non-blank one is entered. Returns `None` when input ends first.
pub async fn read_username<I, P>(
    input: &mut I,
    mut prompt: Option<&mut P>,
) -> io::Result<Option<String>>
where
    I: AsyncBufRead + Unpin,
    P: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        if let Some(prompt) = prompt.as_mut() {
            show_prompt(prompt, USERNAME_PROMPT).await?;
        }

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let username = strip_line_ending(&line);
        if !username.trim().is_empty() {
            return Ok(Some(username.to_string()));
        }
        warn!("username cannot be empty");
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

async fn show_prompt<P>(prompt: &mut P, text: &str) -> io::Result<()>
where
    P: AsyncWrite + Unpin,
{
    prompt.write_all(text.as_bytes()).await?;
    prompt.flush().await
}
