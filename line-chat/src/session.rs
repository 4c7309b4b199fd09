use std::{future::Future, net::SocketAddr};

use tokio::{
    io::{AsyncBufRead, AsyncWrite, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
    sync::oneshot,
    task::{JoinError, JoinHandle},
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    config::SessionConfig,
    error::SessionError,
    frame::{Frame, write_frame},
    inbound::{InboundEnd, run_inbound_loop},
    outbound::{OutboundEnd, read_username, run_outbound_loop},
};

/// How a session finished when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user interrupted the session.
    UserQuit,
    /// User input ended.
    InputClosed,
    /// The server closed the connection.
    PeerClosed,
}

/// An open connection whose reader has not been started yet.
#[derive(Debug)]
pub struct Connection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    config: SessionConfig,
}

impl Connection {
    pub async fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
        let addr = config.addr();
        let stream = match timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(SessionError::Connect { addr, source }),
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    addr,
                    timeout: config.connect_timeout,
                });
            }
        };

        let peer = stream.peer_addr()?;
        info!(%peer, "connected");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer,
            peer,
            config: config.clone(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Spawns the inbound reader, which writes server output to `output` from now on.
    pub fn start<O>(self, output: O) -> Session
    where
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let Connection {
            reader,
            writer,
            peer,
            config,
        } = self;

        let buffer_size = config.read_buffer_size;
        let inbound_mode = config.inbound_mode;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let reader_task: ReaderTask = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            run_inbound_loop(reader, output, buffer_size, inbound_mode, shutdown).await
        });

        Session {
            writer,
            peer,
            config,
            username: None,
            reader: Some(reader_task),
            shutdown: Some(shutdown_tx),
        }
    }
}

/// Outcome of asking the user for a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Username {
    Entered(String),
    /// The session ended while the prompt was waiting.
    Ended(SessionEnd),
}

/// A connection whose inbound reader is running.
///
/// `reader` is `None` once the reader task has been awaited to completion, which outside of
/// teardown only happens when the server closed the connection.
#[derive(Debug)]
pub struct Session {
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    config: SessionConfig,
    username: Option<String>,
    reader: Option<ReaderTask>,
    shutdown: Option<oneshot::Sender<()>>,
}

type ReaderTask = JoinHandle<std::io::Result<InboundEnd>>;
type ReaderJoin = Result<std::io::Result<InboundEnd>, JoinError>;

impl Session {
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Asks for a username on `input` while the reader keeps watching the server.
    pub async fn prompt_username<I, P, C>(
        &mut self,
        input: &mut I,
        prompt: &mut P,
        cancel: C,
    ) -> Result<Username, SessionError>
    where
        I: AsyncBufRead + Unpin,
        P: AsyncWrite + Unpin,
        C: Future<Output = ()>,
    {
        let prompt = self.config.prompt.then_some(prompt);
        let Some(reader) = self.reader.as_mut() else {
            return Ok(Username::Ended(SessionEnd::PeerClosed));
        };

        let raced = select! {
            entered = read_username(input, prompt) => Raced::Input(entered),
            _ = cancel => Raced::Cancelled,
            joined = reader => Raced::Reader(joined),
        };

        match raced {
            Raced::Input(entered) => Ok(match entered? {
                Some(username) => Username::Entered(username),
                None => Username::Ended(SessionEnd::InputClosed),
            }),
            Raced::Cancelled => Ok(Username::Ended(SessionEnd::UserQuit)),
            Raced::Reader(joined) => {
                self.reader = None;
                reader_outcome(joined).map(|_| Username::Ended(SessionEnd::PeerClosed))
            }
        }
    }

    /// Announces `username` with a register frame. A blank name is rejected before anything is
    /// written; otherwise the name is sent exactly as given.
    pub async fn register(&mut self, username: &str) -> Result<(), SessionError> {
        if self.username.is_some() {
            return Err(SessionError::AlreadyRegistered);
        }
        if username.trim().is_empty() {
            return Err(SessionError::InvalidUsername);
        }

        let frame = Frame::register(username)?;
        write_frame(&mut self.writer, &frame).await?;
        info!(username, "registered");

        self.username = Some(username.to_string());
        Ok(())
    }

    /// Relays until the user cancels, input ends, or the server closes the connection.
    ///
    /// Lines from `input` are sent as message frames, with `prompt` shown before each one when
    /// prompting is enabled. The reader task has always exited and the connection is closed by
    /// the time this returns.
    pub async fn relay<I, P, C>(
        mut self,
        mut input: I,
        mut prompt: P,
        cancel: C,
    ) -> Result<SessionEnd, SessionError>
    where
        I: AsyncBufRead + Unpin,
        P: AsyncWrite + Unpin,
        C: Future<Output = ()>,
    {
        let prompt = self.config.prompt.then_some(&mut prompt);
        let result = match self.reader.as_mut() {
            None => Ok(SessionEnd::PeerClosed),
            Some(reader) => {
                let stop = async move {
                    select! {
                        _ = cancel => Stop::User,
                        joined = reader => Stop::Reader(joined),
                    }
                };
                let outbound = run_outbound_loop(&mut input, &mut self.writer, prompt, stop).await;
                match outbound {
                    Ok(OutboundEnd::Stopped(Stop::User)) => Ok(SessionEnd::UserQuit),
                    Ok(OutboundEnd::Stopped(Stop::Reader(joined))) => {
                        self.reader = None;
                        reader_outcome(joined).map(|_| SessionEnd::PeerClosed)
                    }
                    Ok(OutboundEnd::InputClosed) => Ok(SessionEnd::InputClosed),
                    Err(err) => Err(err),
                }
            }
        };

        self.finish(result).await
    }

    /// Tears the session down without relaying, reporting `end` as the outcome.
    pub async fn close(self, end: SessionEnd) -> Result<SessionEnd, SessionError> {
        self.finish(Ok(end)).await
    }

    async fn finish(
        mut self,
        result: Result<SessionEnd, SessionError>,
    ) -> Result<SessionEnd, SessionError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(reader) = self.reader.take() {
            let reader_end = reader_outcome(reader.await);
            debug!(?reader_end, "inbound reader stopped");
        }

        close_writer(&mut self.writer).await;
        info!(?result, "session closed");
        result
    }
}

enum Raced {
    Input(std::io::Result<Option<String>>),
    Cancelled,
    Reader(ReaderJoin),
}

enum Stop {
    User,
    Reader(ReaderJoin),
}

fn reader_outcome(joined: ReaderJoin) -> Result<InboundEnd, SessionError> {
    match joined {
        Ok(Ok(end)) => Ok(end),
        Ok(Err(err)) => {
            warn!(error = ?err, "inbound reader failed");
            Err(SessionError::Io(err))
        }
        Err(err) => {
            warn!(error = ?err, "inbound reader task did not complete");
            Err(SessionError::ReaderPanicked)
        }
    }
}

async fn close_writer(writer: &mut OwnedWriteHalf) {
    if let Err(error) = writer.shutdown().await {
        debug!(?error, "failed to shut down connection writer cleanly");
    }
}
