//! Reconnecting live session for one contract.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use futures::{SinkExt, StreamExt};
use sbpro_types::{Contract, Symbol, Tick};
use sbpro_wire::{
    DecodeError, DelimitedCodec, FrameError, StreamResponse, decode_stream_response, poll_request,
};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ClientConfig;

type LiveConnection = Framed<TcpStream, DelimitedCodec>;

/// Where a [`StreamingSession`] is in its connection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Dialing the live server.
    Connecting,
    /// Presenting the client key.
    Authenticating,
    /// Requesting ticks newer than the cursor.
    Polling,
    /// Waiting before the next connection attempt.
    Backoff,
    /// Finished for good.
    Stopped,
}

/// Why a [`StreamingSession`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The shutdown token was cancelled.
    Shutdown,
    /// The receiving side of the tick channel was dropped.
    ConsumerGone,
}

/// Failure of one connection cycle. Every variant leads to a reconnect.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The live server could not be reached.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Server address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading or writing a frame failed.
    #[error("transport error: {0}")]
    Frame(#[from] FrameError),

    /// A poll response could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The server closed the connection between frames.
    #[error("server closed the connection")]
    Closed,

    /// No response arrived within the read deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The server asked the client to disconnect.
    #[error("server requested shutdown")]
    ServerShutdown,
}

/// Connection settings shared by every session of a client.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Live server address (`host:port`).
    pub server: String,
    /// Client access key sent after connecting.
    pub key: String,
    /// Feed timezone for tick timestamps.
    pub timezone: Tz,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Delay before reconnecting.
    pub reconnect_delay: Duration,
    /// Optional deadline per response.
    pub read_timeout: Option<Duration>,
}

impl SessionOptions {
    /// Takes the live settings from a client config.
    #[must_use]
    pub fn from_config(config: &ClientConfig, key: impl Into<String>) -> Self {
        Self {
            server: config.live_server.clone(),
            key: key.into(),
            timezone: config.timezone,
            poll_interval: config.poll_interval(),
            reconnect_delay: config.reconnect_delay(),
            read_timeout: config.read_timeout(),
        }
    }
}

/// Polls the live server for one contract and forwards its ticks.
///
/// The session reconnects after every failure, keeping its sequence cursor,
/// and stops only when the shutdown token is cancelled or the tick receiver
/// is dropped.
#[derive(Debug)]
pub struct StreamingSession {
    pair: String,
    contract: String,
    divisor: f64,
    options: Arc<SessionOptions>,
    cursor: u64,
    state: SessionState,
    output: mpsc::Sender<Tick>,
    shutdown: CancellationToken,
}

impl StreamingSession {
    /// Creates a session for `contract` of `symbol`.
    #[must_use]
    pub fn new(
        symbol: &Symbol,
        contract: Contract,
        options: Arc<SessionOptions>,
        output: mpsc::Sender<Tick>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pair: symbol.name().to_string(),
            contract: contract.to_string(),
            divisor: symbol.divisor_f64(),
            options,
            cursor: 0,
            state: SessionState::Connecting,
            output,
            shutdown,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the highest tick number received so far.
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Returns the contract textual id.
    #[must_use]
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Runs connection cycles until shutdown or until the consumer is gone.
    pub async fn run(&mut self) -> SessionExit {
        info!(pair = %self.pair, contract = %self.contract, "live session started");

        let exit = loop {
            match self.connection_cycle().await {
                Ok(exit) => break exit,
                Err(SessionError::ServerShutdown) => {
                    info!(
                        pair = %self.pair,
                        contract = %self.contract,
                        cursor = self.cursor,
                        "server requested shutdown, reconnecting"
                    );
                }
                Err(e) => {
                    warn!(
                        pair = %self.pair,
                        contract = %self.contract,
                        cursor = self.cursor,
                        error = %e,
                        "live session error, reconnecting"
                    );
                }
            }

            self.transition(SessionState::Backoff);
            tokio::select! {
                () = self.shutdown.cancelled() => break SessionExit::Shutdown,
                () = self.output.closed() => break SessionExit::ConsumerGone,
                () = tokio::time::sleep(self.options.reconnect_delay) => {}
            }
        };

        self.transition(SessionState::Stopped);
        info!(pair = %self.pair, contract = %self.contract, ?exit, "live session stopped");
        exit
    }

    /// Connects, authenticates, then polls until something fails.
    async fn connection_cycle(&mut self) -> Result<SessionExit, SessionError> {
        self.transition(SessionState::Connecting);
        let addr = self.options.server.as_str();
        let stream = tokio::select! {
            () = self.shutdown.cancelled() => return Ok(SessionExit::Shutdown),
            connected = TcpStream::connect(addr) => {
                connected.map_err(|source| SessionError::Connect {
                    addr: addr.to_string(),
                    source,
                })?
            }
        };
        let mut conn = Framed::new(stream, DelimitedCodec::new());

        self.transition(SessionState::Authenticating);
        conn.send(self.options.key.as_str()).await?;

        self.transition(SessionState::Polling);
        loop {
            let request = poll_request(&self.pair, &self.contract, self.cursor);
            conn.send(request.as_str()).await?;

            let response = tokio::select! {
                () = self.shutdown.cancelled() => return Ok(SessionExit::Shutdown),
                response = self.read_response(&mut conn) => response?,
            };

            let batch = match decode_stream_response(
                &response,
                &self.pair,
                &self.contract,
                self.divisor,
                self.options.timezone,
            )? {
                StreamResponse::Shutdown => return Err(SessionError::ServerShutdown),
                StreamResponse::Ticks(batch) => batch,
            };

            let received = batch.len();
            let max_sequence = batch.max_sequence;
            for tick in batch.ticks {
                tokio::select! {
                    () = self.shutdown.cancelled() => return Ok(SessionExit::Shutdown),
                    sent = self.output.send(tick) => {
                        if sent.is_err() {
                            return Ok(SessionExit::ConsumerGone);
                        }
                    }
                }
            }

            if received > 0 {
                self.cursor = self.cursor.max(max_sequence);
                debug!(contract = %self.contract, received, cursor = self.cursor, "ticks received");
            }

            tokio::select! {
                () = self.shutdown.cancelled() => return Ok(SessionExit::Shutdown),
                () = self.output.closed() => return Ok(SessionExit::ConsumerGone),
                () = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }
    }

    async fn read_response(&self, conn: &mut LiveConnection) -> Result<String, SessionError> {
        let next = match self.options.read_timeout {
            Some(limit) => tokio::time::timeout(limit, conn.next())
                .await
                .map_err(|_| SessionError::Timeout(limit))?,
            None => conn.next().await,
        };
        let frame = next.ok_or(SessionError::Closed)?;
        frame.map_err(SessionError::from)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(contract = %self.contract, from = ?self.state, to = ?next, "session state");
            self.state = next;
        }
    }
}
