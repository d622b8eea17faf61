//! # EDDN Relay Ingestor
//!
//! Subscribes to the EDDN relay over ZeroMQ and feeds every frame through the
//! decoder and the [`Dispatcher`].
//! Location: lib_common/src/ingestors/eddn_relay.rs
//!
//! The loop is single-threaded: one receive, then decode and dispatch to
//! completion, then the next receive. Each receive is bounded by a timeout;
//! an idle relay only produces a notice. A shutdown broadcast cancels the
//! pending receive and ends the loop.

use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use zeromq::{Socket, SocketRecv, SubSocket, ZmqError};

use crate::core::dispatcher::{DispatchError, Dispatcher};
use crate::eddn::decode_frame;

/// Public EDDN relay.
pub const DEFAULT_RELAY: &str = "tcp://eddn.edcd.io:9500";
/// How long a receive may wait before the idle notice is logged.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for the relay subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub endpoint: String,
    pub recv_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RELAY.to_string(),
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: ZmqError,
    },

    #[error("Failed to subscribe on {endpoint}: {source}")]
    Subscribe {
        endpoint: String,
        #[source]
        source: ZmqError,
    },

    #[error("Relay receive failed: {0}")]
    Receive(#[from] ZmqError),

    #[error(transparent)]
    Dispatch(DispatchError),
}

/// Anything that can hand the loop raw relay frames.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Waits for the next frame. An empty frame is skipped by the loop.
    async fn recv_frame(&mut self) -> Result<Vec<u8>, FeedError>;
}

/// A ZeroMQ SUB socket subscribed to every topic on the relay.
pub struct RelaySubscriber {
    socket: SubSocket,
}

impl RelaySubscriber {
    pub async fn connect(endpoint: &str) -> Result<Self, FeedError> {
        let mut socket = SubSocket::new();
        socket
            .connect(endpoint)
            .await
            .map_err(|source| FeedError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        socket
            .subscribe("")
            .await
            .map_err(|source| FeedError::Subscribe {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self { socket })
    }

    /// Like [`connect`](Self::connect), but gives up when `shutdown` fires.
    ///
    /// A refused connection is retried by the socket indefinitely, so this is
    /// the only way an interrupt can end a connect to an unreachable relay.
    /// Returns `Ok(None)` on shutdown.
    pub async fn connect_until(
        endpoint: &str,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<Option<Self>, FeedError> {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                log::info!("Connect to {} abandoned on shutdown.", endpoint);
                Ok(None)
            }
            connected = Self::connect(endpoint) => connected.map(Some),
        }
    }
}

impl FrameSource for RelaySubscriber {
    async fn recv_frame(&mut self) -> Result<Vec<u8>, FeedError> {
        let message = self.socket.recv().await?;
        // EDDN publishes single-part messages.
        Ok(message.get(0).map(|part| part.to_vec()).unwrap_or_default())
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Non-empty frames received.
    pub frames: u64,
    /// Frames dropped because they failed to decode or were malformed.
    pub skipped: u64,
    /// Receives that hit the timeout.
    pub idle_timeouts: u64,
}

pub struct RelayIngestor {
    recv_timeout: Duration,
}

impl RelayIngestor {
    pub fn new(recv_timeout: Duration) -> Self {
        Self { recv_timeout }
    }

    /// Primary execution loop. Returns when `shutdown` fires (or its sender
    /// is dropped), or with the first fatal error.
    pub async fn run<S, W>(
        &self,
        source: &mut S,
        dispatcher: &mut Dispatcher<W>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunSummary, FeedError>
    where
        S: FrameSource,
        W: Write,
    {
        let mut summary = RunSummary::default();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    log::info!("Disconnecting from EDDN.");
                    break;
                }
                received = tokio::time::timeout(self.recv_timeout, source.recv_frame()) => {
                    match received {
                        Ok(frame) => self.handle_frame(&frame?, dispatcher, &mut summary)?,
                        Err(_) => {
                            summary.idle_timeouts += 1;
                            log::info!(
                                "No message received in the last {}. Still listening...",
                                describe_timeout(self.recv_timeout)
                            );
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    fn handle_frame<W: Write>(
        &self,
        frame: &[u8],
        dispatcher: &mut Dispatcher<W>,
        summary: &mut RunSummary,
    ) -> Result<(), FeedError> {
        if frame.is_empty() {
            return Ok(());
        }
        summary.frames += 1;

        let envelope = match decode_frame(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                summary.skipped += 1;
                log::warn!("Skipping undecodable frame ({} bytes): {}", frame.len(), e);
                return Ok(());
            }
        };

        match dispatcher.dispatch(&envelope) {
            Ok(outcome) => {
                log::trace!("{:?} -> {:?}", envelope.event(), outcome);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(FeedError::Dispatch(e)),
            Err(e) => {
                summary.skipped += 1;
                log::warn!("Skipping frame: {}", e);
                Ok(())
            }
        }
    }
}

/// "10 minutes" for whole minutes, otherwise seconds.
fn describe_timeout(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    match secs {
        60 => "minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "second".to_string(),
        s if s > 0 => format!("{} seconds", s),
        _ => format!("{} ms", timeout.as_millis()),
    }
}
