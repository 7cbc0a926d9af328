//! TCP session handling for a single device.
//!
//! A [`DeviceLink`] owns exactly one TCP connection to one device and is
//! itself owned by exactly one poller task. Exchanges take `&mut self`,
//! so at most one command/response round trip can be outstanding at a
//! time even if callers race fetches.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::protocol::frame_command;

/// Errors raised by the TCP session layer.
#[derive(Debug)]
pub enum LinkError {
    /// TCP connect was refused, the host is unreachable or name
    /// resolution failed.
    Connect(String),

    /// Connect or read exceeded its deadline.
    Timeout(String),

    /// Socket error mid-session. Peer closing the connection counts.
    Io(std::io::Error),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Connect(msg) => write!(f, "failed to connect: {}", msg),
            LinkError::Timeout(msg) => write!(f, "deadline exceeded: {}", msg),
            LinkError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LinkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io(err)
    }
}

/// Delay after each exchange so the serial side of the gateway gets
/// recovery time before the next command. Tunable via
/// [`DeviceLink::with_settle_delay`].
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// One TCP connection to one device, with line-oriented exchanges.
#[derive(Debug)]
pub struct DeviceLink {
    stream: BufReader<TcpStream>,
    peer: String,
    settle_delay: Duration,
}

impl DeviceLink {
    /// Establish the TCP connection.
    ///
    /// `host` may be an IP address or a resolvable name; the gateway's
    /// data port goes in `port`.
    pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self, LinkError> {
        let peer = format!("{host}:{port}");

        let stream = timeout(connect_timeout, TcpStream::connect(&peer))
            .await
            .map_err(|_| LinkError::Timeout(format!("connect to {peer}")))?
            .map_err(|e| LinkError::Connect(format!("{peer}: {e}")))?;

        trace!("connected to {peer}");

        Ok(Self {
            stream: BufReader::new(stream),
            peer,
            settle_delay: DEFAULT_SETTLE_DELAY,
        })
    }

    /// Override the post-exchange settle delay.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// The `host:port` this link is connected to.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send one command and read the response up to the `\r` terminator.
    ///
    /// The terminator is appended to `command` if absent. Returns the
    /// raw response including the terminator. Fails with
    /// [`LinkError::Timeout`] when no complete response arrives within
    /// `response_timeout` and [`LinkError::Io`] on socket errors,
    /// including the peer closing the connection.
    pub async fn exchange(
        &mut self,
        command: &str,
        response_timeout: Duration,
    ) -> Result<String, LinkError> {
        let framed = frame_command(command);

        self.stream.get_mut().write_all(framed.as_bytes()).await?;
        self.stream.get_mut().flush().await?;

        let mut buf = Vec::new();
        let read = timeout(response_timeout, self.stream.read_until(b'\r', &mut buf))
            .await
            .map_err(|_| LinkError::Timeout(format!("response from {}", self.peer)))??;

        if read == 0 {
            return Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{} closed the connection", self.peer),
            )));
        }

        let response = String::from_utf8_lossy(&buf).into_owned();
        trace!("{}: {:?} -> {:?}", self.peer, command, response);

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        Ok(response)
    }

    /// Shut the connection down. Dropping the link also closes the
    /// socket, so a poller cancelled mid-exchange releases it either way.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            debug!("{}: shutdown: {e}", self.peer);
        }
    }
}

/// Lightweight reachability probe: open and immediately drop a bare TCP
/// connection, independent of any data session. Any failure (refusal,
/// unreachable host, name-resolution error, timeout) reads as "down".
pub async fn probe(host: &str, port: u16, probe_timeout: Duration) -> bool {
    match timeout(probe_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(_)) | Err(_) => false,
    }
}
