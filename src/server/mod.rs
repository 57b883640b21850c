//! Strict request/reply image serving over a single TCP endpoint.
//!
//! One exchange is one accepted connection: the client sends any bytes
//! (nothing is fine) and half-closes, the server reads to end-of-stream,
//! answers with exactly one payload and closes. A second requester queues
//! behind the accept until the current reply has been sent.

use crate::capture::CaptureScheduler;
use crate::driver::CameraDriver;
use crate::errors::{CameraError, Result};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// Image width declared in framed replies.
///
/// Deliberately a constant, not a measurement of the captured frame; it
/// does not match the 3840x2748 buffer the cameras are configured with,
/// and clients that trust it over the JPEG header will be misled.
pub const DECLARED_WIDTH: i32 = 3648;
/// See [`DECLARED_WIDTH`].
pub const DECLARED_HEIGHT: i32 = 2736;

/// Whether replies carry bare image bytes or the framed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    /// Raw JPEG bytes.
    Raw,
    /// MessagePack array `[bytes, width, height]`.
    Framed,
}

/// Wire form of a framed reply: `[bytes, width, height]`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageReply(pub ByteBuf, pub i32, pub i32);

impl ImageReply {
    pub fn to_msgpack(&self) -> std::result::Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    pub fn from_msgpack(data: &[u8]) -> std::result::Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(data)
    }
}

/// Reply-pattern endpoint: `recv` yields a [`PendingReply`] that must be
/// consumed by [`PendingReply::send`] before the next `recv`, so one reply
/// per request holds at the type level.
#[derive(Debug)]
pub struct ReplySocket {
    listener: TcpListener,
}

/// An accepted request waiting for its single reply.
pub struct PendingReply {
    stream: TcpStream,
}

impl ReplySocket {
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|source| CameraError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Block until a request arrives. The request content is returned but
    /// callers treat it purely as a synchronization signal.
    pub fn recv(&self) -> std::io::Result<(PendingReply, Vec<u8>)> {
        let (mut stream, _peer) = self.listener.accept()?;
        let mut request = Vec::new();
        stream.read_to_end(&mut request)?;
        Ok((PendingReply { stream }, request))
    }
}

impl PendingReply {
    pub fn send(mut self, payload: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(payload)?;
        self.stream.flush()
    }
}

/// The serving loop: wait, capture, reply, forever.
pub struct ImageServer<D: CameraDriver> {
    socket: ReplySocket,
    scheduler: CaptureScheduler<D>,
    format: ReplyFormat,
}

impl<D: CameraDriver> ImageServer<D> {
    pub fn new(socket: ReplySocket, scheduler: CaptureScheduler<D>, format: ReplyFormat) -> Self {
        Self {
            socket,
            scheduler,
            format,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve requests until the process dies. Per-exchange failures are
    /// logged and swallowed; only process termination stops the loop.
    pub fn serve_forever(&mut self) -> ! {
        loop {
            if let Err(err) = self.serve_one() {
                tracing::error!("Exchange failed: {err}");
            }
        }
    }

    /// One full exchange. Split out so tests can bound the loop.
    pub fn serve_one(&mut self) -> std::io::Result<()> {
        tracing::info!("waiting for request...");
        let (pending, _request) = self.socket.recv()?;

        // A capture failure still answers the request: the client gets an
        // empty payload rather than a hung exchange. There is no way to
        // signal failure distinctly on this wire format.
        let payload = match self.scheduler.capture() {
            Ok(image) => self.encode(image.bytes),
            Err(err) => {
                tracing::error!("Capture failed: {err}");
                Vec::new()
            }
        };

        pending.send(&payload)?;
        tracing::info!("...sent image");
        Ok(())
    }

    fn encode(&self, bytes: Vec<u8>) -> Vec<u8> {
        match self.format {
            ReplyFormat::Raw => bytes,
            ReplyFormat::Framed => {
                let reply = ImageReply(ByteBuf::from(bytes), DECLARED_WIDTH, DECLARED_HEIGHT);
                match reply.to_msgpack() {
                    Ok(encoded) => encoded,
                    Err(err) => {
                        tracing::error!("Reply framing failed: {err}");
                        reply.0.into_vec()
                    }
                }
            }
        }
    }
}
