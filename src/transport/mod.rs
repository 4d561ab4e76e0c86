// MIT License - Copyright (c) 2026 Peter Wright
// Byte-stream transport abstraction

//! The engine only needs "bytes in, bytes out": a [`Connector`] produces a
//! fresh pair of boxed halves per session. TCP is built in; serial lines are
//! reached through a serial-to-TCP bridge such as ser2net.

pub mod reader;
pub mod tcp;
pub mod writer;

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

pub use tcp::TcpConnector;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The two directions of one connected byte stream.
pub struct TransportHalves {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl TransportHalves {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Split a bidirectional stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }
}

impl std::fmt::Debug for TransportHalves {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHalves").finish_non_exhaustive()
    }
}

/// Opens byte streams to the module. Called once per `connect()`.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = io::Result<TransportHalves>> + Send;
}
