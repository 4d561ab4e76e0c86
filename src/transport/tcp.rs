// MIT License - Copyright (c) 2026 Peter Wright
// TCP connector (network bridge or ser2net)

use std::io;

use tokio::net::TcpStream;
use tracing::debug;

use super::{Connector, TransportHalves};

/// Connects to `host:port` over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    async fn connect(&self) -> io::Result<TransportHalves> {
        let stream = TcpStream::connect(&self.address).await?;
        // Frames are tiny; don't let Nagle hold them back.
        stream.set_nodelay(true)?;
        debug!("TCP socket connected to {}", self.address);
        let (reader, writer) = stream.into_split();
        Ok(TransportHalves::new(reader, writer))
    }
}
