// MIT License - Copyright (c) 2026 Peter Wright
// Protocol engine for DSC IT-100 style integration modules
//
//! # it100-bridge
//!
//! Talks to a DSC PowerSeries panel through an IT-100 integration module, or
//! an Envisalink-style network bridge speaking the same protocol, over TCP.
//!
//! The engine handles framing and checksums, command parsing, fan-out of
//! inbound events to any number of subscribers, an ordered outbound write
//! lane, keep-alive polling, optional periodic status requests and the
//! bridge login handshake. What the events mean for your alarm system is up
//! to you.
//!
//! ## Quick Start
//!
//! ```no_run
//! use it100_bridge::{It100Client, It100Config, OutboundCommand, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = It100Config::builder()
//!         .address("192.168.0.50:4025")
//!         .password("user")
//!         .build();
//!
//!     let client = It100Client::new(config);
//!     client.connect().await?;
//!     client.wait_ready().await?;
//!
//!     let mut events = client.subscribe()?;
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("Event: {}", event);
//!         }
//!     });
//!
//!     client.send(OutboundCommand::status_request())?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod keepalive;
pub mod login;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use client::It100Client;
pub use codec::{Decoded, FrameDecoder, MalformedFrame, MalformedReason, RawFrame};
pub use config::{It100Config, It100ConfigBuilder};
pub use dispatch::Subscription;
pub use error::{CloseReason, FailureCause, It100Error, Result};
pub use event::SessionEvent;
pub use protocol::{
    ArmMode, CommandFields, InboundCommand, KeypadLeds, LoginStatus, OutboundCommand, ParseFailure,
};
pub use registry::{CommandRegistry, CommandVariant, Layout};
pub use session::SessionState;
pub use transport::{Connector, TcpConnector, TransportHalves};
