// MIT License - Copyright (c) 2026 Peter Wright
// Public entry point: connect, send, subscribe, disconnect

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info};

use crate::config::It100Config;
use crate::dispatch::Subscription;
use crate::error::{It100Error, Result};
use crate::protocol::OutboundCommand;
use crate::registry::CommandRegistry;
use crate::session::{Session, SessionState};
use crate::transport::{Connector, TcpConnector};

/// Client for one IT-100 integration module.
///
/// Each successful `connect()` starts a new session. Commands and
/// subscriptions belong to the current session; after it closes or fails
/// they stop working until the next `connect()`.
pub struct It100Client<C: Connector = TcpConnector> {
    config: It100Config,
    connector: C,
    registry: Arc<CommandRegistry>,
    session: Mutex<Option<Arc<Session>>>,
    // Serializes connect/disconnect.
    lifecycle: tokio::sync::Mutex<()>,
}

impl It100Client<TcpConnector> {
    /// TCP client with the built-in command catalog.
    pub fn new(config: It100Config) -> Self {
        let connector = TcpConnector::new(config.address.clone());
        Self::with_connector(config, connector, CommandRegistry::default())
    }
}

impl<C: Connector> It100Client<C> {
    pub fn with_connector(config: It100Config, connector: C, registry: CommandRegistry) -> Self {
        Self {
            config,
            connector,
            registry: Arc::new(registry),
            session: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &It100Config {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Open the transport and start a session.
    ///
    /// Returns once the byte stream is up; use [`wait_ready`](Self::wait_ready)
    /// to wait for the login handshake.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        if let Some(session) = self.current()
            && !session.state().is_terminal()
        {
            return Err(It100Error::AlreadyConnected);
        }

        info!("Connecting to {}", self.config.address);
        let transport =
            match tokio::time::timeout(self.config.connect_timeout, self.connector.connect()).await
            {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => {
                    error!("Connect to {} failed: {}", self.config.address, e);
                    return Err(It100Error::Io(e));
                }
                Err(_) => {
                    error!(
                        "Connect to {} timed out after {:?}",
                        self.config.address, self.config.connect_timeout
                    );
                    return Err(It100Error::ConnectionTimeout);
                }
            };

        let session = Session::start(&self.config, transport, self.registry.clone());
        info!("Connected to {} ({})", self.config.address, session.state());
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(session));
        Ok(())
    }

    /// Close the current session.
    ///
    /// A no-op on a closed session or before any `connect()`. On a failed
    /// session returns the failure without doing anything else.
    pub async fn disconnect(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        match self.current() {
            Some(session) => session.shutdown().await,
            None => Ok(()),
        }
    }

    /// Queue a command for the writer lane. Returns immediately.
    ///
    /// The command is serialized here too, so bad fields are reported to the
    /// caller instead of being dropped by the writer.
    pub fn send(&self, command: OutboundCommand) -> Result<()> {
        let session = self.current().ok_or(It100Error::NotConnected)?;
        if session.state().is_stopping() {
            return Err(It100Error::NotConnected);
        }
        self.registry.serialize(&command)?;
        session.outbound.submit(command)
    }

    /// Live stream of events from now on. Ends with `SessionEvent::Closed`.
    pub fn subscribe(&self) -> Result<Subscription> {
        let session = self.current().ok_or(It100Error::NotConnected)?;
        Ok(session.shared.bus().subscribe())
    }

    /// State of the current session, `None` before the first `connect()`.
    pub fn state(&self) -> Option<SessionState> {
        self.current().map(|session| session.state())
    }

    /// Resolve once the session is `Ready`, or fail with its terminal cause.
    pub async fn wait_ready(&self) -> Result<()> {
        let session = self.current().ok_or(It100Error::NotConnected)?;
        session.shared.wait_ready().await
    }
}

impl<C: Connector> std::fmt::Debug for It100Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("It100Client")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
