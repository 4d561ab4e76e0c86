// MIT License - Copyright (c) 2026 Peter Wright
// Session configuration

use std::time::Duration;

use crate::constants::{
    DEFAULT_CLOSE_GRACE, DEFAULT_CONNECT_TIMEOUT, DEFAULT_EVENT_CAPACITY,
    DEFAULT_KEEP_ALIVE_INTERVAL, DEFAULT_KEEP_ALIVE_MULTIPLE, DEFAULT_PORT,
};

/// Configuration for one IT-100 session.
#[derive(Clone)]
pub struct It100Config {
    /// `host:port` of the module or its serial-to-TCP bridge
    pub address: String,
    /// Maximum time to establish the byte stream
    pub connect_timeout: Duration,
    /// How often the keep-alive monitor ticks
    pub keep_alive_interval: Duration,
    /// Silence of `keep_alive_multiple × keep_alive_interval` fails the session
    pub keep_alive_multiple: u32,
    /// Periodic `001` Status Request; `None` disables it
    pub status_poll_interval: Option<Duration>,
    /// Network bridge password; `None` skips the login handshake
    pub password: Option<String>,
    /// Events buffered per subscriber before the oldest are dropped
    pub event_capacity: usize,
    /// How long `disconnect()` waits for session tasks before aborting them
    pub close_grace: Duration,
}

impl Default for It100Config {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            keep_alive_multiple: DEFAULT_KEEP_ALIVE_MULTIPLE,
            status_poll_interval: None,
            password: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }
}

// Hand-written so the password stays out of logs.
impl std::fmt::Debug for It100Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("It100Config")
            .field("address", &self.address)
            .field("connect_timeout", &self.connect_timeout)
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("keep_alive_multiple", &self.keep_alive_multiple)
            .field("status_poll_interval", &self.status_poll_interval)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("event_capacity", &self.event_capacity)
            .field("close_grace", &self.close_grace)
            .finish()
    }
}

impl It100Config {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> It100ConfigBuilder {
        It100ConfigBuilder::default()
    }

    /// Silence after which the session is declared failed.
    pub fn keep_alive_timeout(&self) -> Duration {
        self.keep_alive_interval * self.keep_alive_multiple
    }
}

/// Builder for It100Config.
#[derive(Debug, Clone, Default)]
pub struct It100ConfigBuilder {
    config: It100Config,
}

impl It100ConfigBuilder {
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.config.keep_alive_interval = interval;
        self
    }

    pub fn keep_alive_multiple(mut self, multiple: u32) -> Self {
        self.config.keep_alive_multiple = multiple.max(1);
        self
    }

    pub fn status_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.status_poll_interval = interval;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn close_grace(mut self, grace: Duration) -> Self {
        self.config.close_grace = grace;
        self
    }

    pub fn build(self) -> It100Config {
        self.config
    }
}
