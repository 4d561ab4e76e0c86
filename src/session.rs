// MIT License - Copyright (c) 2026 Peter Wright
// Session lifecycle: state machine, task wiring, shutdown

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::It100Config;
use crate::dispatch::EventBus;
use crate::error::{CloseReason, FailureCause, It100Error, Result};
use crate::keepalive::{self, KeepAliveState};
use crate::login;
use crate::registry::CommandRegistry;
use crate::transport::TransportHalves;
use crate::transport::reader;
use crate::transport::writer::{self, OutboundQueue};

/// Lifecycle of one connection. `Closed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Connecting,
    /// Connected; waiting for the network bridge to accept the password.
    HandshakePending,
    Ready,
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Closing or terminal: session tasks should wind down.
    pub fn is_stopping(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::HandshakePending => "handshake pending",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State shared by every task of a session.
///
/// Transitions go through `watch::Sender::send_if_modified`, so each one is
/// a single atomic check-and-set that readers observe whole.
#[derive(Debug)]
pub(crate) struct SessionShared {
    state: watch::Sender<SessionState>,
    failure: OnceLock<FailureCause>,
    bus: EventBus,
}

impl SessionShared {
    pub fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            state,
            failure: OnceLock::new(),
            bus: EventBus::new(event_capacity),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Apply `next` to the current state; returns whether it changed.
    fn transition(&self, next: impl FnOnce(SessionState) -> Option<SessionState>) -> bool {
        self.state.send_if_modified(|state| match next(*state) {
            Some(new) if new != *state => {
                debug!("Session state {} -> {}", state, new);
                *state = new;
                true
            }
            _ => false,
        })
    }

    pub fn handshake_pending(&self) -> bool {
        self.transition(|s| (s == SessionState::Connecting).then_some(SessionState::HandshakePending))
    }

    pub fn mark_ready(&self) -> bool {
        let changed = self.transition(|s| {
            matches!(s, SessionState::Connecting | SessionState::HandshakePending)
                .then_some(SessionState::Ready)
        });
        if changed {
            info!("Session ready");
        }
        changed
    }

    /// Enter `Closing`. False if the session is already stopping.
    pub fn begin_close(&self) -> bool {
        self.transition(|s| (!s.is_stopping()).then_some(SessionState::Closing))
    }

    /// `Closing` → `Closed`, then end every subscriber's stream.
    pub fn finish_close(&self) {
        if self.transition(|s| (s == SessionState::Closing).then_some(SessionState::Closed)) {
            info!("Session closed");
            self.bus.close(CloseReason::Requested);
        }
    }

    /// Fail the session. Ignored once it is closing or terminal, so only the
    /// first cause wins.
    pub fn fail(&self, cause: FailureCause) -> bool {
        let failed = self.transition(|s| {
            if s.is_stopping() {
                return None;
            }
            // Set before the state flips so waiters always find a cause.
            let _ = self.failure.set(cause.clone());
            Some(SessionState::Failed)
        });
        if failed {
            error!("Session failed: {}", cause);
            self.bus.close(CloseReason::Failed(cause));
        }
        failed
    }

    /// Resolves once the session is closing or terminal.
    pub async fn stopped(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot observe a dropped channel.
        let _ = rx.wait_for(SessionState::is_stopping).await;
    }

    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.state.subscribe();
        let state = *rx
            .wait_for(|s| *s == SessionState::Ready || s.is_stopping())
            .await
            .map_err(|_| It100Error::NotConnected)?;
        match state {
            SessionState::Ready => Ok(()),
            SessionState::Failed => Err(self.failed_error()),
            _ => Err(It100Error::NotConnected),
        }
    }

    fn failed_error(&self) -> It100Error {
        It100Error::SessionFailed(
            self.failure
                .get()
                .cloned()
                .unwrap_or(FailureCause::ConnectionClosed),
        )
    }
}

/// A running session: shared state, the outbound lane and its tasks.
#[derive(Debug)]
pub(crate) struct Session {
    pub shared: Arc<SessionShared>,
    pub outbound: OutboundQueue,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    close_grace: Duration,
}

impl Session {
    /// Wire codec, registry, bus and timers to a freshly connected transport.
    pub fn start(
        config: &It100Config,
        transport: TransportHalves,
        registry: Arc<CommandRegistry>,
    ) -> Self {
        let shared = Arc::new(SessionShared::new(config.event_capacity));
        let (outbound, queue_rx) = OutboundQueue::channel();
        let activity = Arc::new(tokio::sync::Mutex::new(KeepAliveState::new(Instant::now())));
        let mut tasks = Vec::new();

        let handshake = match &config.password {
            Some(password) => {
                shared.handshake_pending();
                let (handshake_tx, handshake_rx) = mpsc::unbounded_channel();
                tasks.push(tokio::spawn(login::run(
                    handshake_rx,
                    password.clone(),
                    outbound.clone(),
                    shared.clone(),
                )));
                Some(handshake_tx)
            }
            None => {
                shared.mark_ready();
                None
            }
        };

        tasks.push(tokio::spawn(writer::run(
            transport.writer,
            queue_rx,
            registry.clone(),
            shared.clone(),
        )));
        tasks.push(tokio::spawn(reader::run(
            transport.reader,
            registry,
            shared.clone(),
            activity.clone(),
            handshake,
        )));

        if config.keep_alive_interval.is_zero() {
            warn!("Keep-alive interval is zero, keep-alive disabled");
        } else {
            tasks.push(tokio::spawn(keepalive::run_keep_alive(
                activity,
                config.keep_alive_interval,
                config.keep_alive_multiple,
                outbound.clone(),
                shared.clone(),
            )));
        }

        match config.status_poll_interval {
            Some(interval) if !interval.is_zero() => {
                debug!("Status poll every {:?}", interval);
                tasks.push(tokio::spawn(keepalive::run_status_poll(
                    interval,
                    outbound.clone(),
                    shared.clone(),
                )));
            }
            _ => {}
        }

        Self {
            shared,
            outbound,
            tasks: Mutex::new(tasks),
            close_grace: config.close_grace,
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Stop timers and lanes, release the transport, publish end-of-stream.
    ///
    /// `Ok` on an already closed session; the failure cause on a failed one.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.shared.begin_close() {
            // Another caller is closing, or the session already ended.
            let mut rx = self.shared.state.subscribe();
            let state = *rx
                .wait_for(SessionState::is_terminal)
                .await
                .map_err(|_| It100Error::NotConnected)?;
            return match state {
                SessionState::Failed => Err(self.shared.failed_error()),
                _ => Ok(()),
            };
        }

        info!("Disconnecting");
        let handles = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let deadline = Instant::now() + self.close_grace;
        for handle in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout_at(deadline, handle).await.is_err() {
                warn!("Session task did not stop within {:?}, aborting", self.close_grace);
                abort.abort();
            }
        }

        self.shared.finish_close();
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SessionEvent;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Closing.is_terminal());
        assert!(SessionState::Closing.is_stopping());
        assert!(!SessionState::Ready.is_stopping());
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let shared = SessionShared::new(8);
        let mut events = shared.bus().subscribe();
        assert!(shared.mark_ready());

        assert!(shared.fail(FailureCause::ConnectionClosed));
        assert!(!shared.fail(FailureCause::LoginRejected));
        assert_eq!(shared.state(), SessionState::Failed);
        assert!(matches!(
            shared.failed_error(),
            It100Error::SessionFailed(FailureCause::ConnectionClosed)
        ));

        match events.recv().await {
            Some(SessionEvent::Closed(CloseReason::Failed(FailureCause::ConnectionClosed))) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failure_ignored_while_closing() {
        let shared = SessionShared::new(8);
        assert!(shared.begin_close());
        assert!(!shared.begin_close());
        assert!(!shared.fail(FailureCause::ConnectionClosed));
        shared.finish_close();
        assert_eq!(shared.state(), SessionState::Closed);
        assert_eq!(shared.bus().close_reason(), Some(&CloseReason::Requested));
    }

    #[tokio::test]
    async fn test_handshake_then_ready() {
        let shared = SessionShared::new(8);
        assert!(shared.handshake_pending());
        assert_eq!(shared.state(), SessionState::HandshakePending);
        assert!(shared.mark_ready());
        assert!(!shared.handshake_pending());
        shared.wait_ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_ready_reports_failure() {
        let shared = SessionShared::new(8);
        shared.handshake_pending();
        shared.fail(FailureCause::LoginRejected);
        match shared.wait_ready().await {
            Err(It100Error::SessionFailed(FailureCause::LoginRejected)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
