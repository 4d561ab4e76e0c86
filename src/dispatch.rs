// MIT License - Copyright (c) 2026 Peter Wright
// Inbound dispatch: fan-out of session events to subscribers

//! Every subscriber sees every event in arrival order. A subscriber that
//! falls more than the bus capacity behind loses its oldest undelivered
//! events (logged at warn); the connection and other subscribers are never
//! slowed down by it.

use std::sync::OnceLock;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::error::CloseReason;
use crate::event::SessionEvent;

/// Broadcast bus for one session.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    closed: OnceLock<CloseReason>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            closed: OnceLock::new(),
        }
    }

    /// Deliver an event to all current subscribers. Ignored once closed.
    pub fn publish(&self, event: SessionEvent) {
        if self.is_closed() {
            return;
        }
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Publish the terminal `Closed` event. Only the first call has any effect.
    pub fn close(&self, reason: CloseReason) {
        if self.closed.set(reason.clone()).is_ok() {
            debug!("Event bus closed: {}", reason);
            let _ = self.sender.send(SessionEvent::Closed(reason));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get().is_some()
    }

    pub fn close_reason(&self) -> Option<&CloseReason> {
        self.closed.get()
    }

    /// Register a subscriber. It sees events published from now on.
    ///
    /// Subscribing to a closed bus yields just the `Closed` event.
    pub fn subscribe(&self) -> Subscription {
        let receiver = self.sender.subscribe();
        let pending = self.closed.get().cloned().map(SessionEvent::Closed);
        Subscription {
            receiver,
            pending,
            finished: false,
            dropped: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One subscriber's view of the event stream. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<SessionEvent>,
    pending: Option<SessionEvent>,
    finished: bool,
    dropped: u64,
}

impl Subscription {
    /// Next event, or `None` after `Closed` has been delivered.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        if let Some(event) = self.pending.take() {
            self.finished = true;
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.is_closed() {
                        self.finished = true;
                    }
                    return Some(event);
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscriber fell behind, {} events dropped", n);
                    self.dropped += n;
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Events lost to overflow so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
