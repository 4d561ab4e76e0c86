// MIT License - Copyright (c) 2026 Peter Wright
// Keep-alive monitor and status poll scheduler

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::error::FailureCause;
use crate::protocol::OutboundCommand;
use crate::session::SessionShared;
use crate::transport::writer::OutboundQueue;

/// Liveness bookkeeping, updated by the reader and the keep-alive timer.
#[derive(Debug, Clone)]
pub struct KeepAliveState {
    last_activity: Instant,
    last_tick: Instant,
    poll_outstanding: bool,
}

/// What the monitor should do on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Traffic seen since the last tick.
    Idle,
    /// Quiet since the last tick: send `000`.
    Poll,
    /// Quiet for the whole timeout window.
    TimedOut(Duration),
}

impl KeepAliveState {
    pub fn new(now: Instant) -> Self {
        Self {
            last_activity: now,
            last_tick: now,
            poll_outstanding: false,
        }
    }

    /// Any bytes from the module count, framed or not.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.poll_outstanding = false;
    }

    pub fn on_tick(&mut self, now: Instant, timeout: Duration) -> TickAction {
        let idle = now.saturating_duration_since(self.last_activity);
        let action = if idle >= timeout {
            TickAction::TimedOut(idle)
        } else if self.last_activity <= self.last_tick {
            self.poll_outstanding = true;
            TickAction::Poll
        } else {
            TickAction::Idle
        };
        self.last_tick = now;
        action
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// A poll went out and nothing has arrived since.
    pub fn poll_outstanding(&self) -> bool {
        self.poll_outstanding
    }
}

/// Tick every `interval`; poll when quiet, fail the session after
/// `interval × multiple` of silence.
///
/// Silence is only checked on ticks, so the failure lands on the first
/// tick at or past the timeout: up to one `interval` later than
/// `last_activity + interval × multiple`.
pub(crate) async fn run_keep_alive(
    activity: Arc<Mutex<KeepAliveState>>,
    interval: Duration,
    multiple: u32,
    outbound: OutboundQueue,
    shared: Arc<SessionShared>,
) {
    let timeout = interval * multiple.max(1);
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shared.stopped() => break,
            _ = ticker.tick() => {}
        }

        let action = activity.lock().await.on_tick(Instant::now(), timeout);
        match action {
            TickAction::Idle => {}
            TickAction::Poll => {
                debug!("No traffic since last tick, polling");
                if outbound.submit(OutboundCommand::poll()).is_err() {
                    break;
                }
            }
            TickAction::TimedOut(idle) => {
                warn!("No traffic for {:?}", idle);
                shared.fail(FailureCause::KeepAliveTimeout { idle });
                break;
            }
        }
    }
    debug!("Keep-alive monitor stopped");
}

/// Submit `001` Status Request every `interval`, independent of keep-alive.
pub(crate) async fn run_status_poll(
    interval: Duration,
    outbound: OutboundQueue,
    shared: Arc<SessionShared>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shared.stopped() => break,
            _ = ticker.tick() => {}
        }
        debug!("Requesting panel status");
        if outbound.submit(OutboundCommand::status_request()).is_err() {
            break;
        }
    }
    debug!("Status poll stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    const I: Duration = Duration::from_secs(10);
    const TIMEOUT: Duration = Duration::from_secs(30);

    #[test]
    fn test_quiet_link_polls_then_times_out() {
        let start = Instant::now();
        let mut state = KeepAliveState::new(start);

        assert_eq!(state.on_tick(start + I, TIMEOUT), TickAction::Poll);
        assert!(state.poll_outstanding());
        assert_eq!(state.on_tick(start + I * 2, TIMEOUT), TickAction::Poll);
        assert_eq!(
            state.on_tick(start + I * 3, TIMEOUT),
            TickAction::TimedOut(I * 3)
        );
    }

    #[test]
    fn test_timeout_detected_on_next_tick() {
        let start = Instant::now();
        let mut state = KeepAliveState::new(start);

        state.record_activity(start + Duration::from_secs(25));
        assert_eq!(state.on_tick(start + I * 3, TIMEOUT), TickAction::Idle);
        assert_eq!(state.on_tick(start + I * 4, TIMEOUT), TickAction::Poll);
        assert_eq!(state.on_tick(start + I * 5, TIMEOUT), TickAction::Poll);
        // Silent since 25s; the 55s deadline falls between ticks.
        assert_eq!(
            state.on_tick(start + I * 6, TIMEOUT),
            TickAction::TimedOut(Duration::from_secs(35))
        );
    }

    #[test]
    fn test_activity_suppresses_poll() {
        let start = Instant::now();
        let mut state = KeepAliveState::new(start);

        state.record_activity(start + Duration::from_secs(5));
        assert_eq!(state.on_tick(start + I, TIMEOUT), TickAction::Idle);
        assert!(!state.poll_outstanding());
        assert_eq!(state.on_tick(start + I * 2, TIMEOUT), TickAction::Poll);
    }

    #[test]
    fn test_activity_resets_timeout_clock() {
        let start = Instant::now();
        let mut state = KeepAliveState::new(start);

        state.on_tick(start + I, TIMEOUT);
        state.on_tick(start + I * 2, TIMEOUT);
        state.record_activity(start + Duration::from_secs(25));
        assert_eq!(state.on_tick(start + I * 3, TIMEOUT), TickAction::Idle);
        assert_eq!(state.on_tick(start + I * 4, TIMEOUT), TickAction::Poll);
        assert_eq!(state.on_tick(start + I * 5, TIMEOUT), TickAction::Poll);
        assert_eq!(
            state.on_tick(start + I * 6, TIMEOUT),
            TickAction::TimedOut(Duration::from_secs(35))
        );
        assert_eq!(state.last_activity(), start + Duration::from_secs(25));
    }
}
