// MIT License - Copyright (c) 2026 Peter Wright
// Inbound pipeline: bytes -> frames -> commands -> bus

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codec::{Decoded, FrameDecoder};
use crate::error::FailureCause;
use crate::event::SessionEvent;
use crate::keepalive::KeepAliveState;
use crate::protocol::InboundCommand;
use crate::registry::CommandRegistry;
use crate::session::SessionShared;

use super::BoxedReader;

const READ_BUFFER_SIZE: usize = 4096;

/// Read until the session stops. Login interaction commands also go to
/// `handshake`, which is unbounded so none are lost to subscriber lag.
pub(crate) async fn run(
    mut reader: BoxedReader,
    registry: Arc<CommandRegistry>,
    shared: Arc<SessionShared>,
    activity: Arc<Mutex<KeepAliveState>>,
    handshake: Option<mpsc::UnboundedSender<InboundCommand>>,
) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = tokio::select! {
            biased;
            _ = shared.stopped() => break,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!("Reader: connection closed");
                shared.fail(FailureCause::ConnectionClosed);
                break;
            }
            Ok(n) => {
                activity.lock().await.record_activity(Instant::now());
                for decoded in decoder.decode(&buf[..n]) {
                    dispatch(decoded, &registry, &shared, handshake.as_ref());
                }
            }
            Err(e) => {
                shared.fail(FailureCause::transport(&e));
                break;
            }
        }
    }
    debug!("Reader stopped");
}

fn dispatch(
    decoded: Decoded,
    registry: &CommandRegistry,
    shared: &SessionShared,
    handshake: Option<&mpsc::UnboundedSender<InboundCommand>>,
) {
    match decoded {
        Decoded::Frame(frame) => {
            let command = registry.parse(&frame.code, &frame.data);
            match command.parse_failure() {
                Some(failure) => warn!("{}", failure),
                None => debug!("<- {}", command),
            }
            if let Some(handshake) = handshake
                && command.login_status().is_some()
            {
                // Closed once the login task has finished.
                let _ = handshake.send(command.clone());
            }
            shared.bus().publish(SessionEvent::from(command));
        }
        Decoded::Malformed(malformed) => {
            warn!("Malformed frame: {}", malformed);
            shared.bus().publish(SessionEvent::Malformed(malformed));
        }
    }
}
