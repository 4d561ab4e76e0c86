// MIT License - Copyright (c) 2026 Peter Wright
// Outbound write queue and the single writer lane

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{FailureCause, It100Error, Result};
use crate::protocol::OutboundCommand;
use crate::registry::CommandRegistry;
use crate::session::SessionShared;

use super::BoxedWriter;

/// Producer side of the writer lane. Cheap to clone; `submit` never blocks.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl OutboundQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a command. Fails once the writer lane has stopped.
    pub fn submit(&self, command: OutboundCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| It100Error::NotConnected)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Serialize and write queued commands, one complete frame at a time,
/// in submission order.
pub(crate) async fn run(
    mut writer: BoxedWriter,
    mut queue: mpsc::UnboundedReceiver<OutboundCommand>,
    registry: Arc<CommandRegistry>,
    shared: Arc<SessionShared>,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = shared.stopped() => break,
            command = queue.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        let data = match registry.serialize(&command) {
            Ok(data) => data,
            Err(e) => {
                warn!("Dropping outbound command: {}", e);
                continue;
            }
        };

        let frame = codec::encode(&command.code, &data);
        debug!("-> {}", command);
        if let Err(e) = write_frame(&mut writer, &frame).await {
            shared.fail(FailureCause::transport(&e));
            break;
        }
    }

    queue.close();
    let _ = writer.shutdown().await;
    debug!("Writer stopped");
}

async fn write_frame(writer: &mut BoxedWriter, frame: &[u8]) -> std::io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_after_lane_stops() {
        let (queue, rx) = OutboundQueue::channel();
        queue.submit(OutboundCommand::poll()).unwrap();
        drop(rx);
        assert!(queue.is_closed());
        assert!(matches!(
            queue.submit(OutboundCommand::poll()),
            Err(It100Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_writes_frames_in_order() {
        let (queue, rx) = OutboundQueue::channel();
        let shared = Arc::new(SessionShared::new(8));
        let (client, mut server) = tokio::io::duplex(1024);

        queue.submit(OutboundCommand::poll()).unwrap();
        queue.submit(OutboundCommand::raw("200", "12")).unwrap();
        queue.submit(OutboundCommand::code_send("1234")).unwrap();
        drop(queue);

        run(
            Box::new(client),
            rx,
            Arc::new(CommandRegistry::default()),
            shared,
        )
        .await;

        let mut written = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut written)
            .await
            .unwrap();
        let mut expected = codec::encode("000", "");
        // "12" does not fit 200's layout and is dropped.
        expected.extend(codec::encode("200", "1234"));
        assert_eq!(written, expected);
    }
}
