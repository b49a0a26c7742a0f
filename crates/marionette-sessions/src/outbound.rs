use marionette_core::config::DIRECT_SEND_TIMEOUT_MS;
use marionette_core::{ControlError, Result};
use marionette_protocol::ServerFrame;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Cloneable producer side of a session's outbound channel.
///
/// The channel is the only path to the renderer: the session's single writer
/// task drains the paired receiver, so every frame accepted here is delivered
/// in FIFO order or the session is torn down.
#[derive(Clone)]
pub struct OutboundHandle {
    session_id: String,
    tx: mpsc::Sender<ServerFrame>,
}

impl OutboundHandle {
    pub(crate) fn new(session_id: String, tx: mpsc::Sender<ServerFrame>) -> Self {
        Self { session_id, tx }
    }

    /// Direct-reply enqueue: blocks up to the configured timeout when the
    /// queue is full, then fails so the caller can report the error.
    pub async fn send(&self, frame: ServerFrame) -> Result<()> {
        let kind = frame.kind();
        match tokio::time::timeout(
            Duration::from_millis(DIRECT_SEND_TIMEOUT_MS),
            self.tx.send(frame),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                debug!(session = %self.session_id, kind, "outbound closed, frame dropped");
                Err(ControlError::SessionClosed {
                    id: self.session_id.clone(),
                })
            }
            Err(_) => {
                warn!(session = %self.session_id, kind, "outbound enqueue timed out");
                Err(ControlError::Timeout {
                    ms: DIRECT_SEND_TIMEOUT_MS,
                })
            }
        }
    }

    /// Best-effort enqueue for scheduler and broadcast paths: a full or
    /// closed queue drops the frame with a warning, never blocks.
    pub fn try_send(&self, frame: ServerFrame) -> bool {
        let kind = frame.kind();
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session = %self.session_id, kind, "slow session, frame dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session = %self.session_id, kind, "outbound closed, frame dropped");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
