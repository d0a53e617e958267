//! Broadcast fan-out
//!
//! Snapshot the active clients under the state lock, then enqueue the
//! event on each client's outbound queue with the lock released. Enqueueing
//! never waits, so one slow or dead recipient cannot hold up the caller
//! or the other recipients; the per-connection writer tasks perform the
//! actual socket writes concurrently.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::ClientHandle;
use crate::error::SendError;
use crate::message::ServerEvent;
use crate::state::ServerState;

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients whose queue accepted the event
    pub queued: usize,
    /// Recipients that were full and skipped this event
    pub dropped: usize,
    /// Recipients whose writer is gone; now deactivated
    pub failed: usize,
}

/// Best-effort fan-out to every active client
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    state: Arc<ServerState>,
}

impl BroadcastEngine {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Deliver `event` to every active client
    ///
    /// No acknowledgement, retry or cross-recipient ordering is provided.
    pub async fn broadcast(&self, event: &ServerEvent) -> BroadcastReport {
        let recipients = self.state.snapshot_active().await;
        self.broadcast_to(&recipients, event).await
    }

    /// Deliver `event` to a snapshot taken by the caller
    pub async fn broadcast_to(&self, recipients: &[ClientHandle], event: &ServerEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut unreachable = Vec::new();

        for client in recipients {
            match client.send(event.clone()) {
                Ok(()) => report.queued += 1,
                Err(SendError::QueueFull) => {
                    warn!(
                        "Outbound queue full for {} ({}), dropping {} at L={}",
                        client.name, client.id, event.event_type, event.timestamp
                    );
                    report.dropped += 1;
                }
                Err(SendError::ChannelClosed) => {
                    warn!("Error sending to {} ({}): writer closed", client.name, client.id);
                    unreachable.push((client.id, client.session));
                }
            }
        }

        report.failed = unreachable.len();
        for (id, session) in unreachable {
            self.state.deactivate(id, session).await;
        }

        debug!(
            "Broadcast {} L={}: {} queued, {} dropped, {} failed",
            event.event_type, event.timestamp, report.queued, report.dropped, report.failed
        );
        report
    }
}
