use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::events::{ChatEvent, SessionId};

/// Maximum queued outbound events per session (prevents memory exhaustion from slow clients).
pub const MAX_OUTBOUND_QUEUE: usize = 1024;

/// A registered session. The engine only learns about a connection once its
/// join handshake completes; sessions still choosing a name or room are
/// tracked solely by their connection task.
#[derive(Debug)]
pub struct UserSession {
    pub id: SessionId,
    /// Display name, fixed at registration. Not required to be unique, and
    /// may be empty (empty names are excluded from active-user listings).
    pub nickname: String,
    /// Name of the one room this session belongs to, fixed at join.
    pub room: String,
    /// Send outbound events to this session's write loop (bounded to prevent memory exhaustion).
    pub outbound: mpsc::Sender<ChatEvent>,
    pub connected_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(
        id: SessionId,
        nickname: String,
        room: String,
        outbound: mpsc::Sender<ChatEvent>,
    ) -> Self {
        Self {
            id,
            nickname,
            room,
            outbound,
            connected_at: Utc::now(),
        }
    }

    /// Send an event to this session. Returns false if the channel is closed
    /// or the outbound queue is full (slow client protection; drops the
    /// event rather than blocking).
    pub fn send(&self, event: ChatEvent) -> bool {
        self.outbound.try_send(event).is_ok()
    }
}
