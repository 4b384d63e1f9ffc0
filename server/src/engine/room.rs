use chrono::{DateTime, Utc};

use super::events::SessionId;

/// In-memory state for a single room.
///
/// Rooms are created lazily on first reference and never removed, even once
/// empty; the room table grows for the life of the process.
#[derive(Debug)]
pub struct RoomState {
    /// Room name, also the persistence key.
    pub name: String,
    /// Every formatted chat line ever appended for this room, oldest first.
    /// Replayed verbatim to new joiners and persisted in full on append.
    pub history: Vec<String>,
    /// Session IDs of currently connected members, in join order. Order
    /// matters: private messages resolve to the first nickname match.
    pub members: Vec<SessionId>,
    pub created_at: DateTime<Utc>,
}

impl RoomState {
    pub fn new(name: String, history: Vec<String>) -> Self {
        Self {
            name,
            history,
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
