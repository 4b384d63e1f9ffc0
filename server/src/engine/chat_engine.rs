use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::history::store::HistoryStore;

use super::events::{ChatEvent, SessionId};
use super::room::RoomState;
use super::user_session::{MAX_OUTBOUND_QUEUE, UserSession};

/// The central hub that manages all chat state: the room table, the session
/// table, and every cross-client operation. Connection tasks call into this;
/// it never touches sockets itself.
///
/// Each room's DashMap entry guard is the per-room lock: appends, broadcasts,
/// active-user listings, and member changes for one room run under it and see
/// a consistent membership snapshot. Operations on different rooms do not
/// block one another. A sessions guard is never held while acquiring a room
/// guard, only the other way around.
pub struct ChatEngine {
    /// All registered sessions, keyed by session ID.
    sessions: DashMap<SessionId, Arc<UserSession>>,
    /// All rooms ever referenced, keyed by name. Entries are never removed.
    rooms: DashMap<String, RoomState>,
    /// Durable per-room history, consulted on room creation and on every append.
    store: HistoryStore,
}

/// Result of registering a session into a room.
pub struct JoinOutcome {
    pub session_id: SessionId,
    /// Snapshot of the room's history at join time, for replay.
    pub history: Vec<String>,
    /// Receiver for events addressed to this session.
    pub events: mpsc::Receiver<ChatEvent>,
}

impl ChatEngine {
    pub fn new(store: HistoryStore) -> Self {
        Self {
            sessions: DashMap::new(),
            rooms: DashMap::new(),
            store,
        }
    }

    /// Get the room, creating it from persisted history on first reference.
    fn room_entry(&self, name: &str) -> RefMut<'_, String, RoomState> {
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| RoomState::new(name.to_string(), self.store.load(name)))
    }

    /// Register a session into a room. Creates the room if needed, adds the
    /// member, announces the join to the other members, and refreshes the
    /// active-user list for everyone (the joiner included, via its receiver).
    pub fn join(&self, nickname: &str, room_name: &str) -> JoinOutcome {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(MAX_OUTBOUND_QUEUE);
        let session = Arc::new(UserSession::new(
            session_id,
            nickname.to_string(),
            room_name.to_string(),
            tx,
        ));
        self.sessions.insert(session_id, session);

        let mut room = self.room_entry(room_name);
        let history = room.history.clone();
        room.members.push(session_id);

        let joined = ChatEvent::Joined {
            nickname: nickname.to_string(),
        };
        self.broadcast_to_room(&room, &joined, Some(session_id));

        let nicknames = self.member_nicknames(&room);
        self.broadcast_to_room(&room, &ChatEvent::ActiveUsers { nicknames }, None);
        drop(room);

        info!(%session_id, nickname, room = room_name, "session joined room");

        JoinOutcome {
            session_id,
            history,
            events: rx,
        }
    }

    /// Unregister a session. No-op for unknown IDs. Removes the session from
    /// its room and, if it had a (non-empty) nickname, announces the
    /// departure and refreshes the active-user list for the remaining members.
    pub fn disconnect(&self, session_id: SessionId) {
        let Some((_, session)) = self.sessions.remove(&session_id) else {
            return;
        };

        if let Some(mut room) = self.rooms.get_mut(&session.room) {
            room.members.retain(|sid| *sid != session_id);

            if !session.nickname.is_empty() {
                let left = ChatEvent::Left {
                    nickname: session.nickname.clone(),
                };
                self.broadcast_to_room(&room, &left, None);

                let nicknames = self.member_nicknames(&room);
                self.broadcast_to_room(&room, &ChatEvent::ActiveUsers { nicknames }, None);
            }
        }

        info!(%session_id, nickname = %session.nickname, "session disconnected");
    }

    /// Broadcast a chat line from this session to its room, sender included.
    /// The formatted line is appended to the room history and the full
    /// history is persisted before delivery.
    pub fn send_chat(&self, session_id: SessionId, content: &str) -> Result<(), String> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or("Session not found")?
            .clone();

        let line = format_chat_line(&session.nickname, content);

        let mut room = self
            .rooms
            .get_mut(&session.room)
            .ok_or_else(|| format!("No such room: {}", session.room))?;

        room.history.push(line.clone());
        if let Err(e) = self.store.save(&room.name, &room.history) {
            // In-memory history stays authoritative; the next append rewrites.
            warn!(room = %room.name, error = %e, "failed to persist room history");
        }

        self.broadcast_to_room(&room, &ChatEvent::Message { line }, None);
        Ok(())
    }

    /// Send the current active-user list to every member of this session's room.
    pub fn send_active_users(&self, session_id: SessionId) -> Result<(), String> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or("Session not found")?
            .clone();

        let room = self
            .rooms
            .get(&session.room)
            .ok_or_else(|| format!("No such room: {}", session.room))?;

        let nicknames = self.member_nicknames(&room);
        self.broadcast_to_room(&room, &ChatEvent::ActiveUsers { nicknames }, None);
        Ok(())
    }

    /// Deliver a private message to the first member of the sender's room
    /// whose nickname matches. Duplicate nicknames are allowed; first match
    /// in join order wins. An unknown recipient is reported to the sender
    /// only. Private messages are not recorded in room history.
    pub fn send_private(
        &self,
        session_id: SessionId,
        recipient: &str,
        content: &str,
    ) -> Result<(), String> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or("Session not found")?
            .clone();

        let Some(room) = self.rooms.get(&session.room) else {
            // Unreachable for registered sessions; guard kept anyway.
            return Ok(());
        };

        let target = room.members.iter().find_map(|sid| {
            self.sessions
                .get(sid)
                .filter(|s| s.nickname == recipient)
                .map(|s| s.clone())
        });
        drop(room);

        match target {
            Some(target_session) => {
                let from = ChatEvent::PrivateFrom {
                    from: session.nickname.clone(),
                    content: content.to_string(),
                };
                if !target_session.send(from) {
                    warn!(recipient, "failed to deliver private message (queue full or closed)");
                }
                let _ = session.send(ChatEvent::PrivateTo {
                    to: recipient.to_string(),
                    content: content.to_string(),
                });
            }
            None => {
                let _ = session.send(ChatEvent::Notice {
                    message: format!("User \"{recipient}\" not found in this room."),
                });
            }
        }

        Ok(())
    }

    /// Nicknames of the room's current members, in join order. Sessions with
    /// an empty nickname are excluded.
    fn member_nicknames(&self, room: &RoomState) -> Vec<String> {
        room.members
            .iter()
            .filter_map(|sid| self.sessions.get(sid).map(|s| s.nickname.clone()))
            .filter(|nick| !nick.is_empty())
            .collect()
    }

    /// Send an event to every member of a room, optionally excluding one
    /// session. Runs under the caller's room guard, so every member sees the
    /// same membership snapshot. Delivery is best-effort per member: a full
    /// or closed queue is logged and never aborts the rest of the fan-out.
    fn broadcast_to_room(&self, room: &RoomState, event: &ChatEvent, exclude: Option<SessionId>) {
        for member_id in &room.members {
            if Some(*member_id) == exclude {
                continue;
            }
            if let Some(session) = self.sessions.get(member_id)
                && !session.send(event.clone())
            {
                warn!(%member_id, "failed to deliver event to session (queue full or closed)");
            }
        }
    }
}

/// History entry format for broadcast chat lines; replayed verbatim to later
/// joiners.
fn format_chat_line(nickname: &str, content: &str) -> String {
    format!("[{nickname}]: {content}")
}
