//! Literal wire text for the line protocol. Exact strings matter: existing
//! clients of this protocol match on them. All functions return one line
//! without the trailing newline (the writer appends it).

pub const NAME_PROMPT: &str = "Enter your name: ";
pub const ROOM_PROMPT: &str = "Enter chat room ID to join/create: ";

pub const HISTORY_START: &str = "--- Message History ---";
pub const HISTORY_END: &str = "--- End of History ---";

/// Sent to the leaving session itself on /exit, never broadcast.
pub const FAREWELL: &str = "You left the chat.";

/// Generic per-line failure report; the connection stays open.
pub const PROCESSING_WARNING: &str = "An error occurred while processing your message.";

pub fn join_confirmation(room: &str) -> String {
    format!("You joined room: {room}")
}

pub fn joined(nickname: &str) -> String {
    format!("{nickname} joined the room.")
}

pub fn left(nickname: &str) -> String {
    format!("{nickname} left the room.")
}

/// `Active users: ` + comma-joined names, or `None` when nobody is named.
pub fn active_users(nicknames: &[String]) -> String {
    if nicknames.is_empty() {
        "Active users: None".to_string()
    } else {
        format!("Active users: {}", nicknames.join(", "))
    }
}

pub fn private_from(from: &str, content: &str) -> String {
    format!("[Private from {from}]: {content}")
}

pub fn private_to(to: &str, content: &str) -> String {
    format!("[Private to {to}]: {content}")
}
