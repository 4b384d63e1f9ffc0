use uuid::Uuid;

/// Unique identifier for a connected session (one per connection, not per user).
pub type SessionId = Uuid;

/// Event that flows from the chat engine to a session's connection task.
/// The engine never writes to sockets directly; the wire adapter renders
/// these to protocol lines.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A chat line broadcast to the room. Carries the formatted history
    /// entry so delivery and replay show the identical text.
    Message { line: String },

    /// Another user joined the recipient's room.
    Joined { nickname: String },

    /// Another user left the recipient's room.
    Left { nickname: String },

    /// Refreshed list of named members in the recipient's room.
    ActiveUsers { nicknames: Vec<String> },

    /// Private message addressed to the recipient.
    PrivateFrom { from: String, content: String },

    /// Confirmation of a private message, echoed back to its sender.
    PrivateTo { to: String, content: String },

    /// Warning or informational notice for this session only.
    Notice { message: String },
}
