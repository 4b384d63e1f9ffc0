pub mod chat_engine;
pub mod events;
pub mod room;
pub mod user_session;
