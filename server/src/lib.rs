//! Palaver: a multi-room, line-oriented chat server with persistent
//! per-room message history.
//!
//! Clients connect over TCP, pick a display name and a room, and exchange
//! broadcast or private text messages. Room history is replayed to new
//! joiners and survives restarts as one JSON file per room.

pub mod config;
pub mod engine;
pub mod history;
pub mod net;
