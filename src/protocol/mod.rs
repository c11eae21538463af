//! Client/server event protocol

pub mod messages;

pub use messages::{ClientMessage, ErrorCode, ResultParty, ServerMessage, SettledParty};
