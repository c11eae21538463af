//! Real-time channel transport

pub mod websocket;

pub use websocket::{router, TransportState};
