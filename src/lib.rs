//! Arena Room - real-time coordinator for two-player competitive games
//!
//! This crate pairs players first-come-first-served, relays live game state
//! between the two participants of a session, settles finished games with an
//! Elo update exactly once and orchestrates rematches, all over a WebSocket
//! channel.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod rating;
pub mod service;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use store::{GameStore, InMemoryGameStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
