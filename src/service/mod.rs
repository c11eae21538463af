//! Service layer for the arena-room coordinator
//!
//! This module contains the application state that wires the store, the
//! coordinator, the WebSocket listener and the health server together, plus
//! the health checks served over HTTP.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus, ServiceProbe};
