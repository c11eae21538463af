//! Session registry: the waiting queue and the map of live sessions
//!
//! The registry is owned by the coordinator task and is never shared, so it
//! carries no locks. Every method completes its mutation before returning.

pub mod instance;
pub mod registry;

pub use instance::{Participant, Session, SessionStatus};
pub use registry::{QueueEntry, SessionRegistry};
