//! AgentRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Async runtime specifics
//!
//! All types here describe runs, their lifecycle, and what gets streamed
//! to observers.

pub mod chat;
pub mod delivery;
pub mod error;
pub mod ids;
pub mod run;
pub mod status;

// Re-export commonly used types
pub use chat::{ChatMessage, ChatRole};
pub use delivery::{DeliveryMessage, StatusEvent, WireEvent, WireFrame};
pub use error::CoreError;
pub use ids::RunId;
pub use run::RunSummary;
pub use status::RunStatus;
