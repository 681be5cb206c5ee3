//! tlm-core: stable foundation for tlmsim.
//!
//! Contains:
//! - numeric (Real + tolerances + float checks)
//! - ids (compact IDs for nodes and components)
//! - message (bounded, thread-safe diagnostic queue)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod message;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use message::{DEFAULT_CAPACITY, Message, MessageHandler, Severity};
pub use numeric::*;
