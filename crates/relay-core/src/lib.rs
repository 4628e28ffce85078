//! Shared types for the relay: conversation turns as the upstream API
//! serializes them, and the dispatch error taxonomy.

pub mod error;
pub mod turn;

pub use error::DispatchError;
pub use turn::{InlineBlob, Part, Role, Turn};
