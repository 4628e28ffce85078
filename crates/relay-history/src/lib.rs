//! Per-actor conversation history: in-memory store with atomic exchange
//! appends, and a pluggable persistence sink for JSON blobs.
//!
//! The in-memory store is the source of truth for the process lifetime.
//! Persistence runs after each successful mutation and its failures are
//! logged and swallowed; durable storage may lag but never fails a
//! dispatch that already succeeded upstream.

pub mod sink;
pub mod store;

pub use sink::{HistorySink, JsonFileSink, NoopSink};
pub use store::HistoryStore;
