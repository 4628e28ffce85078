//! In-memory per-actor history with delegated persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use relay_core::Turn;

use crate::sink::{HistorySink, NoopSink};

/// Process-wide store of per-actor conversation histories.
///
/// The map sits behind a mutex held only for short, non-await sections:
/// an exchange is appended as a single two-turn extend, so no reader ever
/// observes a request turn without its response turn. The persistence
/// sink runs after the lock is released, against a snapshot.
pub struct HistoryStore {
    entries: Mutex<HashMap<String, Vec<Turn>>>,
    sink: Arc<dyn HistorySink>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Store without durable persistence.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NoopSink))
    }

    pub fn with_sink(sink: Arc<dyn HistorySink>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Replace in-memory state with the sink's contents. Called once at
    /// startup, before any dispatch runs.
    pub async fn load(&self) -> anyhow::Result<usize> {
        let loaded = self.sink.load_all().await?;
        let count = loaded.len();
        *self.entries.lock().expect("history store poisoned") = loaded;
        Ok(count)
    }

    /// Snapshot of an actor's history; empty for unknown actors.
    pub fn get(&self, actor: &str) -> Vec<Turn> {
        self.entries
            .lock()
            .expect("history store poisoned")
            .get(actor)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of actors with a (possibly empty) history entry.
    pub fn actor_count(&self) -> usize {
        self.entries.lock().expect("history store poisoned").len()
    }

    /// Append one request/response exchange atomically, then persist.
    ///
    /// The two turns land in one critical section; a persistence failure
    /// is logged and swallowed, leaving the in-memory history intact.
    pub async fn append_exchange(&self, actor: &str, user_turn: Turn, model_turn: Turn) {
        let snapshot = {
            let mut entries = self.entries.lock().expect("history store poisoned");
            let history = entries.entry(actor.to_string()).or_default();
            history.extend([user_turn, model_turn]);
            history.clone()
        };
        self.persist(actor, &snapshot).await;
    }

    /// Reset an actor's history to empty and persist the empty blob.
    /// Idempotent.
    pub async fn clear(&self, actor: &str) {
        {
            let mut entries = self.entries.lock().expect("history store poisoned");
            entries.insert(actor.to_string(), Vec::new());
        }
        self.persist(actor, &[]).await;
    }

    async fn persist(&self, actor: &str, turns: &[Turn]) {
        if let Err(err) = self.sink.save(actor, turns).await {
            warn!(actor = %actor, error = %err, "failed to persist history; in-memory state kept");
        }
    }
}
