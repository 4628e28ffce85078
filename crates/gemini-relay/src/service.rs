//! The inbound contract: one guarded dispatch per actor, history
//! snapshot in, exchange append out.

use std::sync::Arc;

use tracing::{debug, info};

use relay_client::{Attachment, Dispatcher};
use relay_core::{DispatchError, Turn};
use relay_gate::ActorGate;
use relay_history::HistoryStore;

pub struct ChatService {
    dispatcher: Dispatcher,
    store: Arc<HistoryStore>,
    gate: ActorGate,
    default_model: String,
}

impl ChatService {
    pub fn new(dispatcher: Dispatcher, store: Arc<HistoryStore>, default_model: String) -> Self {
        Self {
            dispatcher,
            store,
            gate: ActorGate::new(),
            default_model,
        }
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Keys the pool could hand out right now.
    pub fn eligible_keys(&self) -> usize {
        self.dispatcher.pool().eligible_count()
    }

    /// Run one guarded dispatch for `actor`.
    ///
    /// A second call for the same actor while one is in flight fails
    /// immediately with `ActorBusy`. On success the exchange is appended
    /// to the actor's history (text only, as the history keeps no
    /// attachment payloads) and persistence fires.
    pub async fn chat(
        &self,
        actor: &str,
        text: &str,
        attachments: &[Attachment],
        model: Option<&str>,
    ) -> Result<String, DispatchError> {
        let _guard = self
            .gate
            .try_enter(actor)
            .ok_or_else(|| DispatchError::ActorBusy(actor.to_string()))?;

        let history = self.store.get(actor);
        let model = model.unwrap_or(&self.default_model);
        debug!(actor = %actor, model = %model, turns = history.len(), "dispatching");

        let reply = self
            .dispatcher
            .dispatch(model, text, attachments, &history)
            .await?;

        self.store
            .append_exchange(actor, Turn::user(text), Turn::model(reply.clone()))
            .await;
        Ok(reply)
    }

    /// Reset an actor's history. Idempotent.
    pub async fn clear_history(&self, actor: &str) {
        info!(actor = %actor, "clearing history");
        self.store.clear(actor).await;
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
