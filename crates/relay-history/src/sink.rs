//! Persistence collaborators for actor histories.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use relay_core::Turn;

/// Save/load contract for durable history storage.
///
/// `save` is invoked after each successful in-memory mutation; `load_all`
/// once at startup.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn save(&self, actor: &str, turns: &[Turn]) -> Result<()>;
    async fn load_all(&self) -> Result<HashMap<String, Vec<Turn>>>;
}

/// Sink that stores nothing. Used by tests and by deployments that accept
/// history loss on restart.
#[derive(Debug, Default, Clone)]
pub struct NoopSink;

#[async_trait]
impl HistorySink for NoopSink {
    async fn save(&self, _actor: &str, _turns: &[Turn]) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<HashMap<String, Vec<Turn>>> {
        Ok(HashMap::new())
    }
}

/// One JSON document per actor under a state directory.
///
/// Actor identifiers are opaque, so the filename is a sanitized form and
/// the document itself carries the authoritative identifier.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct HistoryRecord {
    actor: String,
    saved_at: DateTime<Utc>,
    turns: Vec<Turn>,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, actor: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_actor(actor)))
    }
}

/// Keep filename-safe characters, replace the rest.
fn sanitize_actor(actor: &str) -> String {
    actor
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl HistorySink for JsonFileSink {
    async fn save(&self, actor: &str, turns: &[Turn]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create history dir: {}", self.dir.display()))?;

        let record = HistoryRecord {
            actor: actor.to_string(),
            saved_at: Utc::now(),
            turns: turns.to_vec(),
        };
        let contents =
            serde_json::to_string_pretty(&record).context("Failed to serialize history record")?;

        let path = self.record_path(actor);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write history record: {}", path.display()))?;
        Ok(())
    }

    async fn load_all(&self) -> Result<HashMap<String, Vec<Turn>>> {
        let mut histories = HashMap::new();
        if !self.dir.exists() {
            return Ok(histories);
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read history dir: {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(c) => c,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable history record");
                    continue;
                }
            };
            // Corrupt records are skipped, not fatal.
            match serde_json::from_str::<HistoryRecord>(&contents) {
                Ok(record) => {
                    histories.insert(record.actor, record.turns);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping corrupt history record");
                }
            }
        }
        Ok(histories)
    }
}
