use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::key::ApiKey;

/// Cooldown window after a key is exhausted or rate-limited.
pub const COOLDOWN: Duration = Duration::from_secs(60);

/// Upper bound of the random jitter added to each cooldown, spreading the
/// re-eligibility instants of keys that were exhausted together.
const COOLDOWN_JITTER_MS: u64 = 1000;

/// Handle to a key selected for one dispatch attempt.
///
/// Carries the pool index so a dispatcher can exclude the key from the
/// rest of its invocation, and the key itself for quota bookkeeping.
pub struct KeyLease {
    index: usize,
    key: Arc<ApiKey>,
}

impl KeyLease {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn secret(&self) -> &str {
        self.key.secret()
    }
}

impl std::fmt::Debug for KeyLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLease").field("index", &self.index).finish()
    }
}

/// Diagnostic snapshot of one key's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub index: usize,
    pub remaining: u32,
    pub cooling: bool,
}

/// Rotating pool of API keys shared by all dispatches.
///
/// Key order is shuffled once at construction; selection then walks a
/// round-robin cursor so consecutive requests spread across keys. The
/// cursor is the only pool-level state and sits behind its own mutex;
/// quota and cooldown state live inside each key.
pub struct KeyPool {
    keys: Vec<Arc<ApiKey>>,
    cursor: Mutex<usize>,
    cooldown: Duration,
}

impl KeyPool {
    /// Build a pool from secrets in shuffled order.
    pub fn new(secrets: Vec<String>) -> Self {
        let mut secrets = secrets;
        secrets.shuffle(&mut rand::thread_rng());
        Self::ordered(secrets)
    }

    /// Build a pool preserving the given secret order.
    pub fn ordered(secrets: Vec<String>) -> Self {
        assert!(!secrets.is_empty(), "KeyPool requires at least one key");
        Self {
            keys: secrets.into_iter().map(|s| Arc::new(ApiKey::new(s))).collect(),
            cursor: Mutex::new(0),
            cooldown: COOLDOWN,
        }
    }

    /// Override the cooldown window (tests use short windows).
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Select the next eligible key in rotation order, skipping keys in
    /// `tried` and keys that are cooling or out of quota. Lapsed cooldowns
    /// are reset as a side effect of the eligibility check. Returns `None`
    /// when no key qualifies in a full rotation pass.
    pub fn acquire_eligible(&self, tried: &HashSet<usize>) -> Option<KeyLease> {
        let mut cursor = self.cursor.lock().expect("pool cursor poisoned");
        let total = self.keys.len();

        for offset in 0..total {
            let index = (*cursor + offset) % total;
            if tried.contains(&index) {
                continue;
            }
            let key = &self.keys[index];
            if !key.is_eligible() {
                continue;
            }
            *cursor = (index + 1) % total;
            return Some(KeyLease {
                index,
                key: Arc::clone(key),
            });
        }
        None
    }

    /// Consume one quota unit of the leased key. Returns whether a unit
    /// was actually consumed (false when a concurrent dispatch already
    /// drained the key). Hitting zero starts a speculative cooldown so the
    /// key re-enters rotation with fresh quota after the window.
    pub fn mark_used(&self, lease: &KeyLease) -> bool {
        match lease.key.try_consume() {
            Some(0) => {
                debug!(key = lease.index, "local quota hit zero, starting cooldown");
                lease.key.begin_cooldown(self.jittered_cooldown());
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Put the leased key into cooldown after an upstream rate-limit or
    /// transport failure.
    pub fn mark_exhausted(&self, lease: &KeyLease) {
        let cooldown = self.jittered_cooldown();
        warn!(key = lease.index, cooldown_secs = cooldown.as_secs(), "key entering cooldown");
        lease.key.begin_cooldown(cooldown);
    }

    /// Per-key state snapshot for diagnostics.
    pub fn status(&self) -> Vec<KeyStatus> {
        self.keys
            .iter()
            .enumerate()
            .map(|(index, key)| KeyStatus {
                index,
                remaining: key.remaining(),
                cooling: key.is_cooling(),
            })
            .collect()
    }

    /// Keys currently selectable.
    pub fn eligible_count(&self) -> usize {
        self.keys.iter().filter(|key| key.is_eligible()).count()
    }

    fn jittered_cooldown(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=COOLDOWN_JITTER_MS);
        self.cooldown + Duration::from_millis(jitter)
    }
}
