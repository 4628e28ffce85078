use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Quota units a key regains after each cooldown window.
pub const DEFAULT_QUOTA: u32 = 2;

struct KeyState {
    remaining: u32,
    cooldown_until: Option<Instant>,
}

impl KeyState {
    /// Apply a lapsed cooldown: restore quota to default, clear the
    /// deadline. No-op while the deadline is still in the future.
    fn refresh(&mut self) {
        if let Some(until) = self.cooldown_until {
            if Instant::now() >= until {
                self.remaining = DEFAULT_QUOTA;
                self.cooldown_until = None;
            }
        }
    }

    fn cooling(&self) -> bool {
        self.cooldown_until.is_some()
    }
}

/// One API secret with its mutable quota/cooldown state.
///
/// All state transitions happen under the key's own mutex, so concurrent
/// dispatches sharing a key never drive the counter negative or observe a
/// half-applied cooldown.
pub struct ApiKey {
    secret: String,
    state: Mutex<KeyState>,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret is deliberately absent.
        f.debug_struct("ApiKey")
            .field("remaining", &self.remaining())
            .field("cooling", &self.is_cooling())
            .finish()
    }
}

impl ApiKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            state: Mutex::new(KeyState {
                remaining: DEFAULT_QUOTA,
                cooldown_until: None,
            }),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Remaining quota units, after applying any lapsed cooldown.
    pub fn remaining(&self) -> u32 {
        let mut state = self.state.lock().expect("key state poisoned");
        state.refresh();
        state.remaining
    }

    /// Whether the key is inside an unexpired cooldown window.
    pub fn is_cooling(&self) -> bool {
        let mut state = self.state.lock().expect("key state poisoned");
        state.refresh();
        state.cooling()
    }

    /// Whether selection may hand this key out: cooldown clear and at
    /// least one quota unit left.
    pub fn is_eligible(&self) -> bool {
        let mut state = self.state.lock().expect("key state poisoned");
        state.refresh();
        !state.cooling() && state.remaining > 0
    }

    /// Consume one quota unit. Returns the units left after the decrement,
    /// or `None` if the counter was already zero (saturating, never
    /// negative).
    pub fn try_consume(&self) -> Option<u32> {
        let mut state = self.state.lock().expect("key state poisoned");
        state.refresh();
        if state.remaining == 0 {
            return None;
        }
        state.remaining -= 1;
        Some(state.remaining)
    }

    /// Start a cooldown window ending `interval` from now. The quota
    /// counter resets to default on the first check past the deadline.
    pub fn begin_cooldown(&self, interval: Duration) {
        let mut state = self.state.lock().expect("key state poisoned");
        state.cooldown_until = Some(Instant::now() + interval);
    }
}
