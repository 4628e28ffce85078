//! Per-actor concurrency gate. Independent crate with no internal relay
//! dependencies.
//!
//! At most one dispatch may be in flight per actor. Entry never blocks:
//! a second `try_enter` for an actor whose guard is still alive fails
//! immediately, and the caller rejects the request instead of queueing it.
//!
//! The guard releases in `Drop`, so every exit path of the guarded work
//! (success, error, panic unwind) frees the actor again.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Process-wide set of actors with an in-flight dispatch.
///
/// Cheap to clone; clones share the same underlying set.
#[derive(Clone, Default)]
pub struct ActorGate {
    active: Arc<Mutex<HashSet<String>>>,
}

/// Guard for one actor's in-flight dispatch. Releases on drop.
pub struct ActorGuard {
    actor: String,
    active: Arc<Mutex<HashSet<String>>>,
    released: bool,
}

impl std::fmt::Debug for ActorGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorGuard")
            .field("actor", &self.actor)
            .finish()
    }
}

impl ActorGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to enter the gate for `actor`.
    ///
    /// Returns `None` immediately if the actor already has an in-flight
    /// dispatch. On success the returned guard holds the entry until drop.
    pub fn try_enter(&self, actor: &str) -> Option<ActorGuard> {
        let mut active = self.active.lock().expect("actor gate poisoned");
        if !active.insert(actor.to_string()) {
            debug!(actor = %actor, "gate entry rejected: dispatch in flight");
            return None;
        }
        Some(ActorGuard {
            actor: actor.to_string(),
            active: Arc::clone(&self.active),
            released: false,
        })
    }

    /// Whether `actor` currently holds an entry.
    pub fn is_busy(&self, actor: &str) -> bool {
        self.active
            .lock()
            .expect("actor gate poisoned")
            .contains(actor)
    }

    /// Number of actors with an in-flight dispatch.
    pub fn in_flight(&self) -> usize {
        self.active.lock().expect("actor gate poisoned").len()
    }
}

impl ActorGuard {
    /// The actor this guard belongs to.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Explicitly release before drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.actor);
        }
        self.released = true;
    }
}

impl Drop for ActorGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_try_enter_succeeds() {
        let gate = ActorGate::new();
        let guard = gate.try_enter("actor-1");
        assert!(guard.is_some());
        assert_eq!(guard.unwrap().actor(), "actor-1");
    }

    #[test]
    fn test_second_enter_fails_while_held() {
        let gate = ActorGate::new();
        let _held = gate.try_enter("actor-1").expect("first enter should succeed");
        assert!(gate.try_enter("actor-1").is_none());
    }

    #[test]
    fn test_enter_succeeds_after_drop() {
        let gate = ActorGate::new();
        {
            let _held = gate.try_enter("actor-1").expect("first enter should succeed");
            assert!(gate.is_busy("actor-1"));
        }
        assert!(!gate.is_busy("actor-1"));
        assert!(gate.try_enter("actor-1").is_some());
    }

    #[test]
    fn test_explicit_release() {
        let gate = ActorGate::new();
        let guard = gate.try_enter("actor-1").expect("enter should succeed");
        guard.release();
        assert!(gate.try_enter("actor-1").is_some());
    }

    #[test]
    fn test_different_actors_independent() {
        let gate = ActorGate::new();
        let _a = gate.try_enter("actor-a").expect("actor-a should enter");
        let b = gate.try_enter("actor-b");
        assert!(b.is_some(), "actor-b must not be blocked by actor-a");
        assert_eq!(gate.in_flight(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let gate = ActorGate::new();
        let clone = gate.clone();
        let _held = gate.try_enter("actor-1").expect("enter should succeed");
        assert!(clone.try_enter("actor-1").is_none());
        assert!(clone.is_busy("actor-1"));
    }

    #[test]
    fn test_concurrent_enter_exactly_one_wins() {
        let gate = ActorGate::new();
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if let Some(guard) = gate.try_enter("contended") {
                        wins.fetch_add(1, Ordering::SeqCst);
                        // Hold the guard long enough for the other threads
                        // to attempt entry.
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        drop(guard);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1, "exactly one enter must win");
        assert!(!gate.is_busy("contended"));
    }

    #[test]
    fn test_guard_released_on_panic_unwind() {
        let gate = ActorGate::new();
        let panicking = {
            let gate = gate.clone();
            std::thread::spawn(move || {
                let _guard = gate.try_enter("doomed").expect("enter should succeed");
                panic!("simulated dispatch fault");
            })
        };
        assert!(panicking.join().is_err());
        assert!(
            !gate.is_busy("doomed"),
            "unwind must release the actor's entry"
        );
    }

    #[test]
    fn test_guard_debug_format() {
        let gate = ActorGate::new();
        let guard = gate.try_enter("dbg-actor").unwrap();
        let debug = format!("{:?}", guard);
        assert!(debug.contains("ActorGuard"));
        assert!(debug.contains("dbg-actor"));
    }
}
