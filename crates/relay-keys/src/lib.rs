//! API key quota tracking and the rotating key pool.
//!
//! Each key carries a local per-minute quota counter that approximates the
//! upstream per-key rate limit. When a key's counter hits zero, or the
//! upstream signals rate limiting, the key enters a cooldown window during
//! which it is skipped by selection; once the window lapses the counter is
//! restored to its default. Cooldowns are plain deadlines owned by the
//! pool's keys and applied lazily at eligibility checks, so there are no
//! detached timer tasks to track.

mod key;
mod pool;

pub use key::{ApiKey, DEFAULT_QUOTA};
pub use pool::{COOLDOWN, KeyLease, KeyPool, KeyStatus};
