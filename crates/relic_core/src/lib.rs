//! # RELIC Core Engines
//!
//! The four cooperating resource-lifecycle engines:
//!
//! 1. **Reference pool** - process-wide typed free lists, no dependencies
//! 2. **Event pool** - per-key subscriber tables, allocates its per-key
//!    records from the reference pool
//! 3. **Timer scheduler** - two time-ordered lists (scaled / unscaled),
//!    allocates timer records from the reference pool
//! 4. **Object pool** - named spawn-record cache with priority/expiry
//!    eviction, independent storage
//!
//! ## Architecture Rules
//!
//! 1. **One logical update thread** - an external driver calls
//!    `update(elapsed, real_elapsed)` once per frame and `shutdown()` once
//!    at process end; only the reference pool tolerates other threads
//! 2. **Deferred mutation** - every engine stays safely iterable while
//!    client code re-enters it; add/remove requests made during a dispatch
//!    pass are buffered and applied when the pass completes
//! 3. **No hidden globals** - the reference pool is an explicit registry
//!    object owned by the runtime and injected into its consumers
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use relic_core::{EventPool, ReferencePool, TimerScheduler};
//!
//! let refs = Arc::new(ReferencePool::new());
//! let mut timers = TimerScheduler::new(Arc::clone(&refs));
//! timers.add_timer(1.0, 3, false, |_ctx| { /* fired */ });
//! timers.update(2.5, 2.5); // catch-up: fires twice in one tick
//! ```

pub mod error;
pub mod event;
pub mod multimap;
pub mod object;
pub mod reference;
pub mod timer;

pub use error::{CoreError, CoreResult};
pub use event::{EventArgs, EventId, EventPool, HandlerTag};
pub use multimap::MultiMap;
pub use object::{
    ObjectId, ObjectInfo, ObjectPool, ObjectPoolBase, ObjectPoolManager, ObjectPoolSettings,
    PoolObject, ReleaseCandidate,
};
pub use reference::{Recyclable, ReferencePool, ReferencePoolInfo, TypeTag};
pub use timer::{TimerId, TimerScheduler, DEFAULT_MAX_CATCHUP_PASSES};
