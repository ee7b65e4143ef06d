//! # Object Pool
//!
//! Named, priority- and expiry-aware cache of spawn/recycle objects.
//!
//! A pool wraps user objects in spawn records, indexes them by name through
//! an insertion-ordered multimap and by an [`ObjectId`] handle, and evicts
//! idle records through a pluggable filter. The default filter releases
//! expired-by-age records first (always, outside any count budget), then the
//! remainder by ascending `(priority, last_use_time)`.
//!
//! Storage is self-contained - the object pool shares the typed-collection
//! philosophy of the reference pool but does not ride on it.
//!
//! Not safe for concurrent invocation: one logical thread owns the pools.

mod manager;
mod pool;
mod record;

pub use manager::{ObjectPoolBase, ObjectPoolManager};
pub use pool::{default_release_filter, ObjectPool, ReleaseCandidate};
pub use record::ObjectInfo;

/// Handle of one spawn record inside its pool.
///
/// Replaces reference identity: `spawn` hands out an id, `get`/`get_mut`
/// reach the wrapped object, `unspawn`/`release_object` take the id back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// An object manageable by an [`ObjectPool`].
pub trait PoolObject: 'static {
    /// Name the record is indexed under; the empty string is a valid name.
    fn name(&self) -> &str {
        ""
    }

    /// Custom release veto: an object answering `false` is never evicted.
    fn can_release(&self) -> bool {
        true
    }

    /// Invoked when the record is handed out.
    fn on_spawn(&mut self) {}

    /// Invoked when the record returns to the idle state.
    fn on_unspawn(&mut self) {}

    /// Invoked when the record is permanently released.
    ///
    /// `is_shutdown` is `true` when the whole pool is being torn down.
    fn on_release(&mut self, is_shutdown: bool) {
        let _ = is_shutdown;
    }
}

/// Construction-time settings of one object pool.
#[derive(Clone, Copy, Debug)]
pub struct ObjectPoolSettings {
    /// Seconds of accumulated real time between automatic eviction passes.
    pub auto_release_interval: f32,
    /// Record count above which eviction passes run.
    pub capacity: usize,
    /// Idle seconds after which a record counts as expired;
    /// `f32::INFINITY` means never.
    pub expire_time: f32,
    /// Pool priority; lower-priority pools are released first by the manager.
    pub priority: i32,
}

impl Default for ObjectPoolSettings {
    fn default() -> Self {
        Self {
            auto_release_interval: f32::INFINITY,
            capacity: usize::MAX,
            expire_time: f32::INFINITY,
            priority: 0,
        }
    }
}
