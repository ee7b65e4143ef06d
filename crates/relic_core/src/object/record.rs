//! Spawn record: one user object plus its cache bookkeeping.

use crate::object::{ObjectId, PoolObject};

/// One cached object.
///
/// `spawn_count > 0` means currently in use; for single-spawn pools the
/// count is 0 or 1. A record that is in use, locked, or custom-vetoed is
/// never eligible for eviction.
pub(crate) struct SpawnRecord<T> {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) target: T,
    pub(crate) locked: bool,
    pub(crate) priority: i32,
    pub(crate) last_use_time: f64,
    pub(crate) spawn_count: u32,
}

impl<T: PoolObject> SpawnRecord<T> {
    pub(crate) fn new(id: ObjectId, target: T, spawned: bool, now: f64) -> Self {
        Self {
            id,
            name: target.name().to_owned(),
            target,
            locked: false,
            priority: 0,
            last_use_time: now,
            spawn_count: u32::from(spawned),
        }
    }

    #[inline]
    pub(crate) fn is_in_use(&self) -> bool {
        self.spawn_count > 0
    }

    pub(crate) fn spawn(&mut self, now: f64) {
        self.spawn_count += 1;
        self.last_use_time = now;
        self.target.on_spawn();
    }

    pub(crate) fn unspawn(&mut self, now: f64) {
        self.target.on_unspawn();
        self.last_use_time = now;
        self.spawn_count -= 1;
    }

    pub(crate) fn release(&mut self, is_shutdown: bool) {
        self.target.on_release(is_shutdown);
    }

    pub(crate) fn info(&self) -> ObjectInfo {
        ObjectInfo {
            name: self.name.clone(),
            locked: self.locked,
            custom_can_release: self.target.can_release(),
            priority: self.priority,
            last_use_time: self.last_use_time,
            spawn_count: self.spawn_count,
        }
    }
}

/// Introspection snapshot of one spawn record.
#[derive(Clone, Debug)]
pub struct ObjectInfo {
    /// Record name.
    pub name: String,
    /// Whether the record is locked against eviction.
    pub locked: bool,
    /// The object's own release veto at snapshot time.
    pub custom_can_release: bool,
    /// Eviction priority (lower is evicted first).
    pub priority: i32,
    /// Pool-clock timestamp of the last spawn/unspawn.
    pub last_use_time: f64,
    /// Outstanding spawns.
    pub spawn_count: u32,
}
