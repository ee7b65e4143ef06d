//! The generic object cache.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::multimap::MultiMap;
use crate::object::record::{ObjectInfo, SpawnRecord};
use crate::object::{ObjectId, ObjectPoolSettings, PoolObject};

/// Evictable-record snapshot handed to a release filter.
#[derive(Clone, Copy, Debug)]
pub struct ReleaseCandidate {
    /// Handle of the candidate record.
    pub id: ObjectId,
    /// Eviction priority (lower is evicted first).
    pub priority: i32,
    /// Pool-clock timestamp of the last spawn/unspawn.
    pub last_use_time: f64,
}

/// Named object cache for one user type.
///
/// Tracks records under an identity map plus a name-indexed multimap, hands
/// objects out by [`ObjectId`], and evicts idle records by priority and age.
/// Time is the pool's own clock, accumulated from the update tick's real
/// elapsed seconds.
pub struct ObjectPool<T: PoolObject> {
    name: String,
    allow_multi_spawn: bool,
    auto_release_interval: f32,
    capacity: usize,
    expire_time: f32,
    priority: i32,
    auto_release_time: f32,
    clock: f64,
    next_id: u64,
    records: HashMap<ObjectId, SpawnRecord<T>>,
    name_index: MultiMap<String, ObjectId>,
}

impl<T: PoolObject> ObjectPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(name: impl Into<String>, allow_multi_spawn: bool, settings: ObjectPoolSettings) -> Self {
        Self {
            name: name.into(),
            allow_multi_spawn,
            auto_release_interval: settings.auto_release_interval,
            capacity: settings.capacity,
            expire_time: settings.expire_time,
            priority: settings.priority,
            auto_release_time: 0.0,
            clock: 0.0,
            next_id: 0,
            records: HashMap::new(),
            name_index: MultiMap::new(),
        }
    }

    /// Returns the pool name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of records, in-use included.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Returns the number of currently evictable records.
    #[must_use]
    pub fn can_release_count(&self) -> usize {
        self.release_candidates().len()
    }

    /// Returns whether one record may be spawned several times at once.
    #[inline]
    #[must_use]
    pub fn allow_multi_spawn(&self) -> bool {
        self.allow_multi_spawn
    }

    /// Returns the automatic eviction interval in real seconds.
    #[inline]
    #[must_use]
    pub fn auto_release_interval(&self) -> f32 {
        self.auto_release_interval
    }

    /// Sets the automatic eviction interval in real seconds.
    pub fn set_auto_release_interval(&mut self, interval: f32) {
        self.auto_release_interval = interval;
    }

    /// Returns the record count above which eviction passes run.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sets the capacity; shrinking triggers an immediate eviction pass.
    pub fn set_capacity(&mut self, capacity: usize) {
        if self.capacity == capacity {
            return;
        }
        self.capacity = capacity;
        self.release();
    }

    /// Returns the idle-expiry time in seconds (`f32::INFINITY` = never).
    #[inline]
    #[must_use]
    pub fn expire_time(&self) -> f32 {
        self.expire_time
    }

    /// Sets the idle-expiry time; changing it triggers an eviction pass.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidParameter`] for a negative or NaN value.
    pub fn set_expire_time(&mut self, expire_time: f32) -> CoreResult<()> {
        if expire_time < 0.0 || expire_time.is_nan() {
            return Err(CoreError::InvalidParameter {
                what: "expire time must be non-negative",
            });
        }
        if self.expire_time == expire_time {
            return Ok(());
        }
        self.expire_time = expire_time;
        self.release();
        Ok(())
    }

    /// Returns the pool priority.
    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Sets the pool priority.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Wraps `target` in a spawn record and indexes it under its name.
    ///
    /// `spawned` registers the record as already handed out. Exceeding the
    /// capacity afterwards triggers an eviction pass.
    pub fn register(&mut self, target: T, spawned: bool) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);

        let record = SpawnRecord::new(id, target, spawned, self.clock);
        self.name_index.insert(record.name.clone(), id);
        self.records.insert(id, record);

        if self.count() > self.capacity {
            self.release();
        }

        id
    }

    /// Returns whether an unnamed record is eligible for spawning.
    #[must_use]
    pub fn can_spawn(&self) -> bool {
        self.can_spawn_named("")
    }

    /// Returns whether a record under `name` is eligible for spawning.
    #[must_use]
    pub fn can_spawn_named(&self, name: &str) -> bool {
        self.name_index
            .get(name)
            .iter()
            .any(|id| self.is_spawnable(*id))
    }

    /// Spawns the first eligible unnamed record.
    pub fn spawn(&mut self) -> Option<ObjectId> {
        self.spawn_named("")
    }

    /// Spawns the first eligible record under `name`.
    ///
    /// Marks the record in use, bumps its spawn count, refreshes its last
    /// use time and runs its spawn hook. Returns `None` when no eligible
    /// record exists - a valid outcome, not an error.
    pub fn spawn_named(&mut self, name: &str) -> Option<ObjectId> {
        let id = self
            .name_index
            .get(name)
            .iter()
            .copied()
            .find(|id| self.is_spawnable(*id))?;

        let clock = self.clock;
        if let Some(record) = self.records.get_mut(&id) {
            record.spawn(clock);
        }
        Some(id)
    }

    /// Returns the wrapped object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.records.get(&id).map(|record| &record.target)
    }

    /// Returns the wrapped object mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut T> {
        self.records.get_mut(&id).map(|record| &mut record.target)
    }

    /// Returns the record to the idle state without destroying it.
    ///
    /// # Errors
    ///
    /// [`CoreError::ObjectNotFound`] for an unknown id and
    /// [`CoreError::InvalidParameter`] when the record is already idle.
    pub fn unspawn(&mut self, id: ObjectId) -> CoreResult<()> {
        let clock = self.clock;
        let Some(record) = self.records.get_mut(&id) else {
            return Err(self.not_found(id));
        };
        if !record.is_in_use() {
            return Err(CoreError::InvalidParameter {
                what: "unspawn of an idle record",
            });
        }

        record.unspawn(clock);
        let idle = !record.is_in_use();
        if self.count() > self.capacity && idle {
            self.release();
        }
        Ok(())
    }

    /// Locks or unlocks the record against eviction.
    ///
    /// # Errors
    ///
    /// [`CoreError::ObjectNotFound`] for an unknown id.
    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> CoreResult<()> {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.locked = locked;
                Ok(())
            }
            None => Err(self.not_found(id)),
        }
    }

    /// Sets the record's eviction priority.
    ///
    /// # Errors
    ///
    /// [`CoreError::ObjectNotFound`] for an unknown id.
    pub fn set_object_priority(&mut self, id: ObjectId, priority: i32) -> CoreResult<()> {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.priority = priority;
                Ok(())
            }
            None => Err(self.not_found(id)),
        }
    }

    /// Releases one specific record immediately.
    ///
    /// Returns `false` when the record is missing or not evictable
    /// (in use, locked, or custom-vetoed).
    pub fn release_object(&mut self, id: ObjectId) -> bool {
        match self.records.get(&id) {
            Some(record) => {
                if record.is_in_use() || record.locked || !record.target.can_release() {
                    return false;
                }
            }
            None => return false,
        }

        let Some(mut record) = self.records.remove(&id) else {
            return false;
        };
        self.name_index.remove(&record.name, &id);
        record.release(false);
        true
    }

    /// Runs an eviction pass with the default filter and the default budget
    /// (`count - capacity`).
    pub fn release(&mut self) {
        let budget = self.count().saturating_sub(self.capacity);
        self.release_with(budget, default_release_filter);
    }

    /// Runs an eviction pass with the default filter and an explicit budget.
    pub fn release_count(&mut self, to_release: usize) {
        self.release_with(to_release, default_release_filter);
    }

    /// Runs an eviction pass with a custom filter.
    ///
    /// The filter receives the evictable-record snapshots, the count budget
    /// and the expiry cutoff (absent when the pool never expires), and
    /// answers the ids to evict. Every pass resets the auto-release
    /// accumulator, whether or not anything was evicted.
    pub fn release_with<F>(&mut self, to_release: usize, filter: F)
    where
        F: FnOnce(&[ReleaseCandidate], usize, Option<f64>) -> Vec<ObjectId>,
    {
        self.auto_release_time = 0.0;

        let cutoff = self
            .expire_time
            .is_finite()
            .then(|| self.clock - f64::from(self.expire_time));

        let candidates = self.release_candidates();
        for id in filter(&candidates, to_release, cutoff) {
            self.release_object(id);
        }
    }

    /// Releases every currently evictable record.
    pub fn release_all_unused(&mut self) {
        self.auto_release_time = 0.0;
        for candidate in self.release_candidates() {
            self.release_object(candidate.id);
        }
    }

    /// Accumulates real time and runs the automatic eviction pass once the
    /// configured interval is exceeded.
    pub fn update(&mut self, _elapsed: f32, real_elapsed: f32) {
        self.clock += f64::from(real_elapsed);
        self.auto_release_time += real_elapsed;
        if self.auto_release_time < self.auto_release_interval {
            return;
        }

        self.release();
    }

    /// Forcibly releases every record, in-use and locked included.
    pub fn shutdown(&mut self) {
        for (_, mut record) in self.records.drain() {
            record.release(true);
        }
        self.name_index.clear();
        self.auto_release_time = 0.0;
    }

    /// Returns an introspection snapshot of every record.
    #[must_use]
    pub fn infos(&self) -> Vec<ObjectInfo> {
        self.records.values().map(SpawnRecord::info).collect()
    }

    fn is_spawnable(&self, id: ObjectId) -> bool {
        self.records
            .get(&id)
            .is_some_and(|record| self.allow_multi_spawn || !record.is_in_use())
    }

    fn release_candidates(&self) -> Vec<ReleaseCandidate> {
        self.records
            .values()
            .filter(|record| {
                !record.is_in_use() && !record.locked && record.target.can_release()
            })
            .map(|record| ReleaseCandidate {
                id: record.id,
                priority: record.priority,
                last_use_time: record.last_use_time,
            })
            .collect()
    }

    fn not_found(&self, id: ObjectId) -> CoreError {
        CoreError::ObjectNotFound {
            pool: self.name.clone(),
            id: id.0,
        }
    }
}

/// Default eviction filter.
///
/// Expired-by-age candidates are always selected, outside the count budget;
/// the remainder is ordered by ascending `(priority, last_use_time)` and
/// taken up to whatever budget the expired set left over.
#[must_use]
pub fn default_release_filter(
    candidates: &[ReleaseCandidate],
    to_release: usize,
    cutoff: Option<f64>,
) -> Vec<ObjectId> {
    let mut selected = Vec::new();
    let mut budget = to_release;

    let mut remaining: Vec<&ReleaseCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if cutoff.is_some_and(|cutoff| candidate.last_use_time <= cutoff) {
            selected.push(candidate.id);
            budget = budget.saturating_sub(1);
        } else {
            remaining.push(candidate);
        }
    }

    remaining.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.last_use_time.total_cmp(&b.last_use_time))
    });
    selected.extend(remaining.iter().take(budget).map(|candidate| candidate.id));

    selected
}
