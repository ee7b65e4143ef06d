//! Pool manager: typed pools behind one (type, name)-keyed table.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::object::{ObjectPool, ObjectPoolSettings, PoolObject};

/// Type-erased surface of one object pool, what the manager drives.
///
/// The `Any` supertrait allows the manager to hand typed pools back out
/// through downcasting, replacing the reflective pool instantiation of a
/// dynamically-typed runtime with plain trait objects.
pub trait ObjectPoolBase: Any {
    /// Pool name.
    fn name(&self) -> &str;
    /// Name of the pooled object type.
    fn object_type_name(&self) -> &'static str;
    /// Number of records, in-use included.
    fn count(&self) -> usize;
    /// Number of currently evictable records.
    fn can_release_count(&self) -> usize;
    /// Whether one record may be spawned several times at once.
    fn allow_multi_spawn(&self) -> bool;
    /// Pool priority; lower-priority pools are released first.
    fn priority(&self) -> i32;
    /// Runs an eviction pass with the default budget.
    fn release(&mut self);
    /// Releases every currently evictable record.
    fn release_all_unused(&mut self);
    /// Per-frame tick.
    fn update(&mut self, elapsed: f32, real_elapsed: f32);
    /// Forcibly releases every record.
    fn shutdown(&mut self);
}

impl<T: PoolObject> ObjectPoolBase for ObjectPool<T> {
    fn name(&self) -> &str {
        self.name()
    }

    fn object_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn count(&self) -> usize {
        self.count()
    }

    fn can_release_count(&self) -> usize {
        self.can_release_count()
    }

    fn allow_multi_spawn(&self) -> bool {
        self.allow_multi_spawn()
    }

    fn priority(&self) -> i32 {
        self.priority()
    }

    fn release(&mut self) {
        self.release();
    }

    fn release_all_unused(&mut self) {
        self.release_all_unused();
    }

    fn update(&mut self, elapsed: f32, real_elapsed: f32) {
        self.update(elapsed, real_elapsed);
    }

    fn shutdown(&mut self) {
        self.shutdown();
    }
}

#[derive(PartialEq, Eq, Hash)]
struct PoolKey {
    type_id: TypeId,
    name: String,
}

impl PoolKey {
    fn of<T: PoolObject>(name: &str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: name.to_owned(),
        }
    }
}

/// Per-type named object-pool registry.
///
/// Pools are keyed by their (object type, pool name) pair; one driver calls
/// [`ObjectPoolManager::update`] and [`ObjectPoolManager::shutdown`] to tick
/// and tear down every pool.
#[derive(Default)]
pub struct ObjectPoolManager {
    pools: HashMap<PoolKey, Box<dyn ObjectPoolBase>>,
}

impl ObjectPoolManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
        }
    }

    /// Returns the number of pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Returns whether a pool exists for `T` under `name`.
    #[must_use]
    pub fn has_pool<T: PoolObject>(&self, name: &str) -> bool {
        self.pools.contains_key(&PoolKey::of::<T>(name))
    }

    /// Creates a pool whose records may be spawned once at a time.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateObjectPool`] if the (type, name) pair exists.
    pub fn create_single_spawn_pool<T: PoolObject>(
        &mut self,
        name: &str,
        settings: ObjectPoolSettings,
    ) -> CoreResult<&mut ObjectPool<T>> {
        self.create_pool::<T>(name, false, settings)
    }

    /// Creates a pool whose records may be spawned several times at once.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateObjectPool`] if the (type, name) pair exists.
    pub fn create_multi_spawn_pool<T: PoolObject>(
        &mut self,
        name: &str,
        settings: ObjectPoolSettings,
    ) -> CoreResult<&mut ObjectPool<T>> {
        self.create_pool::<T>(name, true, settings)
    }

    /// Returns the pool for `T` under `name`.
    #[must_use]
    pub fn pool<T: PoolObject>(&self, name: &str) -> Option<&ObjectPool<T>> {
        self.pools
            .get(&PoolKey::of::<T>(name))
            .and_then(|pool| (&**pool as &dyn Any).downcast_ref())
    }

    /// Returns the pool for `T` under `name`, mutably.
    pub fn pool_mut<T: PoolObject>(&mut self, name: &str) -> Option<&mut ObjectPool<T>> {
        self.pools
            .get_mut(&PoolKey::of::<T>(name))
            .and_then(|pool| (&mut **pool as &mut dyn Any).downcast_mut())
    }

    /// Shuts the pool down and removes it.
    ///
    /// Returns `false` if no such pool exists.
    pub fn destroy_pool<T: PoolObject>(&mut self, name: &str) -> bool {
        match self.pools.remove(&PoolKey::of::<T>(name)) {
            Some(mut pool) => {
                pool.shutdown();
                true
            }
            None => false,
        }
    }

    /// Runs an eviction pass on every pool, lowest pool priority first.
    pub fn release_all(&mut self) {
        for pool in self.pools_by_priority() {
            pool.release();
        }
    }

    /// Releases every evictable record in every pool, lowest priority first.
    pub fn release_all_unused(&mut self) {
        for pool in self.pools_by_priority() {
            pool.release_all_unused();
        }
    }

    /// Ticks every pool.
    pub fn update(&mut self, elapsed: f32, real_elapsed: f32) {
        for pool in self.pools.values_mut() {
            pool.update(elapsed, real_elapsed);
        }
    }

    /// Shuts every pool down and drops the registry.
    pub fn shutdown(&mut self) {
        for pool in self.pools.values_mut() {
            pool.shutdown();
        }
        self.pools.clear();
    }

    fn create_pool<T: PoolObject>(
        &mut self,
        name: &str,
        allow_multi_spawn: bool,
        settings: ObjectPoolSettings,
    ) -> CoreResult<&mut ObjectPool<T>> {
        let key = PoolKey::of::<T>(name);
        if self.pools.contains_key(&key) {
            return Err(CoreError::DuplicateObjectPool {
                pool: format!("{} '{name}'", type_name::<T>()),
            });
        }

        let pool = Box::new(ObjectPool::<T>::new(name, allow_multi_spawn, settings));
        let slot = self.pools.entry(key).or_insert(pool);
        match (&mut **slot as &mut dyn Any).downcast_mut() {
            Some(pool) => Ok(pool),
            // Freshly inserted with exactly this type.
            None => unreachable!("pool table corrupted"),
        }
    }

    fn pools_by_priority(&mut self) -> Vec<&mut Box<dyn ObjectPoolBase>> {
        let mut pools: Vec<_> = self.pools.values_mut().collect();
        pools.sort_by_key(|pool| pool.priority());
        pools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unit {
        name: &'static str,
    }

    impl PoolObject for Unit {
        fn name(&self) -> &str {
            self.name
        }
    }

    struct Tile;

    impl PoolObject for Tile {}

    #[test]
    fn test_create_lookup_and_duplicate_rejection() {
        let mut manager = ObjectPoolManager::new();

        manager
            .create_single_spawn_pool::<Unit>("units", ObjectPoolSettings::default())
            .unwrap();
        assert!(manager.has_pool::<Unit>("units"));
        assert!(!manager.has_pool::<Unit>("other"));
        assert!(!manager.has_pool::<Tile>("units"));

        assert!(matches!(
            manager.create_single_spawn_pool::<Unit>("units", ObjectPoolSettings::default()),
            Err(CoreError::DuplicateObjectPool { .. })
        ));

        // Same name under another type is a distinct pool.
        manager
            .create_multi_spawn_pool::<Tile>("units", ObjectPoolSettings::default())
            .unwrap();
        assert_eq!(manager.pool_count(), 2);
    }

    #[test]
    fn test_typed_access_round_trip() {
        let mut manager = ObjectPoolManager::new();
        manager
            .create_single_spawn_pool::<Unit>("units", ObjectPoolSettings::default())
            .unwrap();

        let pool = manager.pool_mut::<Unit>("units").unwrap();
        let id = pool.register(Unit { name: "soldier" }, false);
        assert_eq!(pool.spawn_named("soldier"), Some(id));

        assert_eq!(manager.pool::<Unit>("units").unwrap().count(), 1);
        assert!(manager.pool::<Tile>("units").is_none());
    }

    #[test]
    fn test_destroy_pool() {
        let mut manager = ObjectPoolManager::new();
        manager
            .create_single_spawn_pool::<Unit>("units", ObjectPoolSettings::default())
            .unwrap();

        assert!(manager.destroy_pool::<Unit>("units"));
        assert!(!manager.destroy_pool::<Unit>("units"));
        assert_eq!(manager.pool_count(), 0);
    }

    #[test]
    fn test_update_drives_auto_release() {
        let mut manager = ObjectPoolManager::new();
        let settings = ObjectPoolSettings {
            auto_release_interval: 1.0,
            expire_time: 0.5,
            ..ObjectPoolSettings::default()
        };
        let pool = manager.create_single_spawn_pool::<Tile>("tiles", settings).unwrap();
        pool.register(Tile, false);

        manager.update(0.0, 2.0);
        assert_eq!(manager.pool::<Tile>("tiles").unwrap().count(), 0);
    }

    #[test]
    fn test_shutdown_clears_every_pool() {
        let mut manager = ObjectPoolManager::new();
        manager
            .create_single_spawn_pool::<Unit>("units", ObjectPoolSettings::default())
            .unwrap();
        manager
            .create_multi_spawn_pool::<Tile>("tiles", ObjectPoolSettings::default())
            .unwrap();

        manager.shutdown();
        assert_eq!(manager.pool_count(), 0);
    }
}
