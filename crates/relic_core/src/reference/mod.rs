//! # Reference Pool
//!
//! Process-wide typed free-list recycler. One free list exists per concrete
//! recyclable type, keyed by type identity and created lazily on first use;
//! collections are never removed automatically.
//!
//! The pool is an explicit registry object owned by the runtime and injected
//! into its consumers - there are no hidden global statics, which keeps
//! multi-instance and test-isolation semantics obvious.
//!
//! ## Thread Safety
//!
//! This is the **only** engine that tolerates concurrent callers: every
//! acquire/release/add/remove serializes on the per-type free list, so a
//! hosting application may recycle records off the main thread (e.g.
//! network-received packets). Every other engine is single-threaded.
//!
//! ## Type tags instead of reflection
//!
//! Acquiring by runtime type identity uses a registered constructor keyed by
//! a stable [`TypeTag`] rather than reflective instantiation. The generic
//! entry points self-register on first use; tag-addressed acquisition of a
//! type that never registered is a configuration error.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[derive(Default)]
//! struct Packet { payload: Vec<u8> }
//!
//! impl Recyclable for Packet {
//!     fn clear(&mut self) { self.payload.clear(); }
//! }
//!
//! let pool = ReferencePool::new();
//! let packet = pool.acquire::<Packet>(); // fresh or recycled, always cleared
//! pool.release(packet);
//! ```

mod collection;

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult};
use collection::ReferenceCollection;

/// A recyclable record.
///
/// Storage is returned to the pool instead of freed; [`Recyclable::clear`]
/// resets the record to a neutral state and is invoked exactly once between
/// a release and the next acquire of the same underlying storage.
pub trait Recyclable: Any + Send {
    /// Resets the record to a neutral state.
    fn clear(&mut self);

    /// Concrete type name, used in diagnostics.
    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Stable identity for a recyclable type.
///
/// Pairs the compiler's `TypeId` with the type name for diagnostics; used by
/// the tag-addressed entry points in place of reflective type lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Returns the tag for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the type name this tag was created from.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Counter snapshot for one per-type collection.
#[derive(Clone, Copy, Debug)]
pub struct ReferencePoolInfo {
    /// Type the collection recycles.
    pub type_name: &'static str,
    /// Records currently sitting in the free list.
    pub unused: usize,
    /// Records currently handed out (`acquired - released`).
    pub in_use: i64,
    /// Total acquire operations.
    pub acquired: u64,
    /// Total release operations.
    pub released: u64,
    /// Records constructed (fresh acquires plus pre-warming).
    pub constructed: u64,
    /// Records discarded by `remove`/`remove_all`.
    pub discarded: u64,
}

/// Typed free-list recycler.
pub struct ReferencePool {
    collections: Mutex<HashMap<TypeId, Arc<ReferenceCollection>>>,
    strict_check: AtomicBool,
}

impl ReferencePool {
    /// Creates an empty pool with strict checking disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            strict_check: AtomicBool::new(false),
        }
    }

    /// Enables or disables strict checking (double-release detection).
    ///
    /// When disabled the identity scan is skipped for performance.
    pub fn set_strict_check(&self, enabled: bool) {
        self.strict_check.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether strict checking is enabled.
    #[inline]
    #[must_use]
    pub fn strict_check(&self) -> bool {
        self.strict_check.load(Ordering::Relaxed)
    }

    /// Returns the number of per-type collections created so far.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections.lock().len()
    }

    /// Registers `T`'s constructor for the tag-addressed entry points.
    ///
    /// The generic entry points self-register, so this is only needed when
    /// the first touch of a type goes through [`ReferencePool::acquire_by_tag`].
    pub fn register<T: Recyclable + Default>(&self) {
        self.typed_collection::<T>();
    }

    /// Acquires a cleared instance of `T`, recycled or freshly constructed.
    #[must_use]
    pub fn acquire<T: Recyclable + Default>(&self) -> Box<T> {
        let collection = self.typed_collection::<T>();
        let record = collection.acquire_with(construct::<T>);

        let any: Box<dyn Any> = record;
        match any.downcast::<T>() {
            Ok(typed) => typed,
            Err(_) => {
                // Collections are keyed by TypeId, so a foreign record here
                // means the table was corrupted; recover with a fresh one.
                tracing::error!(
                    type_name = type_name::<T>(),
                    "foreign record in typed free list"
                );
                Box::new(T::default())
            }
        }
    }

    /// Acquires a record through the constructor registered for `tag`.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if no constructor was registered.
    pub fn acquire_by_tag(&self, tag: TypeTag) -> CoreResult<Box<dyn Recyclable>> {
        let collection = self.collection(tag);
        let Some(constructor) = collection.constructor() else {
            return Err(CoreError::UnregisteredType {
                type_name: tag.name(),
            });
        };

        Ok(collection.acquire_with(constructor))
    }

    /// Clears `record` and returns it to `T`'s free list.
    pub fn release<T: Recyclable>(&self, record: Box<T>) {
        let collection = self.collection(TypeTag::of::<T>());
        collection.release(record, self.strict_check());
    }

    /// Clears a type-erased record and returns it to its type's free list.
    pub fn release_dyn(&self, record: Box<dyn Recyclable>) {
        let any: &dyn Any = &*record;
        let tag = TypeTag {
            id: any.type_id(),
            name: record.type_name(),
        };
        let collection = self.collection(tag);
        collection.release(record, self.strict_check());
    }

    /// Pre-warms `T`'s free list with `count` fresh records.
    pub fn add<T: Recyclable + Default>(&self, count: usize) {
        self.typed_collection::<T>().add(construct::<T>, count);
    }

    /// Pre-warms the free list for `tag` with `count` fresh records.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnregisteredType`] if no constructor was registered.
    pub fn add_by_tag(&self, tag: TypeTag, count: usize) -> CoreResult<()> {
        let collection = self.collection(tag);
        let Some(constructor) = collection.constructor() else {
            return Err(CoreError::UnregisteredType {
                type_name: tag.name(),
            });
        };

        collection.add(constructor, count);
        Ok(())
    }

    /// Drops up to `count` records from `T`'s free list.
    pub fn remove<T: Recyclable>(&self, count: usize) {
        self.collection(TypeTag::of::<T>()).remove(count);
    }

    /// Drops every record from `T`'s free list.
    pub fn remove_all<T: Recyclable>(&self) {
        self.collection(TypeTag::of::<T>()).remove_all();
    }

    /// Drops every collection and every record.
    pub fn clear_all(&self) {
        let mut collections = self.collections.lock();
        for collection in collections.values() {
            collection.remove_all();
        }
        collections.clear();
    }

    /// Returns the number of unused records in `T`'s free list.
    #[must_use]
    pub fn unused_count<T: Recyclable>(&self) -> usize {
        self.collection(TypeTag::of::<T>()).unused_count()
    }

    /// Returns a counter snapshot for every collection.
    #[must_use]
    pub fn infos(&self) -> Vec<ReferencePoolInfo> {
        self.collections
            .lock()
            .values()
            .map(|collection| collection.info())
            .collect()
    }

    /// Returns a counter snapshot for `T`'s collection.
    #[must_use]
    pub fn info<T: Recyclable>(&self) -> ReferencePoolInfo {
        self.collection(TypeTag::of::<T>()).info()
    }

    /// Looks up or lazily creates the collection for `tag`.
    fn collection(&self, tag: TypeTag) -> Arc<ReferenceCollection> {
        let mut collections = self.collections.lock();
        Arc::clone(
            collections
                .entry(tag.id)
                .or_insert_with(|| Arc::new(ReferenceCollection::new(tag))),
        )
    }

    /// Collection for `T` with its constructor registered.
    fn typed_collection<T: Recyclable + Default>(&self) -> Arc<ReferenceCollection> {
        let collection = self.collection(TypeTag::of::<T>());
        collection.register_constructor(construct::<T>);
        collection
    }
}

impl Default for ReferencePool {
    fn default() -> Self {
        Self::new()
    }
}

/// Boxed default constructor, registered per concrete type.
fn construct<T: Recyclable + Default>() -> Box<dyn Recyclable> {
    Box::new(T::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    impl Recyclable for Counter {
        fn clear(&mut self) {
            self.value = 0;
        }
    }

    #[test]
    fn test_acquire_release_cycle() {
        let pool = ReferencePool::new();

        let mut records = Vec::new();
        for _ in 0..5 {
            records.push(pool.acquire::<Counter>());
        }
        for record in records {
            pool.release(record);
        }

        let info = pool.info::<Counter>();
        assert_eq!(info.unused, 5);
        assert_eq!(info.in_use, 0);
        assert_eq!(info.acquired, 5);
        assert_eq!(info.released, 5);
        assert_eq!(info.constructed, 5);
    }

    #[test]
    fn test_recycled_record_is_cleared() {
        let pool = ReferencePool::new();

        let mut record = pool.acquire::<Counter>();
        record.value = 42;
        pool.release(record);

        // Same storage comes back, reset to neutral.
        let recycled = pool.acquire::<Counter>();
        assert_eq!(recycled.value, 0);
        assert_eq!(pool.info::<Counter>().constructed, 1);
    }

    #[test]
    fn test_add_remove_free_list() {
        let pool = ReferencePool::new();

        pool.add::<Counter>(8);
        assert_eq!(pool.unused_count::<Counter>(), 8);

        pool.remove::<Counter>(3);
        assert_eq!(pool.unused_count::<Counter>(), 5);

        // Removing more than present clamps.
        pool.remove::<Counter>(100);
        assert_eq!(pool.unused_count::<Counter>(), 0);

        pool.add::<Counter>(2);
        pool.remove_all::<Counter>();
        assert_eq!(pool.unused_count::<Counter>(), 0);
        assert_eq!(pool.info::<Counter>().discarded, 10);
    }

    #[test]
    fn test_tag_path_requires_registration() {
        let pool = ReferencePool::new();
        let tag = TypeTag::of::<Counter>();

        assert!(matches!(
            pool.acquire_by_tag(tag),
            Err(CoreError::UnregisteredType { .. })
        ));

        pool.register::<Counter>();
        let record = pool.acquire_by_tag(tag).unwrap();
        pool.release_dyn(record);

        let info = pool.info::<Counter>();
        assert_eq!(info.unused, 1);
        assert_eq!(info.in_use, 0);
    }

    #[test]
    fn test_generic_and_tag_paths_share_collection() {
        let pool = ReferencePool::new();

        let record = pool.acquire::<Counter>();
        pool.release(record);

        // Tag-addressed acquire drains the same free list.
        let record = pool.acquire_by_tag(TypeTag::of::<Counter>()).unwrap();
        pool.release_dyn(record);

        assert_eq!(pool.collection_count(), 1);
        let info = pool.info::<Counter>();
        assert_eq!(info.constructed, 1);
        assert_eq!(info.acquired, 2);
    }

    #[test]
    fn test_counters_stay_consistent() {
        let pool = ReferencePool::new();

        let a = pool.acquire::<Counter>();
        let b = pool.acquire::<Counter>();
        let c = pool.acquire::<Counter>();
        pool.release(b);

        let info = pool.info::<Counter>();
        assert_eq!(info.acquired as i64 - info.released as i64, info.in_use);
        assert_eq!(info.in_use, 2);

        pool.release(a);
        pool.release(c);
        assert_eq!(pool.info::<Counter>().in_use, 0);
    }

    #[test]
    fn test_clear_all_drops_collections() {
        let pool = ReferencePool::new();

        pool.add::<Counter>(4);
        assert_eq!(pool.collection_count(), 1);

        pool.clear_all();
        assert_eq!(pool.collection_count(), 0);
        assert!(pool.infos().is_empty());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(ReferencePool::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let record = pool.acquire::<Counter>();
                        pool.release(record);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let info = pool.info::<Counter>();
        assert_eq!(info.in_use, 0);
        assert_eq!(info.acquired, 400);
        assert_eq!(info.released, 400);
    }
}
