//! Per-type free list with usage counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use super::{Recyclable, ReferencePoolInfo, TypeTag};

/// Constructor registered for a recyclable type.
pub(crate) type Constructor = fn() -> Box<dyn Recyclable>;

/// One free list plus counters for a single concrete recyclable type.
///
/// Counters are atomics so snapshots never take the free-list lock; the
/// invariant `acquired - released == in_use` holds per collection.
pub(crate) struct ReferenceCollection {
    tag: TypeTag,
    constructor: OnceLock<Constructor>,
    free: Mutex<VecDeque<Box<dyn Recyclable>>>,
    in_use: AtomicI64,
    acquired: AtomicU64,
    released: AtomicU64,
    constructed: AtomicU64,
    discarded: AtomicU64,
}

impl ReferenceCollection {
    pub(crate) fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            constructor: OnceLock::new(),
            free: Mutex::new(VecDeque::new()),
            in_use: AtomicI64::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            constructed: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub(crate) fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Registers the constructor for this type; first registration wins.
    pub(crate) fn register_constructor(&self, constructor: Constructor) {
        let _ = self.constructor.set(constructor);
    }

    pub(crate) fn constructor(&self) -> Option<Constructor> {
        self.constructor.get().copied()
    }

    /// Pops a recycled record or constructs a fresh one.
    pub(crate) fn acquire_with(&self, constructor: Constructor) -> Box<dyn Recyclable> {
        self.in_use.fetch_add(1, Ordering::Relaxed);
        self.acquired.fetch_add(1, Ordering::Relaxed);

        if let Some(record) = self.free.lock().pop_front() {
            return record;
        }

        self.constructed.fetch_add(1, Ordering::Relaxed);
        constructor()
    }

    /// Clears the record and returns it to the free list.
    ///
    /// Under strict checking a record whose address is already present in
    /// the free list is reported and dropped instead of enqueued twice.
    pub(crate) fn release(&self, mut record: Box<dyn Recyclable>, strict: bool) {
        record.clear();

        {
            let mut free = self.free.lock();
            if strict {
                let incoming = data_ptr(&*record);
                if free.iter().any(|held| data_ptr(&**held) == incoming) {
                    tracing::warn!(
                        type_name = self.tag.name(),
                        "record released twice, discarding the duplicate"
                    );
                    return;
                }
            }

            free.push_back(record);
        }

        self.released.fetch_add(1, Ordering::Relaxed);
        self.in_use.fetch_sub(1, Ordering::Relaxed);
    }

    /// Pre-warms the free list with `count` fresh records.
    pub(crate) fn add(&self, constructor: Constructor, count: usize) {
        let mut free = self.free.lock();
        self.constructed.fetch_add(count as u64, Ordering::Relaxed);
        for _ in 0..count {
            free.push_back(constructor());
        }
    }

    /// Drops up to `count` records from the free list.
    pub(crate) fn remove(&self, count: usize) {
        let mut free = self.free.lock();
        let count = count.min(free.len());
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
        for _ in 0..count {
            free.pop_front();
        }
    }

    /// Drops every record from the free list.
    pub(crate) fn remove_all(&self) {
        let mut free = self.free.lock();
        self.discarded.fetch_add(free.len() as u64, Ordering::Relaxed);
        free.clear();
    }

    pub(crate) fn unused_count(&self) -> usize {
        self.free.lock().len()
    }

    pub(crate) fn info(&self) -> ReferencePoolInfo {
        ReferencePoolInfo {
            type_name: self.tag.name(),
            unused: self.unused_count(),
            in_use: self.in_use.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            constructed: self.constructed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Address of the record payload, used for identity comparison.
fn data_ptr(record: &dyn Recyclable) -> *const () {
    (record as *const dyn Recyclable).cast()
}
