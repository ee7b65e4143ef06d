//! # Event Pool
//!
//! Named-event dispatch to a dynamic set of subscribers that may themselves
//! subscribe and unsubscribe *during* dispatch.
//!
//! ## Deferred mutation
//!
//! ```text
//!  fire(key)                     subscribe/unsubscribe(key)
//!     │                                    │
//!     ▼                                    ▼
//!  ┌────────── EventEntry ──────────────────────────┐
//!  │ active ──────── walked by index, length        │
//!  │                 snapshotted at pass start      │
//!  │ pending_add ─── buffered while depth > 0       │
//!  │ pending_remove  buffered while depth > 0       │
//!  └────────────────────────────────────────────────┘
//!                     │ depth returns to 0
//!                     ▼
//!            adds applied, then removes
//! ```
//!
//! Handlers registered or removed mid-dispatch never observe partial effects
//! within the same pass and always take effect before the next `fire`.
//!
//! ## Handler model
//!
//! A payload is a tuple of zero to six `'static` values; a handler is a
//! closure over `(&mut EventPool, &Payload)`. The pool hands itself to the
//! handler, so re-entrant subscribe/unsubscribe/fire calls are ordinary
//! method calls - the deferred-mutation buffering above makes them safe.
//! Handlers of a different payload shape under the same key are skipped,
//! not errors; multiple callback shapes may coexist per key.
//!
//! Subscriptions are identified by a caller-supplied [`HandlerTag`], unique
//! within one key. Duplicate subscription is a reported programmer error,
//! not a silent merge.
//!
//! Not safe for concurrent invocation: one logical thread owns the pool.

mod entry;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::reference::ReferencePool;
use entry::{EventEntry, InvokeFn, Subscriber};

/// Event key.
pub type EventId = u32;

/// Caller-supplied identity of one subscription under one event key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerTag(pub u64);

/// Marker for event payload tuples (zero to six `'static` elements).
pub trait EventArgs: Any + sealed::Sealed {}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_event_args {
    ($($arg:ident),*) => {
        impl<$($arg: 'static),*> sealed::Sealed for ($($arg,)*) {}
        impl<$($arg: 'static),*> EventArgs for ($($arg,)*) {}
    };
}

impl_event_args!();
impl_event_args!(A1);
impl_event_args!(A1, A2);
impl_event_args!(A1, A2, A3);
impl_event_args!(A1, A2, A3, A4);
impl_event_args!(A1, A2, A3, A4, A5);
impl_event_args!(A1, A2, A3, A4, A5, A6);

/// Per-key subscriber tables with safe mutation during dispatch.
///
/// Per-key records are acquired from the [`ReferencePool`] and returned to
/// it on [`EventPool::shutdown`].
pub struct EventPool {
    entries: HashMap<EventId, Box<EventEntry>>,
    refs: Arc<ReferencePool>,
}

impl EventPool {
    /// Creates an empty pool drawing per-key records from `refs`.
    #[must_use]
    pub fn new(refs: Arc<ReferencePool>) -> Self {
        Self {
            entries: HashMap::new(),
            refs,
        }
    }

    /// Subscribes `handler` under `event` with the given tag.
    ///
    /// Returns `false` (and reports the error) if the tag is already
    /// subscribed under this key. While this key is dispatching, the
    /// subscription is buffered and applied after the pass completes.
    pub fn subscribe<A, F>(&mut self, event: EventId, tag: HandlerTag, handler: F) -> bool
    where
        A: EventArgs,
        F: Fn(&mut EventPool, &A) + Send + Sync + 'static,
    {
        let invoke: InvokeFn = Arc::new(move |pool: &mut EventPool, args: &dyn Any| {
            if let Some(args) = args.downcast_ref::<A>() {
                handler(pool, args);
            }
        });

        self.entry_or_create(event).subscribe(Subscriber {
            tag,
            signature: TypeId::of::<A>(),
            invoke,
        })
    }

    /// Unsubscribes the tag from `event`.
    ///
    /// While this key is dispatching, the removal is buffered and applied
    /// after the pass completes. Removing an absent handler is reported as
    /// a warning and otherwise ignored.
    pub fn unsubscribe(&mut self, event: EventId, tag: HandlerTag) {
        match self.entries.get_mut(&event) {
            Some(entry) => entry.unsubscribe(tag),
            None => {
                tracing::warn!(event, tag = tag.0, "unsubscribed handler not present");
            }
        }
    }

    /// Fires `event` synchronously with the given payload.
    ///
    /// Walks the active list by index over the length snapshotted at pass
    /// start and invokes every handler whose payload type is exactly `A`;
    /// handlers of other shapes under the same key are skipped. Firing an
    /// unregistered key is a no-op. Handlers may re-enter this pool freely;
    /// their mutations become visible after the outermost pass completes.
    pub fn fire<A: EventArgs>(&mut self, event: EventId, args: A) {
        let snapshot_len = match self.entries.get_mut(&event) {
            Some(entry) => {
                entry.depth += 1;
                entry.active.len()
            }
            None => return,
        };

        let signature = TypeId::of::<A>();
        for index in 0..snapshot_len {
            // Re-borrow per index so the handler can re-enter the pool.
            let invoke = self.entries.get(&event).and_then(|entry| {
                entry
                    .active
                    .get(index)
                    .filter(|s| s.signature == signature)
                    .map(|s| Arc::clone(&s.invoke))
            });

            if let Some(invoke) = invoke {
                invoke(self, &args);
            }
        }

        if let Some(entry) = self.entries.get_mut(&event) {
            entry.depth = entry.depth.saturating_sub(1);
            if entry.depth == 0 {
                entry.flush();
            }
        }
    }

    /// Returns the number of active subscribers under `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: EventId) -> usize {
        self.entries
            .get(&event)
            .map_or(0, |entry| entry.active.len())
    }

    /// Returns the number of event keys with a subscriber table.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.entries.len()
    }

    /// Releases every per-key record back to the reference pool.
    pub fn shutdown(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.refs.release(entry);
        }
    }

    fn entry_or_create(&mut self, event: EventId) -> &mut EventEntry {
        self.entries.entry(event).or_insert_with(|| {
            let mut entry = self.refs.acquire::<EventEntry>();
            entry.id = event;
            entry
        })
    }
}
