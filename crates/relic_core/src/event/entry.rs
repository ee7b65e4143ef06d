//! Per-key subscriber record.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::event::{EventId, EventPool, HandlerTag};
use crate::reference::Recyclable;

/// Type-erased handler glue: downcasts the fired payload and invokes the
/// typed handler when the signature matches.
pub(crate) type InvokeFn = Arc<dyn Fn(&mut EventPool, &dyn Any) + Send + Sync>;

/// One subscription under one event key.
pub(crate) struct Subscriber {
    pub(crate) tag: HandlerTag,
    pub(crate) signature: TypeId,
    pub(crate) invoke: InvokeFn,
}

/// Subscriber table for a single event key.
///
/// While `depth > 0` a dispatch pass is walking `active`, so structural
/// changes are buffered into the pending lists and applied when the
/// outermost pass completes. The reentrancy depth is a counter, not a
/// boolean: nested re-entrant fires of the same key each finish their own
/// pass and the buffered mutations flush exactly once, at outer completion.
#[derive(Default)]
pub(crate) struct EventEntry {
    pub(crate) id: EventId,
    pub(crate) active: Vec<Subscriber>,
    pending_add: Vec<Subscriber>,
    pending_remove: Vec<HandlerTag>,
    pub(crate) depth: u32,
    dirty: bool,
}

impl EventEntry {
    /// Adds a subscription, deferring while a dispatch pass is live.
    ///
    /// Rejects a tag already subscribed (active or pending) under this key.
    pub(crate) fn subscribe(&mut self, subscriber: Subscriber) -> bool {
        let tag = subscriber.tag;
        if self.active.iter().any(|s| s.tag == tag)
            || self.pending_add.iter().any(|s| s.tag == tag)
        {
            tracing::error!(event = self.id, tag = tag.0, "repeated handler subscription");
            return false;
        }

        if self.depth > 0 {
            self.dirty = true;
            self.pending_add.push(subscriber);
        } else {
            self.active.push(subscriber);
        }

        true
    }

    /// Removes a subscription, deferring while a dispatch pass is live.
    pub(crate) fn unsubscribe(&mut self, tag: HandlerTag) {
        if self.depth > 0 {
            self.dirty = true;
            self.pending_remove.push(tag);
        } else if !remove_tag(&mut self.active, tag) {
            tracing::warn!(event = self.id, tag = tag.0, "unsubscribed handler not present");
        }
    }

    /// Applies buffered adds then removes; called when depth returns to 0.
    pub(crate) fn flush(&mut self) {
        if !self.dirty {
            return;
        }

        self.active.append(&mut self.pending_add);
        for tag in self.pending_remove.drain(..) {
            remove_tag(&mut self.active, tag);
        }
        self.dirty = false;
    }
}

impl Recyclable for EventEntry {
    fn clear(&mut self) {
        self.id = 0;
        self.active.clear();
        self.pending_add.clear();
        self.pending_remove.clear();
        self.depth = 0;
        self.dirty = false;
    }
}

fn remove_tag(subscribers: &mut Vec<Subscriber>, tag: HandlerTag) -> bool {
    let Some(index) = subscribers.iter().position(|s| s.tag == tag) else {
        return false;
    };
    subscribers.remove(index);
    true
}
