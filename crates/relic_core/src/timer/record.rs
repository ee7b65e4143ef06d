//! Timer record, recycled through the reference pool.

use crate::reference::Recyclable;
use crate::timer::{TimerId, TimerScheduler};

/// Timer callback.
///
/// Receives the owning scheduler so it can re-enter it (add, remove, stop,
/// resume) during dispatch; structural changes requested while an update
/// pass is live are deferred to the end of the pass.
pub(crate) type TimerCallback = Box<dyn FnMut(&mut TimerScheduler) + Send>;

/// One scheduled timer.
///
/// Lives in exactly one of the two sorted lists (scaled / unscaled) at a
/// time; destroyed by returning it to the reference pool once its removal
/// mark is processed.
#[derive(Default)]
pub(crate) struct TimerRecord {
    pub(crate) id: TimerId,
    pub(crate) interval: f32,
    pub(crate) remaining: f32,
    /// Repeat budget; values at or below zero mean "infinite" and are
    /// decremented toward more-negative without ever reaching zero.
    pub(crate) repeat: i32,
    pub(crate) unscaled: bool,
    pub(crate) running: bool,
    pub(crate) marked_for_removal: bool,
    pub(crate) callback: Option<TimerCallback>,
}

impl Recyclable for TimerRecord {
    fn clear(&mut self) {
        self.id = TimerId(0);
        self.interval = 0.0;
        self.remaining = 0.0;
        self.repeat = 0;
        self.unscaled = false;
        self.running = false;
        self.marked_for_removal = false;
        self.callback = None;
    }
}
