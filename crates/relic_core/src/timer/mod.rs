//! # Timer Scheduler
//!
//! Time-driven scheduler of one-shot and repeating timers. Two record lists
//! exist - scaled (driven by logical elapsed time) and unscaled (driven by
//! real elapsed time) - each kept sorted ascending by remaining time.
//!
//! ## Catch-up firing
//!
//! When one update tick covers several multiples of a timer's interval (a
//! "bad frame"), every owed repetition is delivered before the tick ends:
//! after the main pass, firing passes re-run (without re-subtracting the
//! delta) until no record sits at or below zero. The re-run is a bounded
//! loop, not recursion; exceeding the pass bound (pathological delta or a
//! near-zero interval) is reported and abandoned for the tick.
//!
//! ## Reentrancy
//!
//! Callbacks receive the scheduler as an explicit `&mut` context and may
//! freely add, remove, stop, resume or reset timers. While an update pass
//! is live, structural changes (insertions, resets, remove-all) are buffered
//! and applied when the pass completes; flag flips (stop/resume/restart and
//! removal marks) apply in place. Removal itself is always deferred: a
//! removed timer is marked and spliced out at the next update pass.
//!
//! Not safe for concurrent invocation: one logical thread owns the scheduler.

mod record;

use std::sync::Arc;

use crate::reference::ReferencePool;
use record::{TimerCallback, TimerRecord};

/// Process-unique timer handle, monotonically increasing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Default bound on catch-up firing passes within one update tick.
pub const DEFAULT_MAX_CATCHUP_PASSES: u32 = 64;

/// Structural mutation requested while an update pass was live.
enum PendingOp {
    Insert(Box<TimerRecord>),
    Reset {
        id: TimerId,
        interval: f32,
        repeat: i32,
        unscaled: bool,
        callback: Option<TimerCallback>,
    },
    RemoveAll,
}

/// Sorted-list timer scheduler with reentrant catch-up firing.
///
/// Timer records are acquired from the [`ReferencePool`] and released back
/// to it when their removal is processed.
pub struct TimerScheduler {
    refs: Arc<ReferencePool>,
    next_id: u64,
    scaled: Vec<Box<TimerRecord>>,
    unscaled: Vec<Box<TimerRecord>>,
    pending: Vec<PendingOp>,
    in_update: bool,
    max_catchup_passes: u32,
}

impl TimerScheduler {
    /// Creates an empty scheduler drawing records from `refs`.
    #[must_use]
    pub fn new(refs: Arc<ReferencePool>) -> Self {
        Self {
            refs,
            next_id: 0,
            scaled: Vec::new(),
            unscaled: Vec::new(),
            pending: Vec::new(),
            in_update: false,
            max_catchup_passes: DEFAULT_MAX_CATCHUP_PASSES,
        }
    }

    /// Sets the bound on catch-up firing passes per update tick.
    pub fn set_max_catchup_passes(&mut self, passes: u32) {
        self.max_catchup_passes = passes.max(1);
    }

    /// Adds a timer and returns its id.
    ///
    /// `repeat` at or below zero means "repeat forever". The timer starts
    /// running with `remaining = interval`; a timer added from inside a
    /// callback joins its list after the current update pass completes.
    pub fn add_timer<F>(&mut self, interval: f32, repeat: i32, unscaled: bool, callback: F) -> TimerId
    where
        F: FnMut(&mut TimerScheduler) + Send + 'static,
    {
        self.next_id += 1;
        let id = TimerId(self.next_id);

        let mut record = self.refs.acquire::<TimerRecord>();
        record.id = id;
        record.interval = interval;
        record.remaining = interval;
        record.repeat = repeat;
        record.unscaled = unscaled;
        record.running = true;
        record.marked_for_removal = false;
        record.callback = Some(Box::new(callback));

        if self.in_update {
            self.pending.push(PendingOp::Insert(record));
        } else {
            self.insert_sorted(record);
        }

        id
    }

    /// Pauses the timer without removing it. Unknown ids are ignored.
    pub fn stop(&mut self, id: TimerId) {
        if let Some(record) = self.record_mut(id) {
            record.running = false;
        }
    }

    /// Resumes a paused timer. Unknown ids are ignored.
    pub fn resume(&mut self, id: TimerId) {
        if let Some(record) = self.record_mut(id) {
            record.running = true;
        }
    }

    /// Returns whether the timer exists and is running.
    #[must_use]
    pub fn is_running(&self, id: TimerId) -> bool {
        self.record(id).is_some_and(|record| record.running)
    }

    /// Returns the timer's remaining time, `0.0` for unknown ids.
    #[must_use]
    pub fn remaining(&self, id: TimerId) -> f32 {
        self.record(id).map_or(0.0, |record| record.remaining)
    }

    /// Rewinds the timer to a full interval and sets it running.
    pub fn restart(&mut self, id: TimerId) {
        if let Some(record) = self.record_mut(id) {
            record.remaining = record.interval;
            record.running = true;
        }
    }

    /// Updates interval, repeat budget and time category in place.
    ///
    /// Clears any pending removal mark. When the time category changes the
    /// record moves between the scaled and unscaled lists immediately to
    /// preserve sort order (deferred if requested from inside a callback).
    pub fn reset(&mut self, id: TimerId, interval: f32, repeat: i32, unscaled: bool) {
        self.queue_reset(id, interval, repeat, unscaled, None);
    }

    /// [`TimerScheduler::reset`] that also replaces the callback.
    pub fn reset_with_callback<F>(
        &mut self,
        id: TimerId,
        interval: f32,
        repeat: i32,
        unscaled: bool,
        callback: F,
    ) where
        F: FnMut(&mut TimerScheduler) + Send + 'static,
    {
        self.queue_reset(id, interval, repeat, unscaled, Some(Box::new(callback)));
    }

    /// Marks the timer for removal; processed at the next update pass.
    pub fn remove_timer(&mut self, id: TimerId) {
        if let Some(record) = self.record_mut(id) {
            record.marked_for_removal = true;
        }
    }

    /// Releases every timer in both lists back to the reference pool.
    pub fn remove_all_timers(&mut self) {
        if self.in_update {
            self.pending.push(PendingOp::RemoveAll);
            return;
        }

        for record in self.scaled.drain(..) {
            self.refs.release(record);
        }
        for record in self.unscaled.drain(..) {
            self.refs.release(record);
        }
    }

    /// Returns the number of records in both lists, removal-marked included.
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.scaled.len() + self.unscaled.len()
    }

    /// Advances both lists: scaled by `elapsed`, unscaled by `real_elapsed`.
    pub fn update(&mut self, elapsed: f32, real_elapsed: f32) {
        if self.in_update {
            tracing::warn!("timer update re-entered, ignoring");
            return;
        }

        self.in_update = true;
        self.update_list(false, elapsed);
        self.update_list(true, real_elapsed);
        self.in_update = false;

        self.apply_pending();
    }

    /// Releases every timer; the teardown entry point.
    pub fn shutdown(&mut self) {
        self.remove_all_timers();
    }

    fn update_list(&mut self, unscaled: bool, dt: f32) {
        let len = self.list(unscaled).len();
        let mut needs_catchup = false;
        let mut to_remove = Vec::new();

        for index in 0..len {
            let fire = {
                let record = &mut self.list_mut(unscaled)[index];
                if record.marked_for_removal {
                    to_remove.push(index);
                    continue;
                }
                if !record.running {
                    continue;
                }
                record.remaining -= dt;
                record.remaining <= 0.0
            };

            if fire {
                self.fire_at(unscaled, index);

                let record = &mut self.list_mut(unscaled)[index];
                record.repeat -= 1;
                if record.repeat != 0 {
                    record.remaining += record.interval;
                    if record.remaining <= 0.0 {
                        needs_catchup = true;
                    }
                } else {
                    to_remove.push(index);
                }
            }
        }

        // Reverse order keeps the earlier indices valid while splicing.
        for &index in to_remove.iter().rev() {
            let record = self.list_mut(unscaled).remove(index);
            self.refs.release(record);
        }

        let mut passes = 0;
        while needs_catchup {
            passes += 1;
            if passes > self.max_catchup_passes {
                tracing::error!(
                    max_passes = self.max_catchup_passes,
                    "timer catch-up overflow, abandoning remaining passes this tick"
                );
                break;
            }
            needs_catchup = self.catchup_pass(unscaled);
        }
    }

    /// One catch-up firing pass: fires everything owed without subtracting
    /// the delta again. Exhausted records are marked and spliced out at the
    /// next update pass.
    fn catchup_pass(&mut self, unscaled: bool) -> bool {
        let len = self.list(unscaled).len();
        let mut again = false;

        for index in 0..len {
            let fire = {
                let record = &self.list(unscaled)[index];
                !record.marked_for_removal && record.remaining <= 0.0
            };

            if fire {
                self.fire_at(unscaled, index);

                let record = &mut self.list_mut(unscaled)[index];
                record.repeat -= 1;
                if record.repeat != 0 {
                    record.remaining += record.interval;
                    if record.remaining <= 0.0 {
                        again = true;
                    }
                } else {
                    record.marked_for_removal = true;
                }
            }
        }

        again
    }

    /// Invokes the callback at `index`, handing the scheduler to it.
    ///
    /// The callback is taken out of its slot for the duration of the call;
    /// structural mutations are deferred while `in_update` holds, so the
    /// index stays valid across the call.
    fn fire_at(&mut self, unscaled: bool, index: usize) {
        let mut callback = self.list_mut(unscaled)[index].callback.take();
        if let Some(f) = callback.as_mut() {
            f(self);
        }
        self.list_mut(unscaled)[index].callback = callback;
    }

    fn queue_reset(
        &mut self,
        id: TimerId,
        interval: f32,
        repeat: i32,
        unscaled: bool,
        callback: Option<TimerCallback>,
    ) {
        if self.in_update {
            self.pending.push(PendingOp::Reset {
                id,
                interval,
                repeat,
                unscaled,
                callback,
            });
        } else {
            self.apply_reset(id, interval, repeat, unscaled, callback);
        }
    }

    fn apply_reset(
        &mut self,
        id: TimerId,
        interval: f32,
        repeat: i32,
        unscaled: bool,
        callback: Option<TimerCallback>,
    ) {
        let Some(position) = self.position(id) else {
            return;
        };
        let (was_unscaled, index) = position;

        {
            let record = &mut self.list_mut(was_unscaled)[index];
            record.interval = interval;
            record.remaining = interval;
            record.repeat = repeat;
            record.marked_for_removal = false;
            if let Some(callback) = callback {
                record.callback = Some(callback);
            }
        }

        if was_unscaled != unscaled {
            // Immediate removal and re-insertion keeps both lists sorted.
            let mut record = self.list_mut(was_unscaled).remove(index);
            record.unscaled = unscaled;
            self.insert_sorted(record);
        }
    }

    fn apply_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for op in pending {
            match op {
                PendingOp::Insert(record) => self.insert_sorted(record),
                PendingOp::Reset {
                    id,
                    interval,
                    repeat,
                    unscaled,
                    callback,
                } => self.apply_reset(id, interval, repeat, unscaled, callback),
                PendingOp::RemoveAll => self.remove_all_timers(),
            }
        }
    }

    /// Inserts before the first record with strictly greater remaining time;
    /// equal entries keep arrival order.
    fn insert_sorted(&mut self, record: Box<TimerRecord>) {
        let list = self.list_mut(record.unscaled);
        let position = list
            .iter()
            .position(|held| held.remaining > record.remaining);
        match position {
            Some(index) => list.insert(index, record),
            None => list.push(record),
        }
    }

    fn list(&self, unscaled: bool) -> &Vec<Box<TimerRecord>> {
        if unscaled {
            &self.unscaled
        } else {
            &self.scaled
        }
    }

    fn list_mut(&mut self, unscaled: bool) -> &mut Vec<Box<TimerRecord>> {
        if unscaled {
            &mut self.unscaled
        } else {
            &mut self.scaled
        }
    }

    fn record(&self, id: TimerId) -> Option<&TimerRecord> {
        self.scaled
            .iter()
            .chain(self.unscaled.iter())
            .find(|record| record.id == id)
            .map(AsRef::as_ref)
    }

    fn record_mut(&mut self, id: TimerId) -> Option<&mut TimerRecord> {
        self.scaled
            .iter_mut()
            .chain(self.unscaled.iter_mut())
            .find(|record| record.id == id)
            .map(AsMut::as_mut)
    }

    fn position(&self, id: TimerId) -> Option<(bool, usize)> {
        if let Some(index) = self.scaled.iter().position(|record| record.id == id) {
            return Some((false, index));
        }
        self.unscaled
            .iter()
            .position(|record| record.id == id)
            .map(|index| (true, index))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn scheduler() -> TimerScheduler {
        TimerScheduler::new(Arc::new(ReferencePool::new()))
    }

    fn counter() -> (Arc<AtomicU32>, impl FnMut(&mut TimerScheduler) + Send + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&count);
        (count, move |_ctx: &mut TimerScheduler| {
            sink.fetch_add(1, Ordering::Relaxed);
        })
    }

    #[test]
    fn test_single_shot_fires_once_and_is_released() {
        let refs = Arc::new(ReferencePool::new());
        let mut timers = TimerScheduler::new(Arc::clone(&refs));
        let (fired, callback) = counter();

        let id = timers.add_timer(1.0, 1, false, callback);
        timers.update(0.5, 0.5);
        assert_eq!(fired.load(Ordering::Relaxed), 0);
        assert!((timers.remaining(id) - 0.5).abs() < f32::EPSILON);

        timers.update(0.6, 0.6);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(timers.timer_count(), 0);

        let info = refs.info::<record::TimerRecord>();
        assert_eq!(info.in_use, 0);
        assert_eq!(info.unused, 1);
    }

    #[test]
    fn test_catchup_delivers_owed_repeats_in_one_tick() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        // interval 1.0, repeat 3, one update of 2.5 seconds:
        // remaining 1.0 -> -1.5, fire, repeat 2, re-arm to -0.5 (still owed),
        // catch-up pass fires again, repeat 1, re-arm to 0.5.
        let id = timers.add_timer(1.0, 3, false, callback);
        timers.update(2.5, 2.5);

        assert_eq!(fired.load(Ordering::Relaxed), 2);
        assert!((timers.remaining(id) - 0.5).abs() < 1e-6);
        assert_eq!(timers.timer_count(), 1);
    }

    #[test]
    fn test_repeat_budget_at_or_below_zero_is_infinite() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        timers.add_timer(1.0, 0, false, callback);
        for _ in 0..10 {
            timers.update(1.0, 1.0);
        }

        assert_eq!(fired.load(Ordering::Relaxed), 10);
        assert_eq!(timers.timer_count(), 1);
    }

    #[test]
    fn test_unscaled_timer_uses_real_elapsed() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        timers.add_timer(1.0, 1, true, callback);

        // Scaled time frozen, real time advancing.
        timers.update(0.0, 1.5);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stop_resume_and_restart() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        let id = timers.add_timer(1.0, 0, false, callback);
        timers.stop(id);
        assert!(!timers.is_running(id));

        timers.update(5.0, 5.0);
        assert_eq!(fired.load(Ordering::Relaxed), 0);

        timers.resume(id);
        assert!(timers.is_running(id));
        timers.update(1.0, 1.0);
        assert_eq!(fired.load(Ordering::Relaxed), 1);

        timers.restart(id);
        assert!((timers.remaining(id) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_remove_timer_is_deferred_to_next_update() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        let id = timers.add_timer(1.0, 0, false, callback);
        timers.remove_timer(id);
        assert_eq!(timers.timer_count(), 1);

        // Marked records neither fire nor survive the pass.
        timers.update(2.0, 2.0);
        assert_eq!(fired.load(Ordering::Relaxed), 0);
        assert_eq!(timers.timer_count(), 0);
    }

    #[test]
    fn test_reset_moves_record_between_lists() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        let id = timers.add_timer(1.0, 1, false, callback);
        timers.reset(id, 1.0, 1, true);

        timers.update(5.0, 0.0);
        assert_eq!(fired.load(Ordering::Relaxed), 0);

        timers.update(0.0, 1.0);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_callback_adds_timer_without_firing_it_this_tick() {
        let mut timers = scheduler();
        let outer = Arc::new(AtomicU32::new(0));
        let inner = Arc::new(AtomicU32::new(0));

        let outer_sink = Arc::clone(&outer);
        let inner_sink = Arc::clone(&inner);
        timers.add_timer(1.0, 1, false, move |ctx| {
            outer_sink.fetch_add(1, Ordering::Relaxed);
            let inner_sink = Arc::clone(&inner_sink);
            ctx.add_timer(0.5, 1, false, move |_ctx| {
                inner_sink.fetch_add(1, Ordering::Relaxed);
            });
        });

        // The nested timer joins its list after this pass.
        timers.update(10.0, 10.0);
        assert_eq!(outer.load(Ordering::Relaxed), 1);
        assert_eq!(inner.load(Ordering::Relaxed), 0);
        assert_eq!(timers.timer_count(), 1);

        timers.update(0.5, 0.5);
        assert_eq!(inner.load(Ordering::Relaxed), 1);
        assert_eq!(timers.timer_count(), 0);
    }

    #[test]
    fn test_callback_removes_itself() {
        let mut timers = scheduler();
        let (fired, _unused) = counter();

        let sink = Arc::clone(&fired);
        let id_cell = Arc::new(AtomicU32::new(0));
        let id_slot = Arc::clone(&id_cell);
        let id = timers.add_timer(1.0, 0, false, move |ctx| {
            sink.fetch_add(1, Ordering::Relaxed);
            ctx.remove_timer(TimerId(u64::from(id_slot.load(Ordering::Relaxed))));
        });
        id_cell.store(u32::try_from(id.0).unwrap(), Ordering::Relaxed);

        timers.update(1.0, 1.0);
        assert_eq!(fired.load(Ordering::Relaxed), 1);

        timers.update(1.0, 1.0);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(timers.timer_count(), 0);
    }

    #[test]
    fn test_catchup_pass_bound_reports_and_stops() {
        let mut timers = scheduler();
        let (fired, callback) = counter();

        // A zero interval owes unbounded repeats; the pass bound must cap
        // the tick instead of hanging it.
        timers.set_max_catchup_passes(8);
        timers.add_timer(0.0, 0, false, callback);
        timers.update(1.0, 1.0);

        assert_eq!(fired.load(Ordering::Relaxed), 9);
        assert_eq!(timers.timer_count(), 1);
    }

    #[test]
    fn test_shutdown_releases_every_record() {
        let refs = Arc::new(ReferencePool::new());
        let mut timers = TimerScheduler::new(Arc::clone(&refs));

        for _ in 0..3 {
            let (_count, callback) = counter();
            timers.add_timer(1.0, 0, false, callback);
        }
        let (_count, callback) = counter();
        timers.add_timer(1.0, 0, true, callback);

        timers.shutdown();
        assert_eq!(timers.timer_count(), 0);

        let info = refs.info::<record::TimerRecord>();
        assert_eq!(info.in_use, 0);
        assert_eq!(info.unused, 4);
    }
}
