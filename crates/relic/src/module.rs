//! # Module Contract
//!
//! The driving interface between the runtime and anything it ticks. The
//! surrounding application needs exactly two entry points per engine: the
//! per-frame update and the teardown.

use relic_core::{EventPool, ObjectPoolManager, TimerScheduler};

/// A runtime-driven module.
///
/// Higher-priority modules are polled first each frame and shut down last.
pub trait RuntimeModule {
    /// Poll/teardown ordering weight.
    fn priority(&self) -> i32 {
        0
    }

    /// Per-frame tick.
    ///
    /// # Arguments
    ///
    /// * `elapsed` - logical elapsed seconds (scaled game time)
    /// * `real_elapsed` - wall-clock elapsed seconds
    fn update(&mut self, elapsed: f32, real_elapsed: f32);

    /// Releases every owned record; called once at process end.
    fn shutdown(&mut self);
}

impl RuntimeModule for EventPool {
    fn update(&mut self, _elapsed: f32, _real_elapsed: f32) {
        // Dispatch is synchronous; nothing to poll.
    }

    fn shutdown(&mut self) {
        EventPool::shutdown(self);
    }
}

impl RuntimeModule for TimerScheduler {
    fn update(&mut self, elapsed: f32, real_elapsed: f32) {
        TimerScheduler::update(self, elapsed, real_elapsed);
    }

    fn shutdown(&mut self) {
        TimerScheduler::shutdown(self);
    }
}

impl RuntimeModule for ObjectPoolManager {
    fn priority(&self) -> i32 {
        6
    }

    fn update(&mut self, elapsed: f32, real_elapsed: f32) {
        ObjectPoolManager::update(self, elapsed, real_elapsed);
    }

    fn shutdown(&mut self) {
        ObjectPoolManager::shutdown(self);
    }
}
