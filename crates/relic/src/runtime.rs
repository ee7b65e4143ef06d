//! # Runtime
//!
//! Owns the shared reference pool and the three driven engines; fans the
//! frame tick out in descending module priority and tears down in reverse.

use std::cmp::Reverse;
use std::sync::Arc;

use relic_core::{
    EventPool, ObjectPoolManager, ObjectPoolSettings, ReferencePool, TimerScheduler,
};

use crate::config::RuntimeConfig;
use crate::module::RuntimeModule;

/// The runtime: one instance per application (or per test).
///
/// Engines are reached through accessors; the external driver only needs
/// [`Runtime::update`] once per frame and [`Runtime::shutdown`] once at
/// process end. Shutdown releases every engine-owned record back through
/// the reference pool before clearing the pool itself, so no leak is
/// observable in the pool counters.
pub struct Runtime {
    refs: Arc<ReferencePool>,
    events: EventPool,
    timers: TimerScheduler,
    object_pools: ObjectPoolManager,
    pool_settings: ObjectPoolSettings,
}

impl Runtime {
    /// Creates a runtime with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::default())
    }

    /// Creates a runtime from a parsed configuration.
    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let refs = Arc::new(ReferencePool::new());
        refs.set_strict_check(config.strict_check);

        let events = EventPool::new(Arc::clone(&refs));
        let mut timers = TimerScheduler::new(Arc::clone(&refs));
        timers.set_max_catchup_passes(config.timer.max_catchup_passes);

        Self {
            refs,
            events,
            timers,
            object_pools: ObjectPoolManager::new(),
            pool_settings: config.pool_settings(),
        }
    }

    /// Returns the shared reference pool.
    #[must_use]
    pub fn references(&self) -> &ReferencePool {
        &self.refs
    }

    /// Returns a clonable handle to the reference pool (the one surface
    /// that may be shared with other threads).
    #[must_use]
    pub fn references_handle(&self) -> Arc<ReferencePool> {
        Arc::clone(&self.refs)
    }

    /// Returns the event pool.
    #[must_use]
    pub fn events(&self) -> &EventPool {
        &self.events
    }

    /// Returns the event pool mutably.
    pub fn events_mut(&mut self) -> &mut EventPool {
        &mut self.events
    }

    /// Returns the timer scheduler.
    #[must_use]
    pub fn timers(&self) -> &TimerScheduler {
        &self.timers
    }

    /// Returns the timer scheduler mutably.
    pub fn timers_mut(&mut self) -> &mut TimerScheduler {
        &mut self.timers
    }

    /// Returns the object-pool manager.
    #[must_use]
    pub fn object_pools(&self) -> &ObjectPoolManager {
        &self.object_pools
    }

    /// Returns the object-pool manager mutably.
    pub fn object_pools_mut(&mut self) -> &mut ObjectPoolManager {
        &mut self.object_pools
    }

    /// Returns the configured object-pool defaults.
    #[must_use]
    pub fn pool_settings(&self) -> ObjectPoolSettings {
        self.pool_settings
    }

    /// Ticks every engine, highest module priority first.
    pub fn update(&mut self, elapsed: f32, real_elapsed: f32) {
        let mut modules = self.modules_mut();
        modules.sort_by_key(|module| Reverse(module.priority()));
        for module in modules {
            module.update(elapsed, real_elapsed);
        }
    }

    /// Shuts every engine down in reverse priority order, then clears the
    /// reference pool.
    pub fn shutdown(&mut self) {
        let mut modules = self.modules_mut();
        modules.sort_by_key(|module| module.priority());
        for module in modules {
            module.shutdown();
        }

        self.refs.clear_all();
    }

    fn modules_mut(&mut self) -> [&mut dyn RuntimeModule; 3] {
        [
            &mut self.object_pools,
            &mut self.events,
            &mut self.timers,
        ]
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use relic_core::HandlerTag;

    use super::*;

    #[test]
    fn test_update_drives_timers() {
        let mut runtime = Runtime::new();
        let fired = Arc::new(AtomicU32::new(0));

        let sink = Arc::clone(&fired);
        runtime.timers_mut().add_timer(1.0, 1, false, move |_ctx| {
            sink.fetch_add(1, Ordering::Relaxed);
        });

        runtime.update(1.0, 1.0);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_config_reaches_the_engines() {
        let config = RuntimeConfig::from_toml_str("strict_check = true").unwrap();
        let runtime = Runtime::with_config(&config);
        assert!(runtime.references().strict_check());
    }

    #[test]
    fn test_shutdown_leaves_no_pool_residue() {
        let mut runtime = Runtime::new();

        runtime
            .events_mut()
            .subscribe(1, HandlerTag(1), |_pool, _args: &()| {});
        runtime.timers_mut().add_timer(10.0, 1, false, |_ctx| {});

        runtime.shutdown();
        assert_eq!(runtime.events().event_count(), 0);
        assert_eq!(runtime.timers().timer_count(), 0);
        assert_eq!(runtime.references().collection_count(), 0);
    }
}
