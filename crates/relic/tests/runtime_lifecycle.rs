//! End-to-end drive of the runtime: configure, tick, re-enter, tear down.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use relic::{
    HandlerTag, ObjectPoolSettings, PoolObject, Recyclable, Runtime, RuntimeConfig,
};

#[derive(Default)]
struct Bullet {
    velocity: f32,
}

impl Recyclable for Bullet {
    fn clear(&mut self) {
        self.velocity = 0.0;
    }
}

struct Prefab {
    name: &'static str,
}

impl PoolObject for Prefab {
    fn name(&self) -> &str {
        self.name
    }
}

#[test]
fn full_frame_loop_and_teardown() {
    let config = RuntimeConfig::from_toml_str(
        r#"
        strict_check = true

        [timer]
        max_catchup_passes = 16
        "#,
    )
    .unwrap();
    let mut runtime = Runtime::with_config(&config);

    // Reference pool traffic, including a pre-warm.
    runtime.references().add::<Bullet>(4);
    let bullet = runtime.references().acquire::<Bullet>();
    runtime.references().release(bullet);
    assert_eq!(runtime.references().unused_count::<Bullet>(), 4);

    // Event traffic with a handler that unsubscribes itself mid-dispatch.
    let events_seen = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&events_seen);
    runtime
        .events_mut()
        .subscribe(10, HandlerTag(1), move |pool, (damage,): &(u32,)| {
            sink.fetch_add(*damage, Ordering::Relaxed);
            pool.unsubscribe(10, HandlerTag(1));
        });
    runtime.events_mut().fire(10, (3u32,));
    runtime.events_mut().fire(10, (3u32,));
    assert_eq!(events_seen.load(Ordering::Relaxed), 3);

    // A repeating timer owed two firings by one large tick.
    let timer_fires = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&timer_fires);
    let timer = runtime.timers_mut().add_timer(1.0, 3, false, move |_ctx| {
        sink.fetch_add(1, Ordering::Relaxed);
    });

    // A named object pool under the manager.
    let settings = ObjectPoolSettings {
        capacity: 8,
        ..runtime.pool_settings()
    };
    runtime
        .object_pools_mut()
        .create_single_spawn_pool::<Prefab>("prefabs", settings)
        .unwrap();
    let pool = runtime.object_pools_mut().pool_mut::<Prefab>("prefabs").unwrap();
    let prefab = pool.register(Prefab { name: "crate" }, false);
    assert_eq!(pool.spawn_named("crate"), Some(prefab));
    pool.unspawn(prefab).unwrap();

    // One bad frame: 2.5 elapsed seconds deliver two of the three repeats.
    runtime.update(2.5, 2.5);
    assert_eq!(timer_fires.load(Ordering::Relaxed), 2);
    assert!((runtime.timers().remaining(timer) - 0.5).abs() < 1e-6);

    runtime.update(0.5, 0.5);
    assert_eq!(timer_fires.load(Ordering::Relaxed), 3);
    assert_eq!(runtime.timers().timer_count(), 0);

    // Teardown: every engine empty, every record back through the pool.
    runtime.shutdown();
    assert_eq!(runtime.events().event_count(), 0);
    assert_eq!(runtime.timers().timer_count(), 0);
    assert_eq!(runtime.object_pools().pool_count(), 0);
    assert_eq!(runtime.references().collection_count(), 0);
}

#[test]
fn runtime_from_default_config() {
    let mut runtime = Runtime::new();
    assert!(!runtime.references().strict_check());

    runtime.update(0.016, 0.016);
    runtime.shutdown();
}
