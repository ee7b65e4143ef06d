//! Steady-state throughput of the hot engine paths.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use relic_core::{EventPool, HandlerTag, Recyclable, ReferencePool, TimerScheduler};

#[derive(Default)]
struct Projectile {
    payload: Vec<u8>,
}

impl Recyclable for Projectile {
    fn clear(&mut self) {
        self.payload.clear();
    }
}

fn bench_reference_pool(c: &mut Criterion) {
    let pool = ReferencePool::new();
    pool.add::<Projectile>(1);

    c.bench_function("reference_acquire_release", |b| {
        b.iter(|| {
            let record = pool.acquire::<Projectile>();
            pool.release(black_box(record));
        });
    });
}

fn bench_event_fire(c: &mut Criterion) {
    let mut pool = EventPool::new(Arc::new(ReferencePool::new()));
    for tag in 0..8 {
        pool.subscribe(1, HandlerTag(tag), |_pool, (value,): &(u32,)| {
            black_box(*value);
        });
    }

    c.bench_function("event_fire_8_subscribers", |b| {
        b.iter(|| pool.fire(1, (black_box(42u32),)));
    });
}

fn bench_timer_update(c: &mut Criterion) {
    let mut timers = TimerScheduler::new(Arc::new(ReferencePool::new()));
    for i in 0..64 {
        timers.add_timer(1000.0 + i as f32, 0, false, |_ctx| {});
    }

    c.bench_function("timer_update_64_idle", |b| {
        b.iter(|| timers.update(black_box(0.001), 0.001));
    });
}

criterion_group!(
    benches,
    bench_reference_pool,
    bench_event_fire,
    bench_timer_update
);
criterion_main!(benches);
