//! # RELIC Runtime
//!
//! The driving layer over the lifecycle engines in [`relic_core`]:
//!
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────┐
//! │ runtime.update(elapsed, real_elapsed)                    │
//! │   ├─ object pools  (priority 6: auto-release bookkeeping)│
//! │   ├─ event pool    (priority 0: nothing to poll)         │
//! │   └─ timers        (priority 0: due callbacks fire)      │
//! └──────────────────────────────────────────────────────────┘
//! Process end:
//! ┌──────────────────────────────────────────────────────────┐
//! │ runtime.shutdown()   reverse priority order, then the    │
//! │                      reference pool is cleared           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! One logical thread drives the runtime; only the shared reference pool
//! tolerates other threads.

pub mod config;
pub mod module;
pub mod runtime;

pub use config::{ConfigError, RuntimeConfig};
pub use module::RuntimeModule;
pub use runtime::Runtime;

pub use relic_core::{
    CoreError, CoreResult, EventId, EventPool, HandlerTag, ObjectId, ObjectPool,
    ObjectPoolManager, ObjectPoolSettings, PoolObject, Recyclable, ReferencePool, TimerId,
    TimerScheduler,
};
