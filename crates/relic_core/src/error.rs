//! # Core Error Types
//!
//! Misuse errors the lifecycle engines report to their caller.
//!
//! Only programmer errors surface here (fatal to the call site, never to
//! the process). Consistency warnings go through `tracing` and the
//! operation completes; valid no-op outcomes (firing an unknown event key,
//! spawning from an exhausted pool) are plain `false`/`None` results.

use thiserror::Error;

/// Errors that can occur in the lifecycle engines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A type-tag-addressed operation hit a type that never registered a
    /// constructor with the reference pool.
    #[error("type '{type_name}' is not registered with the reference pool")]
    UnregisteredType {
        /// Name of the offending type.
        type_name: &'static str,
    },

    /// An object pool with the same (type, name) pair already exists.
    #[error("object pool '{pool}' already exists")]
    DuplicateObjectPool {
        /// Display key of the pool.
        pool: String,
    },

    /// The target object is not registered in this object pool.
    #[error("object {id} not found in object pool '{pool}'")]
    ObjectNotFound {
        /// Display key of the pool.
        pool: String,
        /// The handle that failed to resolve.
        id: u64,
    },

    /// A configuration value was out of range (negative capacity or
    /// expire time).
    #[error("invalid parameter: {what}")]
    InvalidParameter {
        /// Which parameter was rejected.
        what: &'static str,
    },
}

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;
