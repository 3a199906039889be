//! # anystore
//!
//! Unified, capability-aware access to heterogeneous storage backends.
//!
//! Callers talk to one [`Operator`]; backends implement one [`Accessor`]
//! trait and declare what they can do natively. Whatever a backend lacks is
//! either emulated from the primitives it does have or reported as
//! [`Error::Unsupported`]. Cross-cutting behaviour (retry, timeout,
//! logging, metrics, concurrency limits) is added as [`Layer`]s that wrap
//! the backend without changing its interface.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use anystore::{MemoryAccessor, OpList, Operator};
//!
//! # tokio_test::block_on(async {
//! let op = Operator::new(MemoryAccessor::default());
//!
//! op.write("reports/2024/q1.csv", b"a,b\n1,2\n".to_vec()).await?;
//! op.copy("reports/2024/q1.csv", "archive/q1.csv").await?;
//!
//! let all = op.list_with("/", OpList::new().with_recursive(true)).await?;
//! assert!(all.iter().any(|e| e.path() == "archive/q1.csv"));
//!
//! op.remove_all("reports/").await?;
//! assert!(!op.is_exist("reports/2024/q1.csv").await?);
//! # Ok::<(), anystore::Error>(())
//! # }).unwrap();
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Operator`] | Caller-facing async API: normalization, capability checks, emulation |
//! | [`BlockingOperator`] | Synchronous façade driving the same operator |
//! | [`OperatorBuilder`] | Backend + options + layers, assembled in order |
//! | [`Accessor`] | Trait every backend and every layer implements |
//! | [`AccessorInfo`] | Scheme, root, name and [`Capabilities`] of a chain |
//! | [`Metadata`] / [`Entry`] | What `stat` and `list` return |
//! | [`Error`] / [`ErrorKind`] | Contextual error and its flat classification |
//!
//! ---
//!
//! ## Paths
//!
//! Paths are `/`-separated and relative to the backend root. A trailing `/`
//! marks a directory. Every operation normalizes its input first, so
//! `"/a//b/./c"` and `"a/b/c"` name the same object. See
//! [`normalize_path`].
//!
//! ---
//!
//! ## Capabilities And Emulation
//!
//! | Requested | Native capability | Fallback |
//! |-----------|-------------------|----------|
//! | `create_dir` | [`Capability::CreateDir`] | empty marker write |
//! | `copy` | [`Capability::Copy`] | read + write |
//! | `rename` | [`Capability::Rename`] | copy + delete |
//! | recursive `list` | [`Capability::ListRecursive`] | breadth-first walk |
//! | `remove_all` | none | recursive list + delete each |
//! | ranged `read` | [`Capability::ReadWithRange`] | none, fails |
//!
//! Emulations made of several mutating steps are not atomic. A failure
//! part way through is reported as [`Error::Partial`] with the number of
//! steps that committed.
//!
//! ---
//!
//! ## Layers
//!
//! ```rust
//! use std::time::Duration;
//! use anystore::{
//!     LoggingLayer, MemoryAccessor, MetricsLayer, Operation, Operator, RetryLayer, TimeoutLayer,
//! };
//!
//! # tokio_test::block_on(async {
//! let metrics = MetricsLayer::new();
//! let handle = metrics.handle();
//!
//! // The layer applied last is outermost and sees each call first.
//! let op = Operator::new(MemoryAccessor::default())
//!     .layer(TimeoutLayer::new(Duration::from_secs(10)))
//!     .layer(RetryLayer::new().with_max_attempts(3))
//!     .layer(LoggingLayer::new())
//!     .layer(metrics);
//!
//! op.write("a", b"1".to_vec()).await.unwrap();
//! assert_eq!(handle.requests(Operation::Write), 1);
//! # });
//! ```
//!
//! ---
//!
//! ## Configuration
//!
//! [`Operator::via_map`] builds an operator from a flat string map, the
//! form bindings and config files produce:
//!
//! | Key | Applies to | Meaning |
//! |-----|------------|---------|
//! | `root` | all | Backend root (required and absolute for `fs`) |
//! | `timeout_ms` | all | Per-attempt deadline |
//! | `max_retries` | all | Retries after the first attempt |
//! | `retry_at_least_once` | all | Also retry non-idempotent writes and renames |
//! | `remove_all_mode` | all | `fail_fast` or `ignore_missing` |
//!
//! Unknown keys are rejected with [`Error::Invalid`].
//!
//! ---
//!
//! ## Thread Safety
//!
//! Accessors are `Send + Sync` and take `&self`. [`Operator`] is a cheap
//! handle around `Arc<dyn Accessor>`; clone it into tasks freely.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Metadata`], [`Entry`], [`EntryMode`] and the `AccessorJsonExt` helpers |

mod capability;
mod config;
mod error;
mod ext;
mod layer;
mod layers;
mod operator;
mod path;
mod services;
mod traits;
mod types;

// Public re-exports - error types
pub use error::{Error, ErrorKind, Result};

// Public re-exports - capability registry
pub use capability::{AccessorInfo, Capabilities, Capability, Operation, Scheme};

// Public re-exports - metadata model
pub use types::{BytesRange, Entry, EntryMode, Metadata, OpList, OpRead, OpWrite};

// Public re-exports - backend contract
pub use traits::{Accessor, DynAccessor, Lister, Pager};

// Public re-exports - layers
pub use layer::{Layer, LayerExt};
pub use layers::{
    ConcurrentLimitAccessor, ConcurrentLimitLayer, LoggingAccessor, LoggingLayer, MetricsAccessor,
    MetricsHandle, MetricsLayer, RetryAccessor, RetryLayer, TimeoutAccessor, TimeoutLayer,
};

// Public re-exports - services
pub use services::{FsAccessor, MemoryAccessor};

// Public re-exports - operator and configuration
pub use config::{ConfigMap, OperatorOptions, RemoveAllMode};
pub use operator::{BlockingOperator, Operator, OperatorBuilder};

// Public re-exports - path helpers
pub use path::{get_basename, get_parent, is_dir_path, normalize_path, normalize_root};

// Public re-exports - infrastructure
pub use ext::AccessorExt;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::AccessorJsonExt;
