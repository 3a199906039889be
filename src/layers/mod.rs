//! # Built-in Layers
//!
//! | Layer | Concern |
//! |-------|---------|
//! | [`RetryLayer`] | retry transient failures with exponential backoff |
//! | [`TimeoutLayer`] | per-call deadline |
//! | [`LoggingLayer`] | `tracing` spans and events |
//! | [`MetricsLayer`] | request, error and byte counters |
//! | [`ConcurrentLimitLayer`] | cap on in-flight calls |
//!
//! Every layer forwards [`Accessor::info`](crate::Accessor::info) unchanged.

mod concurrent_limit;
mod logging;
mod metrics;
mod retry;
mod timeout;

pub use concurrent_limit::{ConcurrentLimitAccessor, ConcurrentLimitLayer};
pub use logging::{LoggingAccessor, LoggingLayer};
pub use metrics::{MetricsAccessor, MetricsHandle, MetricsLayer};
pub use retry::{RetryAccessor, RetryLayer};
pub use timeout::{TimeoutAccessor, TimeoutLayer};
