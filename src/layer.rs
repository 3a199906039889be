//! # Layer Trait
//!
//! Tower-style middleware composition for accessors.
//!
//! ## Overview
//!
//! A [`Layer`] wraps an inner [`Accessor`] and returns a new accessor that
//! intercepts calls before and after delegating inward. Because the result
//! is again an `Accessor`, layers stack in any order.
//!
//! ```text
//! Accessor ──▶ Layer::layer() ──▶ Wrapped Accessor
//! ```
//!
//! ## Ordering
//!
//! The layer applied last is the outermost one and sees each call first:
//!
//! ```text
//! MemoryAccessor::default()
//!     .layer(TimeoutLayer::new(d))   // inner: times each attempt
//!     .layer(RetryLayer::new())      // outer: retries timed attempts
//! ```
//!
//! Swapping the two makes the timeout bound the whole retry budget instead.
//! Both are valid; the order is a configuration choice.
//!
//! ## Capabilities
//!
//! Layers in this crate forward [`Accessor::info`] unchanged. Only a layer
//! that actually emulates an operation may widen the capability set.

use crate::Accessor;

/// A layer that wraps an accessor to add behaviour.
///
/// Inspired by Tower's `Layer` trait. Each middleware provides a wrapper
/// accessor and a `Layer` implementation that builds it.
///
/// # Example
///
/// ```rust
/// use anystore::{Accessor, Layer};
///
/// struct TaggingLayer {
///     tag: &'static str,
/// }
///
/// #[derive(Debug)]
/// struct TaggingAccessor<A> {
///     inner: A,
///     tag: &'static str,
/// }
///
/// impl<A: Accessor> Layer<A> for TaggingLayer {
///     type LayeredAccessor = TaggingAccessor<A>;
///
///     fn layer(self, inner: A) -> Self::LayeredAccessor {
///         TaggingAccessor { inner, tag: self.tag }
///     }
/// }
/// ```
pub trait Layer<A: Accessor> {
    /// The resulting accessor type after applying this layer.
    type LayeredAccessor;

    /// Wrap `inner`, consuming the layer configuration.
    fn layer(self, inner: A) -> Self::LayeredAccessor;
}

/// Extension trait for fluent layer composition on raw accessors.
///
/// ```rust
/// use anystore::{Accessor, LayerExt, LoggingLayer, MemoryAccessor, RetryLayer};
///
/// let acc = MemoryAccessor::default()
///     .layer(LoggingLayer::new())
///     .layer(RetryLayer::new().with_max_attempts(5));
/// assert_eq!(acc.info().scheme().as_str(), "memory");
/// ```
pub trait LayerExt: Accessor + Sized {
    /// Apply a layer to this accessor.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::LayeredAccessor {
        layer.layer(self)
    }
}

// Blanket implementation - any accessor gets LayerExt for free
impl<A: Accessor> LayerExt for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessorInfo, Capabilities, Capability, Metadata, Result, Scheme};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    #[derive(Debug)]
    struct Root {
        trace: Trace,
    }

    #[async_trait]
    impl Accessor for Root {
        fn info(&self) -> AccessorInfo {
            AccessorInfo::new(
                Scheme::Custom("root"),
                "/",
                "",
                Capabilities::empty().with(Capability::Stat),
            )
        }

        async fn stat(&self, path: &str) -> Result<Metadata> {
            self.trace.lock().unwrap().push("root");
            Ok(Metadata::new(crate::EntryMode::from_path(path)))
        }
    }

    struct RecordLayer(&'static str);

    #[derive(Debug)]
    struct Recorded<A> {
        inner: A,
        name: &'static str,
        trace: Trace,
    }

    impl<A: Accessor> Layer<A> for (RecordLayer, Trace) {
        type LayeredAccessor = Recorded<A>;

        fn layer(self, inner: A) -> Self::LayeredAccessor {
            Recorded {
                inner,
                name: self.0.0,
                trace: self.1,
            }
        }
    }

    #[async_trait]
    impl<A: Accessor> Accessor for Recorded<A> {
        fn info(&self) -> AccessorInfo {
            self.inner.info()
        }

        async fn stat(&self, path: &str) -> Result<Metadata> {
            self.trace.lock().unwrap().push(self.name);
            self.inner.stat(path).await
        }
    }

    #[tokio::test]
    async fn last_layer_intercepts_first() {
        let trace: Trace = Arc::default();
        let acc = Root {
            trace: trace.clone(),
        }
        .layer((RecordLayer("inner"), trace.clone()))
        .layer((RecordLayer("outer"), trace.clone()));

        acc.stat("x").await.unwrap();
        assert_eq!(*trace.lock().unwrap(), vec!["outer", "inner", "root"]);
    }

    #[test]
    fn layers_keep_capabilities() {
        let trace: Trace = Arc::default();
        let acc = Root {
            trace: trace.clone(),
        }
        .layer((RecordLayer("only"), trace));
        assert!(acc.info().capabilities().contains(Capability::Stat));
        assert_eq!(acc.info().scheme(), Scheme::Custom("root"));
    }
}
