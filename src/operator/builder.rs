//! Assemble an operator from a backend, options and layers.

use std::fmt;
use std::sync::Arc;

use crate::{
    Accessor, ConfigMap, DynAccessor, FsAccessor, Layer, MemoryAccessor, Operator,
    OperatorOptions, Result, RetryLayer, Scheme, TimeoutLayer, Error,
};

type LayerFn = Box<dyn FnOnce(DynAccessor) -> DynAccessor + Send>;

/// Builds an [`Operator`] step by step.
///
/// Layers are recorded in order and applied in [`finish`](Self::finish):
/// first the timeout and retry layers derived from [`OperatorOptions`]
/// (timeout inside retry, so each attempt is timed separately), then every
/// layer passed to [`layer`](Self::layer). The last layer added is the
/// outermost.
///
/// ```rust
/// use std::time::Duration;
/// use anystore::{LoggingLayer, MemoryAccessor, OperatorBuilder, OperatorOptions};
///
/// let options = OperatorOptions {
///     timeout: Some(Duration::from_secs(5)),
///     max_retries: Some(2),
///     ..OperatorOptions::default()
/// };
/// let op = OperatorBuilder::new(MemoryAccessor::default())
///     .options(options)
///     .layer(LoggingLayer::new())
///     .finish();
/// assert_eq!(op.info().scheme().as_str(), "memory");
/// ```
pub struct OperatorBuilder {
    accessor: DynAccessor,
    options: OperatorOptions,
    layers: Vec<LayerFn>,
}

impl OperatorBuilder {
    /// Start from a backend.
    pub fn new<A: Accessor>(accessor: A) -> Self {
        Self {
            accessor: Arc::new(accessor),
            options: OperatorOptions::default(),
            layers: Vec::new(),
        }
    }

    /// Pick the built-in backend for `scheme` and consume its keys plus the
    /// operator-wide ones. Any key left over is rejected.
    pub fn from_config(scheme: Scheme, mut config: ConfigMap) -> Result<Self> {
        let options = OperatorOptions::from_config(&mut config)?;
        let builder = match scheme {
            Scheme::Memory => Self::new(MemoryAccessor::from_config(&mut config)?),
            Scheme::Fs => Self::new(FsAccessor::from_config(&mut config)?),
            Scheme::Custom(name) => {
                return Err(Error::invalid(format!(
                    "no built-in backend for scheme {name:?}"
                )));
            }
        };
        config.finish()?;
        tracing::debug!(%scheme, ?options, "operator configured");
        Ok(builder.options(options))
    }

    /// Replace the operator-wide options.
    pub fn options(mut self, options: OperatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Append a layer. It wraps every layer added before it.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<DynAccessor> + Send + 'static,
        L::LayeredAccessor: Accessor,
    {
        self.layers
            .push(Box::new(move |inner: DynAccessor| {
                Arc::new(layer.layer(inner)) as DynAccessor
            }));
        self
    }

    /// Apply everything and build the operator.
    pub fn finish(self) -> Operator {
        let OperatorBuilder {
            mut accessor,
            options,
            layers,
        } = self;

        if let Some(timeout) = options.timeout {
            accessor = Arc::new(TimeoutLayer::new(timeout).layer(accessor));
        }
        if let Some(retries) = options.max_retries {
            let retry = RetryLayer::new()
                .with_max_attempts(retries.saturating_add(1))
                .with_at_least_once(options.retry_at_least_once);
            accessor = Arc::new(retry.layer(accessor));
        }
        for layer in layers {
            accessor = layer(accessor);
        }

        Operator::from_dyn(accessor).with_remove_all_mode(options.remove_all_mode)
    }
}

impl fmt::Debug for OperatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorBuilder")
            .field("accessor", &self.accessor)
            .field("options", &self.options)
            .field("layers", &self.layers.len())
            .finish()
    }
}
