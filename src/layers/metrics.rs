//! Operation counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::{
    Accessor, AccessorInfo, Layer, Lister, Metadata, OpList, OpRead, OpWrite, Operation, Result,
};

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Default)]
struct Registry {
    operations: [Counters; Operation::ALL.len()],
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

/// Shared view of the counters collected by a [`MetricsLayer`].
///
/// Cloning is cheap; all clones observe the same counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsHandle(Arc<Registry>);

impl MetricsHandle {
    /// Calls issued for `operation`, successful or not.
    pub fn requests(&self, operation: Operation) -> u64 {
        self.counters(operation).requests.load(Ordering::Relaxed)
    }

    /// Calls for `operation` that returned an error.
    pub fn errors(&self, operation: Operation) -> u64 {
        self.counters(operation).errors.load(Ordering::Relaxed)
    }

    /// Total bytes returned by successful reads.
    pub fn bytes_read(&self) -> u64 {
        self.0.bytes_read.load(Ordering::Relaxed)
    }

    /// Total bytes accepted by successful writes.
    pub fn bytes_written(&self) -> u64 {
        self.0.bytes_written.load(Ordering::Relaxed)
    }

    /// Per-operation `(operation, requests, errors)` for every operation
    /// that has been called at least once.
    pub fn snapshot(&self) -> Vec<(Operation, u64, u64)> {
        Operation::ALL
            .into_iter()
            .map(|op| (op, self.requests(op), self.errors(op)))
            .filter(|(_, requests, _)| *requests > 0)
            .collect()
    }

    fn counters(&self, operation: Operation) -> &Counters {
        &self.0.operations[operation as usize]
    }

    fn record<T>(&self, operation: Operation, result: &Result<T>) {
        let counters = self.counters(operation);
        counters.requests.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Counts requests, errors and bytes per operation.
///
/// ```rust
/// use anystore::{MemoryAccessor, MetricsLayer, Operation, Operator};
///
/// # tokio_test::block_on(async {
/// let metrics = MetricsLayer::new();
/// let handle = metrics.handle();
/// let op = Operator::new(MemoryAccessor::default()).layer(metrics);
///
/// op.write("a", b"abc".to_vec()).await.unwrap();
/// assert_eq!(handle.requests(Operation::Write), 1);
/// assert_eq!(handle.bytes_written(), 3);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetricsLayer {
    handle: MetricsHandle,
}

impl MetricsLayer {
    /// Create a layer with fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to read the counters after the layer has been applied.
    pub fn handle(&self) -> MetricsHandle {
        self.handle.clone()
    }
}

impl<A: Accessor> Layer<A> for MetricsLayer {
    type LayeredAccessor = MetricsAccessor<A>;

    fn layer(self, inner: A) -> Self::LayeredAccessor {
        MetricsAccessor {
            inner,
            handle: self.handle,
        }
    }
}

/// Accessor produced by [`MetricsLayer`].
#[derive(Debug)]
pub struct MetricsAccessor<A> {
    inner: A,
    handle: MetricsHandle,
}

#[async_trait]
impl<A: Accessor> Accessor for MetricsAccessor<A> {
    fn info(&self) -> AccessorInfo {
        self.inner.info()
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let result = self.inner.create_dir(path).await;
        self.handle.record(Operation::CreateDir, &result);
        result
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        let result = self.inner.read(path, args).await;
        self.handle.record(Operation::Read, &result);
        if let Ok(data) = &result {
            self.handle
                .0
                .bytes_read
                .fetch_add(data.len() as u64, Ordering::Relaxed);
        }
        result
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        let len = data.len() as u64;
        let result = self.inner.write(path, data, args).await;
        self.handle.record(Operation::Write, &result);
        if result.is_ok() {
            self.handle.0.bytes_written.fetch_add(len, Ordering::Relaxed);
        }
        result
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let result = self.inner.delete(path).await;
        self.handle.record(Operation::Delete, &result);
        result
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let result = self.inner.stat(path).await;
        self.handle.record(Operation::Stat, &result);
        result
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        let result = self.inner.list(path, args).await;
        self.handle.record(Operation::List, &result);
        result
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let result = self.inner.copy(from, to).await;
        self.handle.record(Operation::Copy, &result);
        result
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let result = self.inner.rename(from, to).await;
        self.handle.record(Operation::Rename, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LayerExt, MemoryAccessor};

    #[tokio::test]
    async fn counts_requests_errors_and_bytes() {
        let layer = MetricsLayer::new();
        let handle = layer.handle();
        let acc = MemoryAccessor::default().layer(layer);

        acc.write("a", vec![0; 10], OpWrite::new()).await.unwrap();
        acc.read("a", OpRead::new()).await.unwrap();
        acc.read("missing", OpRead::new()).await.unwrap_err();
        acc.delete("a").await.unwrap();

        assert_eq!(handle.requests(Operation::Read), 2);
        assert_eq!(handle.errors(Operation::Read), 1);
        assert_eq!(handle.requests(Operation::Write), 1);
        assert_eq!(handle.bytes_written(), 10);
        assert_eq!(handle.bytes_read(), 10);
        assert_eq!(
            handle.snapshot(),
            vec![
                (Operation::Read, 2, 1),
                (Operation::Write, 1, 0),
                (Operation::Delete, 1, 0),
            ]
        );
    }

    #[test]
    fn handles_share_counters() {
        let layer = MetricsLayer::new();
        let a = layer.handle();
        let b = a.clone();
        a.record::<()>(Operation::Stat, &Ok(()));
        assert_eq!(b.requests(Operation::Stat), 1);
    }
}
