//! Bound the number of in-flight calls.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{
    Accessor, AccessorInfo, Error, Layer, Lister, Metadata, OpList, OpRead, OpWrite, Operation,
    Result,
};

/// Caps concurrent calls to the inner accessor with a
/// [`tokio::sync::Semaphore`].
///
/// A permit is held for the duration of each call and returned when the
/// call completes or its future is dropped. A lister keeps its permit until
/// the stream is exhausted or dropped.
#[derive(Debug, Clone)]
pub struct ConcurrentLimitLayer {
    semaphore: Arc<Semaphore>,
}

impl ConcurrentLimitLayer {
    /// Allow at most `permits` calls at once. Zero is raised to one.
    pub fn new(permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits.max(1))),
        }
    }
}

impl<A: Accessor> Layer<A> for ConcurrentLimitLayer {
    type LayeredAccessor = ConcurrentLimitAccessor<A>;

    fn layer(self, inner: A) -> Self::LayeredAccessor {
        ConcurrentLimitAccessor {
            inner,
            semaphore: self.semaphore,
        }
    }
}

/// Accessor produced by [`ConcurrentLimitLayer`].
#[derive(Debug)]
pub struct ConcurrentLimitAccessor<A> {
    inner: A,
    semaphore: Arc<Semaphore>,
}

impl<A> ConcurrentLimitAccessor<A> {
    async fn permit(&self, operation: Operation) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Cancelled { operation })
    }
}

#[async_trait]
impl<A: Accessor> Accessor for ConcurrentLimitAccessor<A> {
    fn info(&self) -> AccessorInfo {
        self.inner.info()
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let _permit = self.permit(Operation::CreateDir).await?;
        self.inner.create_dir(path).await
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        let _permit = self.permit(Operation::Read).await?;
        self.inner.read(path, args).await
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        let _permit = self.permit(Operation::Write).await?;
        self.inner.write(path, data, args).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let _permit = self.permit(Operation::Delete).await?;
        self.inner.delete(path).await
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let _permit = self.permit(Operation::Stat).await?;
        self.inner.stat(path).await
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        let permit = self.permit(Operation::List).await?;
        let lister = self.inner.list(path, args).await?;
        Ok(Lister::new(lister.map(move |entry| {
            let _held = &permit;
            entry
        })))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let _permit = self.permit(Operation::Copy).await?;
        self.inner.copy(from, to).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let _permit = self.permit(Operation::Rename).await?;
        self.inner.rename(from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capabilities, Capability, EntryMode, LayerExt, Scheme};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Accessor for Gauge {
        fn info(&self) -> AccessorInfo {
            AccessorInfo::new(
                Scheme::Custom("gauge"),
                "/",
                "",
                Capabilities::empty().with(Capability::Stat),
            )
        }

        async fn stat(&self, _: &str) -> Result<Metadata> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(Metadata::new(EntryMode::File))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn limits_in_flight_calls() {
        let acc = Arc::new(Gauge::default().layer(ConcurrentLimitLayer::new(2)));
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let acc = acc.clone();
                tokio::spawn(async move { acc.stat(&format!("f{i}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(acc.inner.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lister_holds_its_permit_until_dropped() {
        let layer = ConcurrentLimitLayer::new(1);
        let semaphore = layer.semaphore.clone();
        let acc = crate::MemoryAccessor::default().layer(layer);

        let lister = acc.list("/", OpList::new()).await.unwrap();
        assert_eq!(semaphore.available_permits(), 0);
        drop(lister);
        assert_eq!(semaphore.available_permits(), 1);
    }
}
