//! Per-call deadlines.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Accessor, AccessorInfo, Error, Layer, Lister, Metadata, OpList, OpRead, OpWrite, Operation,
    Result,
};

/// Bounds every call with [`tokio::time::timeout`].
///
/// When the deadline passes the inner future is dropped, releasing
/// whatever it held, and [`Error::Timeout`] is returned. For `list` only
/// opening the lister is bounded; consuming the stream is not.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    /// Deadline applied to each call.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<A: Accessor> Layer<A> for TimeoutLayer {
    type LayeredAccessor = TimeoutAccessor<A>;

    fn layer(self, inner: A) -> Self::LayeredAccessor {
        TimeoutAccessor {
            inner,
            timeout: self.timeout,
        }
    }
}

/// Accessor produced by [`TimeoutLayer`].
#[derive(Debug)]
pub struct TimeoutAccessor<A> {
    inner: A,
    timeout: Duration,
}

impl<A> TimeoutAccessor<A> {
    async fn bounded<T>(
        &self,
        operation: Operation,
        path: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Timeout {
                operation,
                path: path.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl<A: Accessor> Accessor for TimeoutAccessor<A> {
    fn info(&self) -> AccessorInfo {
        self.inner.info()
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.bounded(Operation::CreateDir, path, self.inner.create_dir(path))
            .await
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        self.bounded(Operation::Read, path, self.inner.read(path, args))
            .await
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        self.bounded(Operation::Write, path, self.inner.write(path, data, args))
            .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.bounded(Operation::Delete, path, self.inner.delete(path))
            .await
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        self.bounded(Operation::Stat, path, self.inner.stat(path))
            .await
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        self.bounded(Operation::List, path, self.inner.list(path, args))
            .await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.bounded(Operation::Copy, from, self.inner.copy(from, to))
            .await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.bounded(Operation::Rename, from, self.inner.rename(from, to))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capabilities, Capability, EntryMode, ErrorKind, LayerExt, Scheme};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Holds a resource while a call is in flight; `stat("slow")` never
    /// completes on its own.
    #[derive(Debug, Default)]
    struct Hanging {
        held: Arc<AtomicUsize>,
    }

    struct Guard(Arc<AtomicUsize>);

    impl Guard {
        fn acquire(counter: &Arc<AtomicUsize>) -> Self {
            counter.fetch_add(1, Ordering::SeqCst);
            Guard(counter.clone())
        }
    }

    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Accessor for Hanging {
        fn info(&self) -> AccessorInfo {
            AccessorInfo::new(
                Scheme::Custom("hanging"),
                "/",
                "",
                Capabilities::empty().with(Capability::Stat),
            )
        }

        async fn stat(&self, path: &str) -> Result<Metadata> {
            let _guard = Guard::acquire(&self.held);
            if path == "slow" {
                std::future::pending::<()>().await;
            }
            Ok(Metadata::new(EntryMode::File))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_returns_timeout_and_releases_resources() {
        let inner = Hanging::default();
        let held = inner.held.clone();
        let acc = inner.layer(TimeoutLayer::new(Duration::from_secs(2)));

        let err = acc.stat("slow").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(matches!(
            err,
            Error::Timeout { operation: Operation::Stat, ref path, timeout }
                if path == "slow" && timeout == Duration::from_secs(2)
        ));
        assert_eq!(held.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_calls_pass_through() {
        let acc = Hanging::default().layer(TimeoutLayer::new(Duration::from_millis(10)));
        assert!(acc.stat("fast").await.unwrap().is_file());
    }
}
