//! Retry transient failures with exponential backoff.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Accessor, AccessorInfo, Capability, Error, Layer, Lister, Metadata, OpList, OpRead, OpWrite,
    Operation, Result,
};

/// Retries calls that fail with a transient error.
///
/// Only errors for which [`Error::is_transient`] holds are retried; every
/// other failure, and the last transient one once attempts run out, is
/// returned unchanged.
///
/// `read`, `stat`, `list`, `delete`, `create_dir` and `copy` are always
/// retried. `write` is retried when the inner accessor declares
/// [`Capability::WriteIdempotent`] or [`with_at_least_once`] is set.
/// `rename` is retried only with [`with_at_least_once`].
///
/// [`with_at_least_once`]: RetryLayer::with_at_least_once
///
/// ```rust
/// use std::time::Duration;
/// use anystore::RetryLayer;
///
/// let layer = RetryLayer::new()
///     .with_max_attempts(5)
///     .with_min_delay(Duration::from_millis(10))
///     .with_jitter(false);
/// assert_eq!(layer.max_attempts(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct RetryLayer {
    max_attempts: usize,
    min_delay: Duration,
    max_delay: Duration,
    factor: f64,
    jitter: bool,
    at_least_once: bool,
}

impl Default for RetryLayer {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
            jitter: true,
            at_least_once: false,
        }
    }
}

impl RetryLayer {
    /// Three attempts, 100ms to 10s exponential backoff with full jitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total attempts, including the first. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay before the first retry.
    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }

    /// Upper bound on any single delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Growth factor between consecutive delays. Clamped to at least 1.
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor.max(1.0);
        self
    }

    /// Draw each delay uniformly from `[0, delay]`.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Also retry `write` and `rename`, accepting that a call which
    /// succeeded remotely but reported a transient error may be repeated.
    pub fn with_at_least_once(mut self, at_least_once: bool) -> Self {
        self.at_least_once = at_least_once;
        self
    }

    /// Configured total attempts.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based), before jitter.
    fn backoff(&self, retry: u32) -> Duration {
        let exp = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.min_delay.as_secs_f64() * self.factor.powi(exp);
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    fn delay(&self, retry: u32) -> Duration {
        let delay = self.backoff(retry);
        if self.jitter {
            delay.mul_f64(rand::random::<f64>())
        } else {
            delay
        }
    }
}

impl<A: Accessor> Layer<A> for RetryLayer {
    type LayeredAccessor = RetryAccessor<A>;

    fn layer(self, inner: A) -> Self::LayeredAccessor {
        let write_idempotent = inner
            .info()
            .capabilities()
            .contains(Capability::WriteIdempotent);
        RetryAccessor {
            inner,
            policy: self,
            write_idempotent,
        }
    }
}

/// Accessor produced by [`RetryLayer`].
#[derive(Debug)]
pub struct RetryAccessor<A> {
    inner: A,
    policy: RetryLayer,
    write_idempotent: bool,
}

impl<A: Accessor> RetryAccessor<A> {
    async fn retry<T, F, Fut>(&self, operation: Operation, path: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay(attempt as u32);
                    tracing::warn!(
                        %operation,
                        path,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        ?delay,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn retries_writes(&self) -> bool {
        self.write_idempotent || self.policy.at_least_once
    }
}

#[async_trait]
impl<A: Accessor> Accessor for RetryAccessor<A> {
    fn info(&self) -> AccessorInfo {
        self.inner.info()
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        self.retry(Operation::CreateDir, path, || self.inner.create_dir(path))
            .await
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        self.retry(Operation::Read, path, || self.inner.read(path, args.clone()))
            .await
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        if !self.retries_writes() {
            return self.inner.write(path, data, args).await;
        }
        self.retry(Operation::Write, path, || {
            self.inner.write(path, data.clone(), args.clone())
        })
        .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.retry(Operation::Delete, path, || self.inner.delete(path))
            .await
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        self.retry(Operation::Stat, path, || self.inner.stat(path)).await
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        self.retry(Operation::List, path, || self.inner.list(path, args))
            .await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.retry(Operation::Copy, from, || self.inner.copy(from, to))
            .await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        if !self.policy.at_least_once {
            return self.inner.rename(from, to).await;
        }
        self.retry(Operation::Rename, from, || self.inner.rename(from, to))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capabilities, EntryMode, ErrorKind, LayerExt, Scheme};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls of every operation with a transient
    /// error, then succeeds.
    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
        capabilities: Capabilities,
    }

    impl Flaky {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
                capabilities: Capabilities::empty()
                    .with(Capability::Read)
                    .with(Capability::Write)
                    .with(Capability::Stat)
                    .with(Capability::Rename),
            }
        }

        fn idempotent(mut self) -> Self {
            self.capabilities.insert(Capability::WriteIdempotent);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn attempt(&self, operation: Operation, path: &str) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(Error::Transient {
                    operation,
                    path: path.to_string(),
                    message: format!("attempt {}", n + 1),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Accessor for Flaky {
        fn info(&self) -> AccessorInfo {
            AccessorInfo::new(Scheme::Custom("flaky"), "/", "", self.capabilities)
        }

        async fn read(&self, path: &str, _: OpRead) -> Result<Vec<u8>> {
            self.attempt(Operation::Read, path).map(|()| b"ok".to_vec())
        }

        async fn write(&self, path: &str, _: Vec<u8>, _: OpWrite) -> Result<()> {
            self.attempt(Operation::Write, path)
        }

        async fn stat(&self, path: &str) -> Result<Metadata> {
            if path == "denied" {
                self.calls.fetch_add(1, Ordering::SeqCst);
                return Err(Error::PermissionDenied {
                    path: path.to_string(),
                    operation: Operation::Stat,
                });
            }
            self.attempt(Operation::Stat, path)
                .map(|()| Metadata::new(EntryMode::File))
        }

        async fn rename(&self, from: &str, _: &str) -> Result<()> {
            self.attempt(Operation::Rename, from)
        }
    }

    fn fast() -> RetryLayer {
        RetryLayer::new()
            .with_min_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_when_attempts_cover_failures() {
        let acc = Flaky::new(2).layer(fast().with_max_attempts(3));
        assert_eq!(acc.read("a", OpRead::new()).await.unwrap(), b"ok");
        assert_eq!(acc.inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_when_exhausted() {
        let acc = Flaky::new(5).layer(fast().with_max_attempts(3));
        let err = acc.read("a", OpRead::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("attempt 3"));
        assert_eq!(acc.inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let acc = Flaky::new(0).layer(fast().with_max_attempts(5));
        let err = acc.stat("denied").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(acc.inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_are_not_retried_by_default() {
        let acc = Flaky::new(1).layer(fast());
        let err = acc.write("a", vec![1], OpWrite::new()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(acc.inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idempotent_writes_are_retried() {
        let acc = Flaky::new(1).idempotent().layer(fast());
        acc.write("a", vec![1], OpWrite::new()).await.unwrap();
        assert_eq!(acc.inner.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn at_least_once_retries_rename() {
        let acc = Flaky::new(1).layer(fast());
        acc.rename("a", "b").await.unwrap_err();

        let acc = Flaky::new(1).layer(fast().with_at_least_once(true));
        acc.rename("a", "b").await.unwrap();
        acc.write("a", vec![], OpWrite::new()).await.unwrap();
        assert_eq!(acc.inner.calls(), 3);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let layer = RetryLayer::new()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350))
            .with_jitter(false);
        assert_eq!(layer.backoff(1), Duration::from_millis(100));
        assert_eq!(layer.backoff(2), Duration::from_millis(200));
        assert_eq!(layer.backoff(3), Duration::from_millis(350));
        assert_eq!(layer.backoff(64), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let layer = RetryLayer::new();
        for retry in 1..6 {
            assert!(layer.delay(retry) <= layer.backoff(retry));
        }
    }

    #[test]
    fn max_attempts_floor() {
        assert_eq!(RetryLayer::new().with_max_attempts(0).max_attempts(), 1);
        assert_eq!(RetryLayer::new().with_factor(f64::NAN).factor, 1.0);
    }
}
