//! Structured logging via `tracing`.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tracing::Instrument;

use crate::{
    Accessor, AccessorInfo, Error, ErrorKind, Layer, Lister, Metadata, OpList, OpRead, OpWrite,
    Operation, Result, Scheme,
};

/// Emits a `tracing` span per call, a `debug` event on success and a `warn`
/// event on failure. `NotFound` is logged at `debug`, since probing for
/// missing paths is routine.
///
/// Logging never changes a call's outcome or payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    _priv: (),
}

impl LoggingLayer {
    /// Create the layer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: Accessor> Layer<A> for LoggingLayer {
    type LayeredAccessor = LoggingAccessor<A>;

    fn layer(self, inner: A) -> Self::LayeredAccessor {
        let scheme = inner.info().scheme();
        LoggingAccessor { inner, scheme }
    }
}

/// Accessor produced by [`LoggingLayer`].
#[derive(Debug)]
pub struct LoggingAccessor<A> {
    inner: A,
    scheme: Scheme,
}

impl<A> LoggingAccessor<A> {
    fn span(&self, operation: Operation, path: &str) -> tracing::Span {
        tracing::debug_span!("anystore", scheme = %self.scheme, %operation, path)
    }

    fn finish<T>(&self, operation: Operation, path: &str, result: &Result<T>) {
        match result {
            Ok(_) => tracing::debug!(%operation, path, "finished"),
            Err(err) => log_failure(operation, path, err),
        }
    }
}

fn log_failure(operation: Operation, path: &str, err: &Error) {
    if err.kind() == ErrorKind::NotFound {
        tracing::debug!(%operation, path, "not found");
    } else {
        tracing::warn!(%operation, path, kind = %err.kind(), error = %err, "failed");
    }
}

#[async_trait]
impl<A: Accessor> Accessor for LoggingAccessor<A> {
    fn info(&self) -> AccessorInfo {
        self.inner.info()
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let result = self
            .inner
            .create_dir(path)
            .instrument(self.span(Operation::CreateDir, path))
            .await;
        self.finish(Operation::CreateDir, path, &result);
        result
    }

    async fn read(&self, path: &str, args: OpRead) -> Result<Vec<u8>> {
        let range = args.range();
        let result = self
            .inner
            .read(path, args)
            .instrument(self.span(Operation::Read, path))
            .await;
        match &result {
            Ok(data) => tracing::debug!(
                operation = %Operation::Read,
                path,
                ?range,
                bytes = data.len(),
                "finished"
            ),
            Err(err) => log_failure(Operation::Read, path, err),
        }
        result
    }

    async fn write(&self, path: &str, data: Vec<u8>, args: OpWrite) -> Result<()> {
        let bytes = data.len();
        tracing::debug!(operation = %Operation::Write, path, bytes, "started");
        let result = self
            .inner
            .write(path, data, args)
            .instrument(self.span(Operation::Write, path))
            .await;
        self.finish(Operation::Write, path, &result);
        result
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let result = self
            .inner
            .delete(path)
            .instrument(self.span(Operation::Delete, path))
            .await;
        self.finish(Operation::Delete, path, &result);
        result
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let result = self
            .inner
            .stat(path)
            .instrument(self.span(Operation::Stat, path))
            .await;
        self.finish(Operation::Stat, path, &result);
        result
    }

    async fn list(&self, path: &str, args: OpList) -> Result<Lister> {
        let recursive = args.recursive();
        let result = self
            .inner
            .list(path, args)
            .instrument(self.span(Operation::List, path))
            .await;
        match result {
            Ok(lister) => {
                tracing::debug!(operation = %Operation::List, path, recursive, "opened");
                let owned = path.to_string();
                Ok(Lister::new(lister.inspect_err(move |err| {
                    log_failure(Operation::List, &owned, err)
                })))
            }
            Err(err) => {
                log_failure(Operation::List, path, &err);
                Err(err)
            }
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let result = self
            .inner
            .copy(from, to)
            .instrument(self.span(Operation::Copy, from))
            .await;
        match &result {
            Ok(()) => tracing::debug!(operation = %Operation::Copy, from, to, "finished"),
            Err(err) => log_failure(Operation::Copy, from, err),
        }
        result
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let result = self
            .inner
            .rename(from, to)
            .instrument(self.span(Operation::Rename, from))
            .await;
        match &result {
            Ok(()) => tracing::debug!(operation = %Operation::Rename, from, to, "finished"),
            Err(err) => log_failure(Operation::Rename, from, err),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LayerExt, MemoryAccessor};

    #[tokio::test]
    async fn logging_passes_results_through() {
        let acc = MemoryAccessor::default().layer(LoggingLayer::new());
        acc.write("a", b"hello".to_vec(), OpWrite::new()).await.unwrap();
        assert_eq!(acc.read("a", OpRead::new()).await.unwrap(), b"hello");

        let err = acc.stat("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let entries = acc.list("/", OpList::new()).await.unwrap().collect_all().await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn logging_keeps_info() {
        let inner = MemoryAccessor::default();
        let expected = inner.info();
        assert_eq!(inner.layer(LoggingLayer::new()).info(), expected);
    }
}
