//! Lazy directory listings.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::{Entry, Error, Result};

/// Backend-side source of listing pages.
///
/// Each call to [`next_page`](Pager::next_page) may suspend (a network round
/// trip, a directory read). `Ok(None)` marks the end of the listing.
#[async_trait]
pub trait Pager: Send + 'static {
    /// Fetch the next page of entries.
    async fn next_page(&mut self) -> Result<Option<Vec<Entry>>>;
}

/// Lazy, finite stream of listed entries.
///
/// Wraps a boxed stream so every backend can produce listings its own way.
/// A `Lister` cannot be restarted once partially consumed; list again for a
/// fresh pass.
///
/// - Outer `Result` (from `list`) = "can I list this directory?"
/// - Inner `Result` (per item) = "did fetching this entry succeed?"
///
/// # Example
///
/// ```rust
/// use anystore::{Entry, EntryMode, Lister, Metadata};
/// use futures_util::TryStreamExt;
///
/// # tokio_test::block_on(async {
/// let lister = Lister::from_vec(vec![
///     Entry::new("a", Metadata::new(EntryMode::File)),
///     Entry::new("b/", Metadata::new(EntryMode::Dir)),
/// ]);
/// let entries: Vec<Entry> = lister.try_collect().await.unwrap();
/// assert_eq!(entries.len(), 2);
/// # });
/// ```
pub struct Lister(BoxStream<'static, Result<Entry>>);

impl Lister {
    /// Create from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Entry>> + Send + 'static,
    {
        Self(stream.boxed())
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Entry>) -> Self {
        Self::new(stream::iter(entries.into_iter().map(Ok)))
    }

    /// An empty listing.
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Drive a [`Pager`] lazily: pages are fetched only as entries are pulled.
    pub fn from_pager<P: Pager>(pager: P) -> Self {
        let state = (pager, VecDeque::<Entry>::new(), false);
        let stream = stream::try_unfold(state, |(mut pager, mut buf, mut done)| async move {
            loop {
                if let Some(entry) = buf.pop_front() {
                    return Ok::<_, Error>(Some((entry, (pager, buf, done))));
                }
                if done {
                    return Ok(None);
                }
                match pager.next_page().await {
                    Ok(Some(page)) => buf.extend(page),
                    Ok(None) => done = true,
                    Err(err) => return Err(err),
                }
            }
        });
        Self::new(stream)
    }

    /// Collect all entries, short-circuiting on the first error.
    pub async fn collect_all(self) -> Result<Vec<Entry>> {
        self.try_collect().await
    }
}

impl Stream for Lister {
    type Item = Result<Entry>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl fmt::Debug for Lister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lister").finish_non_exhaustive()
    }
}
