use std::fmt;
use std::iter::FusedIterator;

use crate::core::errors::StoreError;
use crate::driver::{DriverCursor, Namespace};
use crate::Document;

/// Forward-only stream of documents returned by a find.
///
/// Documents are pulled from the driver as the cursor is advanced. Once the
/// stream ends, fails, or is closed, the driver cursor is dropped and every
/// later call to `next` returns `None`. A cursor cannot be rewound; run the
/// find again to start over.
pub struct DocumentCursor {
    inner: Option<DriverCursor>,
    namespace: Namespace,
    yielded: u64,
}

impl DocumentCursor {
    pub(crate) fn new(namespace: Namespace, inner: DriverCursor) -> Self {
        Self {
            inner: Some(inner),
            namespace,
            yielded: 0,
        }
    }

    /// Release the driver cursor without reading the remaining documents.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!(ns = %self.namespace, yielded = self.yielded, "cursor closed");
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.inner.is_none()
    }

    /// Number of documents handed out so far.
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Drain the rest of the cursor, stopping at the first error.
    pub fn try_collect(self) -> Result<Vec<Document>, StoreError> {
        self.collect()
    }
}

impl Iterator for DocumentCursor {
    type Item = Result<Document, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;
        match inner.next() {
            Some(Ok(doc)) => {
                self.yielded += 1;
                Some(Ok(doc))
            }
            Some(Err(e)) => {
                tracing::debug!(ns = %self.namespace, error = %e, "cursor failed");
                self.inner = None;
                Some(Err(StoreError::Query(e)))
            }
            None => {
                self.close();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Some(inner) => (0, inner.size_hint().1),
            None => (0, Some(0)),
        }
    }
}

impl FusedIterator for DocumentCursor {}

impl fmt::Debug for DocumentCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCursor")
            .field("namespace", &self.namespace)
            .field("yielded", &self.yielded)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
