//! In-memory [`BlogStore`] used by the handler tests.
//!
//! Besides storing documents it records how often it was touched, can be told
//! to fail writes or lookups, accepts arbitrary (malformed) documents, and
//! counts how many cursors have been dropped.

use super::{BlogStore, DocumentCursor};
use blog_tonic_core::{Error, Result};
use bson::{Bson, Document, oid::ObjectId};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

#[derive(Default)]
pub struct MemoryBlogStore {
    documents: Mutex<Vec<Document>>,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    cursors_released: Arc<AtomicUsize>,
}

/// Counts a release when the cursor that owns it is dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl MemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `document` verbatim, bypassing any shape checks.
    pub fn push_raw(&self, document: Document) {
        self.documents.lock().push(document);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cursors_released(&self) -> usize {
        self.cursors_released.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.lock().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `find_one`, `find_one_and_update` and `find_all` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn matches(document: &Document, id: ObjectId) -> bool {
        document.get("_id") == Some(&Bson::ObjectId(id))
    }
}

#[tonic::async_trait]
impl BlogStore for MemoryBlogStore {
    async fn find_one(&self, id: ObjectId) -> Result<Option<Document>> {
        self.touch();
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage("find_one failed: server selection timeout"));
        }
        let documents = self.documents.lock();
        Ok(documents.iter().find(|d| Self::matches(d, id)).cloned())
    }

    async fn insert_one(&self, mut document: Document) -> Result<ObjectId> {
        self.touch();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("insert_one failed: write concern error"));
        }
        let id = ObjectId::new();
        document.insert("_id", id);
        self.documents.lock().push(document);
        Ok(id)
    }

    async fn find_one_and_update(
        &self,
        id: ObjectId,
        fields: Document,
    ) -> Result<Option<Document>> {
        self.touch();
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage(
                "find_one_and_update failed: server selection timeout",
            ));
        }
        let mut documents = self.documents.lock();
        let Some(document) = documents.iter_mut().find(|d| Self::matches(d, id)) else {
            return Ok(None);
        };
        for (key, value) in fields {
            document.insert(key, value);
        }
        Ok(Some(document.clone()))
    }

    async fn delete_one(&self, id: ObjectId) -> Result<u64> {
        self.touch();
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::storage("delete_one failed: write concern error"));
        }
        let mut documents = self.documents.lock();
        match documents.iter().position(|d| Self::matches(d, id)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_all(&self) -> Result<DocumentCursor> {
        self.touch();
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::storage("find failed: server selection timeout"));
        }
        let documents = self.snapshot();
        let guard = ReleaseGuard(Arc::clone(&self.cursors_released));
        Ok(futures::stream::iter(documents)
            .map(move |document| {
                let _held = &guard;
                Ok(document)
            })
            .boxed())
    }
}
