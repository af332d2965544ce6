//! Storage collaborator for the blog service.
//!
//! [`BlogStore`] is the narrow view of a document collection the handlers
//! need. It trades in raw BSON [`Document`]s: decoding into
//! [`BlogItem`](blog_tonic_core::types::BlogItem) happens in the service so
//! that decode failures are classified there, not hidden in the store.
//!
//! The store is constructed once at startup and injected into
//! [`BlogRecordService`](crate::server::service::handler::BlogRecordService)
//! as an `Arc<dyn BlogStore>`; connection pooling and concurrent query
//! execution are the implementation's concern.
//!
//! - [`mongo`] - [`MongoBlogStore`](mongo::MongoBlogStore), backed by the
//!   official MongoDB driver.

#[cfg(test)]
pub mod memory;
pub mod mongo;

use blog_tonic_core::Result;
use bson::{Document, oid::ObjectId};
use futures::stream::BoxStream;

/// A forward-only stream over every document of a collection.
///
/// Dropping it releases the underlying cursor.
pub type DocumentCursor = BoxStream<'static, Result<Document>>;

/// Document-collection operations used by the blog handlers.
///
/// Every method reports storage-side failures as
/// [`Error::StorageFailure`](blog_tonic_core::Error::StorageFailure).
#[tonic::async_trait]
pub trait BlogStore: Send + Sync + 'static {
    /// Returns the document whose `_id` is `id`, if any.
    async fn find_one(&self, id: ObjectId) -> Result<Option<Document>>;

    /// Inserts `document` and returns the identifier the store assigned.
    async fn insert_one(&self, document: Document) -> Result<ObjectId>;

    /// Atomically applies `fields` as a `$set` to the document whose `_id`
    /// is `id` and returns the document as it is *after* the update.
    async fn find_one_and_update(&self, id: ObjectId, fields: Document)
    -> Result<Option<Document>>;

    /// Deletes at most one document whose `_id` is `id`; returns how many
    /// were removed.
    async fn delete_one(&self, id: ObjectId) -> Result<u64>;

    /// Opens an unfiltered cursor over the collection in natural order.
    async fn find_all(&self) -> Result<DocumentCursor>;
}
