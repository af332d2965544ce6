use super::{BlogStore, DocumentCursor};
use blog_tonic_core::{Error, Result};
use bson::{Document, doc, oid::ObjectId};
use futures::{StreamExt, TryStreamExt};
use mongodb::{Collection, options::ReturnDocument};

/// [`BlogStore`] over a MongoDB collection of raw documents.
///
/// Cloning the underlying [`Collection`] is cheap and shares the client's
/// connection pool.
#[derive(Clone, Debug)]
pub struct MongoBlogStore {
    collection: Collection<Document>,
}

impl MongoBlogStore {
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[tonic::async_trait]
impl BlogStore for MongoBlogStore {
    async fn find_one(&self, id: ObjectId) -> Result<Option<Document>> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| Error::storage(format!("find_one failed: {e}")))
    }

    async fn insert_one(&self, document: Document) -> Result<ObjectId> {
        let result = self
            .collection
            .insert_one(document)
            .await
            .map_err(|e| Error::storage(format!("insert_one failed: {e}")))?;

        result.inserted_id.as_object_id().ok_or_else(|| {
            Error::storage(format!(
                "inserted id is not an ObjectId: {}",
                result.inserted_id
            ))
        })
    }

    async fn find_one_and_update(
        &self,
        id: ObjectId,
        fields: Document,
    ) -> Result<Option<Document>> {
        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": fields })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| Error::storage(format!("find_one_and_update failed: {e}")))
    }

    async fn delete_one(&self, id: ObjectId) -> Result<u64> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| Error::storage(format!("delete_one failed: {e}")))?;
        Ok(result.deleted_count)
    }

    async fn find_all(&self) -> Result<DocumentCursor> {
        let cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| Error::storage(format!("find failed: {e}")))?;

        // Dropping the driver cursor kills it server-side.
        Ok(cursor
            .map_err(|e| Error::storage(format!("cursor error: {e}")))
            .boxed())
    }
}
