//! gRPC service implementation for blog records.
//!
//! [`BlogRecordService`] implements the generated [`BlogService`] trait on top
//! of an injected [`BlogStore`]. Each RPC is a thin wrapper around an inherent
//! method that speaks the domain types ([`BlogItem`], [`Error`]); the wrapper
//! records metrics, logs failures and converts into `tonic` messages and
//! statuses.
//!
//! ## Responsibilities
//!
//! - Translate hex identifiers before any storage access.
//! - Map storage outcomes onto the service's error taxonomy.
//! - Pump `ListBlogs` cursors into bounded response channels via
//!   [`feed_records`].
//!
//! The service holds no per-request state; every clone shares the same store.

use crate::server::{
    config::ServerConfig,
    store::BlogStore,
    streaming::pump::feed_records,
    telemetry::{
        decrement_streams_inflight, increment_errors, increment_requests,
        increment_streams_inflight, record_stream_duration,
    },
};
use blog_tonic_core::{
    Error,
    proto::{
        BlogResponse, CreateBlogRequest, DeleteBlogRequest, DeleteBlogResponse, ListBlogsRequest,
        ListBlogsResponse, ReadBlogRequest, UpdateBlogRequest, blog_service_server::BlogService,
    },
    types::{BlogItem, parse_object_id},
};
use core::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status};
use tracing::Instrument;

/// Blog record handlers over a shared document collection.
#[derive(Clone)]
pub struct BlogRecordService {
    config: ServerConfig,
    store: Arc<dyn BlogStore>,
}

impl BlogRecordService {
    pub fn new(store: Arc<dyn BlogStore>, config: ServerConfig) -> Self {
        Self { config, store }
    }

    /// Looks up a record by its hex id.
    ///
    /// A missing document, a failed lookup and a document that does not
    /// decode are all reported as [`Error::NotFound`].
    pub async fn read(&self, id: &str) -> blog_tonic_core::Result<BlogItem> {
        let oid = parse_object_id(id)?;
        let not_found = |cause: &dyn core::fmt::Display| {
            Error::not_found(format!("could not find blog with object id {id}: {cause}"))
        };

        let document = self
            .store
            .find_one(oid)
            .await
            .map_err(|e| not_found(&e))?
            .ok_or_else(|| not_found(&"no such document"))?;

        let mut item = BlogItem::from_document(document).map_err(|e| not_found(&e))?;
        item.id = Some(oid);
        Ok(item)
    }

    /// Inserts a new record and returns it with the storage-assigned id.
    pub async fn create(&self, item: BlogItem) -> blog_tonic_core::Result<BlogItem> {
        let item = BlogItem { id: None, ..item };
        let document = item
            .to_document()
            .map_err(|e| Error::storage(format!("could not encode blog: {e}")))?;

        let id = self.store.insert_one(document).await?;
        Ok(BlogItem {
            id: Some(id),
            ..item
        })
    }

    /// Overwrites the mutable fields of an existing record and returns its
    /// post-update state.
    pub async fn update(&self, id: &str, item: BlogItem) -> blog_tonic_core::Result<BlogItem> {
        let oid = parse_object_id(id)?;
        let not_found = |cause: &dyn core::fmt::Display| {
            Error::not_found(format!("could not find blog with supplied id {id}: {cause}"))
        };

        let document = self
            .store
            .find_one_and_update(oid, item.fields())
            .await
            .map_err(|e| not_found(&e))?
            .ok_or_else(|| not_found(&"no such document"))?;

        BlogItem::from_document(document).map_err(|e| not_found(&e))
    }

    /// Deletes a record by hex id.
    ///
    /// Unless `strict_delete` is configured, removing nothing is reported as
    /// success just like removing one record.
    pub async fn delete(&self, id: &str) -> blog_tonic_core::Result<bool> {
        let oid = parse_object_id(id)?;
        let deleted = self.store.delete_one(oid).await?;

        if deleted == 0 {
            tracing::debug!(%id, "delete matched no document");
            if self.config.strict_delete {
                return Err(Error::not_found(format!(
                    "could not find blog with object id {id}"
                )));
            }
        }

        Ok(true)
    }
}

fn record_failure(operation: &'static str, err: &Error) {
    increment_errors(operation);
    tracing::warn!(operation, "request failed: {err}");
}

#[tonic::async_trait]
impl BlogService for BlogRecordService {
    type ListBlogsStream = Pin<Box<dyn Stream<Item = Result<ListBlogsResponse, Status>> + Send>>;

    #[tracing::instrument(skip_all)]
    async fn create_blog(
        &self,
        req: Request<CreateBlogRequest>,
    ) -> Result<Response<BlogResponse>, Status> {
        increment_requests("create_blog");
        let item = BlogItem::from(req.into_inner().blog.unwrap_or_default());

        let created = self
            .create(item)
            .await
            .inspect_err(|e| record_failure("create_blog", e))?;

        tracing::debug!(id = ?created.id, "created blog");
        Ok(Response::new(BlogResponse {
            blog: Some(created.into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn read_blog(
        &self,
        req: Request<ReadBlogRequest>,
    ) -> Result<Response<BlogResponse>, Status> {
        increment_requests("read_blog");

        let item = self
            .read(&req.get_ref().id)
            .await
            .inspect_err(|e| record_failure("read_blog", e))?;

        Ok(Response::new(BlogResponse {
            blog: Some(item.into()),
        }))
    }

    #[tracing::instrument(skip_all)]
    async fn update_blog(
        &self,
        req: Request<UpdateBlogRequest>,
    ) -> Result<Response<BlogResponse>, Status> {
        increment_requests("update_blog");
        let blog = req.into_inner().blog.unwrap_or_default();
        let id = blog.id.clone();

        let updated = self
            .update(&id, BlogItem::from(blog))
            .await
            .inspect_err(|e| record_failure("update_blog", e))?;

        tracing::debug!(%id, "updated blog");
        Ok(Response::new(BlogResponse {
            blog: Some(updated.into()),
        }))
    }

    #[tracing::instrument(skip_all, fields(id = %req.get_ref().id))]
    async fn delete_blog(
        &self,
        req: Request<DeleteBlogRequest>,
    ) -> Result<Response<DeleteBlogResponse>, Status> {
        increment_requests("delete_blog");

        let success = self
            .delete(&req.get_ref().id)
            .await
            .inspect_err(|e| record_failure("delete_blog", e))?;

        Ok(Response::new(DeleteBlogResponse { success }))
    }

    /// Streams every record in the collection.
    ///
    /// The cursor is opened here so that failing to open it is reported as
    /// the RPC's status. Draining happens on a spawned task which owns the
    /// cursor for its whole life; it stops on the first error or when the
    /// client disconnects.
    #[tracing::instrument(skip_all)]
    async fn list_blogs(
        &self,
        _req: Request<ListBlogsRequest>,
    ) -> Result<Response<Self::ListBlogsStream>, Status> {
        let start = std::time::Instant::now();
        increment_requests("list_blogs");

        let cursor = self
            .store
            .find_all()
            .await
            .inspect_err(|e| record_failure("list_blogs", e))?;

        increment_streams_inflight();
        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);

        let fut = async move {
            match feed_records(cursor, resp_tx).await {
                Ok(sent) => tracing::debug!(sent, "list stream completed"),
                Err(Error::RequestCancelled) => tracing::debug!("list stream client went away"),
                Err(e) => tracing::warn!("list stream terminated: {e}"),
            }
            decrement_streams_inflight();
            record_stream_duration(start.elapsed().as_millis() as f64);
        };
        tokio::spawn(fut.instrument(tracing::info_span!("streaming")));

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}
