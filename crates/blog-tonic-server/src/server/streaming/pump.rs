use crate::server::{
    store::DocumentCursor,
    telemetry::{increment_blogs_streamed, increment_errors},
};
use blog_tonic_core::{
    Error,
    proto::{Blog, ListBlogsResponse},
    types::BlogItem,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tonic::Status;

/// Drains a collection cursor into the response channel of a `ListBlogs`
/// stream.
///
/// Documents are decoded and forwarded one at a time, so at most the
/// channel's capacity is buffered between the cursor and the client.
///
/// # Behavior
///
/// - A document that does not decode as a [`BlogItem`] sends
///   [`Error::CorruptRecord`] (`UNAVAILABLE`) and stops the stream.
/// - A cursor error sends [`Error::StorageFailure`] (`INTERNAL`) and stops
///   the stream.
/// - If the client has gone away the pump stops with
///   [`Error::RequestCancelled`].
///
/// Records already forwarded are never retracted. On every exit path the
/// cursor is dropped before `resp_tx`, so a receiver that has seen the end of
/// the stream knows the cursor is released.
///
/// Returns the number of records forwarded.
pub async fn feed_records(
    cursor: DocumentCursor,
    resp_tx: mpsc::Sender<Result<ListBlogsResponse, Status>>,
) -> blog_tonic_core::Result<usize> {
    // Locals drop before parameters: the cursor goes before the channel.
    let mut cursor = cursor;
    let mut sent = 0;

    while let Some(next) = cursor.next().await {
        let decoded = next.and_then(|document| {
            BlogItem::from_document(document).map_err(|e| Error::CorruptRecord {
                context: e.to_string(),
            })
        });

        let item = match decoded {
            Ok(item) => item,
            Err(e) => {
                increment_errors("list_blogs");
                // Best effort; the client may already be gone.
                if let Err(send_err) = resp_tx.send(Err(e.clone().into())).await {
                    tracing::debug!("Failed to forward err: {send_err}");
                }
                return Err(e);
            }
        };

        let response = ListBlogsResponse {
            blog: Some(Blog::from(item)),
        };
        if resp_tx.send(Ok(response)).await.is_err() {
            return Err(Error::RequestCancelled);
        }
        sent += 1;
        increment_blogs_streamed();
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Document, doc, oid::ObjectId};
    use futures::stream;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };
    use tonic::Code;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn cursor_of(
        items: Vec<blog_tonic_core::Result<Document>>,
        released: Arc<AtomicBool>,
    ) -> DocumentCursor {
        let flag = DropFlag(released);
        stream::iter(items)
            .map(move |item| {
                let _held = &flag;
                item
            })
            .boxed()
    }

    fn blog(title: &str) -> Document {
        doc! { "_id": ObjectId::new(), "author_id": "a", "title": title, "content": "c" }
    }

    #[tokio::test]
    async fn cursor_error_sends_internal_and_stops() {
        let released = Arc::new(AtomicBool::new(false));
        let cursor = cursor_of(
            vec![
                Ok(blog("one")),
                Err(Error::storage("cursor error: node is recovering")),
                Ok(blog("never")),
            ],
            Arc::clone(&released),
        );
        let (tx, mut rx) = mpsc::channel(4);

        let result = feed_records(cursor, tx).await;
        assert!(matches!(result, Err(Error::StorageFailure { .. })));
        assert!(released.load(Ordering::SeqCst));

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.blog.unwrap().title, "one");
        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.code(), Code::Internal);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn stops_when_client_disconnects() {
        let released = Arc::new(AtomicBool::new(false));
        let cursor = cursor_of(
            vec![Ok(blog("one")), Ok(blog("two"))],
            Arc::clone(&released),
        );
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = feed_records(cursor, tx).await;
        assert_eq!(result, Err(Error::RequestCancelled));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_cursor_completes_without_records() {
        let released = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::channel(1);

        let sent = feed_records(cursor_of(vec![], Arc::clone(&released)), tx)
            .await
            .unwrap();
        assert_eq!(sent, 0);
        assert!(rx.recv().await.is_none());
        assert!(released.load(Ordering::SeqCst));
    }
}
