//! # Blog Record Types
//!
//! [`BlogItem`] is the shape of a document in the `blog` collection, and the
//! functions here translate between it, raw BSON and the protobuf
//! [`Blog`](crate::proto::Blog) message.
//!
//! ## Identifiers
//!
//! Records are keyed by the storage layer's native [`ObjectId`]. On the wire
//! the id is its 24 character lowercase hex encoding. [`parse_object_id`] is
//! the only inbound translation; anything it rejects is a caller error
//! ([`Error::InvalidInput`]) and never reaches the collection.

use crate::{Error, Result, proto::Blog};
use bson::{Document, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A blog record as persisted in the collection.
///
/// `id` is `None` until the storage layer assigns one on insertion; it is
/// skipped on serialization so the insert does not send a null `_id`.
///
/// Absent string fields decode as empty. Only a field of the wrong BSON type
/// makes a document undecodable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogItem {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl BlogItem {
    /// Builds a record that has not been persisted yet.
    pub fn new(
        author_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            author_id: author_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Decodes a raw collection document.
    pub fn from_document(document: Document) -> core::result::Result<Self, bson::de::Error> {
        bson::from_document(document)
    }

    /// Encodes the record for insertion.
    pub fn to_document(&self) -> core::result::Result<Document, bson::ser::Error> {
        bson::to_document(self)
    }

    /// The mutable fields as a `$set` payload. `_id` is never part of it.
    pub fn fields(&self) -> Document {
        doc! {
            "author_id": self.author_id.as_str(),
            "title": self.title.as_str(),
            "content": self.content.as_str(),
        }
    }
}

/// Parses the external hex identifier into an [`ObjectId`].
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] with the parse error when `hex` is not
/// exactly 24 hex digits.
pub fn parse_object_id(hex: &str) -> Result<ObjectId> {
    ObjectId::parse_str(hex).map_err(|e| Error::InvalidInput {
        reason: format!("could not convert {hex:?} to an ObjectId: {e}"),
    })
}

impl From<BlogItem> for Blog {
    fn from(item: BlogItem) -> Self {
        Self {
            id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
            author_id: item.author_id,
            title: item.title,
            content: item.content,
        }
    }
}

/// Takes the mutable fields from the wire message. The wire `id` is not
/// trusted here; callers that need it go through [`parse_object_id`].
impl From<Blog> for BlogItem {
    fn from(blog: Blog) -> Self {
        Self::new(blog.author_id, blog.title, blog.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    #[test]
    fn hex_round_trips_through_object_id() {
        let fresh = ObjectId::new().to_hex();
        for hex in [
            "000000000000000000000000",
            "5f1d7a3b9c2e4d6f8a0b1c2d",
            "ffffffffffffffffffffffff",
            fresh.as_str(),
        ] {
            let id = parse_object_id(hex).unwrap();
            assert_eq!(id.to_hex(), hex);
        }
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for bad in [
            "",
            "not-an-id",
            "5f1d7a3b9c2e4d6f8a0b1c2",   // 23 digits
            "5f1d7a3b9c2e4d6f8a0b1c2d0", // 25 digits
            "zz1d7a3b9c2e4d6f8a0b1c2d",
            " 5f1d7a3b9c2e4d6f8a0b1c2d",
        ] {
            let err = parse_object_id(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidInput { .. }), "{bad:?}");
        }
    }

    #[test]
    fn new_record_serializes_without_id() {
        let doc = BlogItem::new("a1", "T", "C").to_document().unwrap();
        assert!(!doc.contains_key("_id"));
        assert_eq!(doc.get_str("author_id").unwrap(), "a1");
        assert_eq!(doc.get_str("title").unwrap(), "T");
        assert_eq!(doc.get_str("content").unwrap(), "C");
    }

    #[test]
    fn decodes_stored_document() {
        let id = ObjectId::new();
        let item = BlogItem::from_document(doc! {
            "_id": id,
            "author_id": "a1",
            "title": "T",
            "content": "C",
        })
        .unwrap();

        assert_eq!(item.id, Some(id));
        assert_eq!(item, BlogItem { id: Some(id), ..BlogItem::new("a1", "T", "C") });
    }

    #[test]
    fn decode_fails_on_wrong_shape() {
        let err = BlogItem::from_document(doc! { "_id": ObjectId::new(), "title": 7 });
        assert!(err.is_err());
    }

    #[test]
    fn absent_fields_decode_as_empty() {
        let id = ObjectId::new();
        let item = BlogItem::from_document(doc! {
            "_id": id,
            "author_id": "a1",
            "title": "T",
        })
        .unwrap();

        assert_eq!(item.content, "");
        assert_eq!(item, BlogItem { id: Some(id), ..BlogItem::new("a1", "T", "") });

        let bare = BlogItem::from_document(doc! { "_id": id }).unwrap();
        assert_eq!(bare, BlogItem { id: Some(id), ..BlogItem::new("", "", "") });
    }

    #[test]
    fn fields_exclude_identifier() {
        let mut item = BlogItem::new("a2", "T2", "C2");
        item.id = Some(ObjectId::new());
        let fields = item.fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("title"), Some(&Bson::String("T2".into())));
    }

    #[test]
    fn converts_to_wire_message() {
        let id = ObjectId::new();
        let blog = Blog::from(BlogItem {
            id: Some(id),
            ..BlogItem::new("a1", "T", "C")
        });
        assert_eq!(blog.id, id.to_hex());
        assert_eq!(blog.author_id, "a1");

        assert!(Blog::from(BlogItem::new("a1", "T", "C")).id.is_empty());
    }
}
