//! Error types for the blog record service.
//!
//! This module defines the central `Error` enum, a closed set of the failure
//! causes a request handler can report. It implements `From<Error>` for
//! `tonic::Status` so handlers can propagate with `?` and the mapping onto
//! gRPC status codes lives in exactly one place.
//!
//! ## Error Cases
//! - `InvalidInput`: The caller supplied an identifier that does not parse.
//! - `NotFound`: No document matched, or the matched document did not decode.
//! - `StorageFailure`: The collection rejected an insert, delete or cursor
//!   read.
//! - `CorruptRecord`: A document streamed by `ListBlogs` did not decode.
//! - `RequestCancelled`: The client went away while a stream was in flight.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the blog record service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The request carried a malformed identifier.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// No document matches the request.
    #[error("Not found: {context}")]
    NotFound { context: String },

    /// The storage layer failed; `context` carries the driver's cause.
    #[error("Storage failure: {context}")]
    StorageFailure { context: String },

    /// A document in the collection does not have the blog shape.
    #[error("Corrupt record: {context}")]
    CorruptRecord { context: String },

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,
}

impl Error {
    pub fn storage(context: impl core::fmt::Display) -> Self {
        Self::StorageFailure {
            context: context.to_string(),
        }
    }

    pub fn not_found(context: impl core::fmt::Display) -> Self {
        Self::NotFound {
            context: context.to_string(),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput { reason } => Status::invalid_argument(reason),
            Error::NotFound { context } => Status::not_found(context),
            Error::StorageFailure { context } => {
                Status::internal(format!("Internal error: {context}"))
            }
            Error::CorruptRecord { context } => {
                Status::unavailable(format!("Could not decode data: {context}"))
            }
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
        }
    }
}
