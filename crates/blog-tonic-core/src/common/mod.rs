//! Shared types and error definitions used by the blog server and its
//! clients.
//!
//! - [`error`] - Unified service error and its `tonic::Status` mapping.
//! - [`types`] - The persisted record shape and the identifier codec.

pub mod error;
pub mod types;

pub use error::{Error, Result};
