//! Server-streaming support for `ListBlogs`.
//!
//! - [`pump`] - Drains a collection cursor into a bounded response channel.

pub mod pump;
