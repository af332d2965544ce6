#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

/// gRPC service and message definitions generated from `proto/blog.proto`.
///
/// ## Service
///
/// - [`BlogService`](proto::blog_service_server::BlogService) - create, read,
///   update and delete single records, plus a server-streaming `ListBlogs`.
///
/// Identifiers travel as 24 character lowercase hex strings; see
/// [`types::parse_object_id`] for the inbound translation.
pub mod proto {
    tonic::include_proto!("blog");

    /// Encoded descriptor set for gRPC server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("blog_descriptor");
}
