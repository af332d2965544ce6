//! gRPC service implementation for blog records.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`BlogRecordService`).

pub mod handler;
