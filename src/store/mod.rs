//! Object store backends.
//!
//! [`backend::ObjectStore`] is the contract; `s3` talks to a real
//! S3-compatible endpoint, `memory` keeps everything in process.

pub mod backend;
pub mod memory;
pub mod s3;
