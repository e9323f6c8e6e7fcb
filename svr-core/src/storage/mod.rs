/*!
Object-store client for bundle transfer.

This module defines the storage port and the S3 adapter behind it. The
trait keeps the bundle pipeline independent of the transport, so tests can
run against an in-memory store. All operations are async and awaited
sequentially by the command layer; there is no retry or timeout layer here
(callers wanting resilience add their own).
*/

pub mod s3;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// One object in a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: i64,
}

/// Storage abstraction for uploading, listing and downloading bundles.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under the given key, streaming from disk.
    async fn put_file(&self, key: &str, path: &Path) -> Result<()>;

    /// List objects under the given key prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// Download an object, streaming its body into `dest`.
    ///
    /// A failure on either end of the stream removes the partial file and
    /// propagates the error; a file that exists afterwards is complete.
    async fn get_to_file(&self, key: &str, dest: &Path) -> Result<()>;
}

/// Remote key for a bundle basename: `<prefix>/<basename>` when a prefix is
/// configured, bare `<basename>` otherwise.
pub fn remote_key(prefix: &str, basename: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    if prefix.is_empty() {
        basename.to_string()
    } else {
        format!("{prefix}/{basename}")
    }
}

pub use s3::S3ObjectStore;
