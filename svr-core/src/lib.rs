/*!
# svr Core Engine

Core library for the `svr` secret-file backup tool.

This crate provides the building blocks for snapshotting a project's
designated secret files into a compressed bundle and restoring the most
recent bundle from a remote object store:

- Per-project configuration record (`.svrc`) read/write
- Bundle builder and extractor (gzipped tar rooted at the project folder)
- Newest-bundle selection by the timestamp embedded in the object key
- Thin async object-store client (Amazon S3)

## Architecture

The object store is behind a trait port so the bundle pipeline can be
exercised against an in-memory store in tests. Everything else is plain
sequential code: each command invocation loads the configuration once,
runs to completion and exits.
*/

pub mod bundle;
pub mod config;
pub mod error;
pub mod select;
pub mod storage;

pub use bundle::{build_bundle, bundle_file_name, extract_bundle, staging_path};
pub use config::{ProjectConfig, RemoteConfig, CONFIG_FILE_NAME};
pub use error::{Result, SvrError};
pub use select::{newest_bundle, RemoteEntry};
pub use storage::{remote_key, ObjectEntry, ObjectStore, S3ObjectStore};
