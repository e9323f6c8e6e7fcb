/*!
Amazon S3 object-store adapter.

Unlike the usual AWS credential chain, the client is built from the static
credentials carried in the project's configuration record, since that is
where this tool keeps its remote connection. `AWS_ENDPOINT_URL` is still
honored by the SDK config loader, which keeps LocalStack-style testing
possible without code changes.
*/

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use super::{ObjectEntry, ObjectStore};
use crate::config::RemoteConfig;
use crate::{Result, SvrError};

/// S3-backed object store scoped to a single bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the configuration record's region and credentials.
    pub async fn connect(remote: &RemoteConfig) -> Result<Self> {
        remote.check()?;

        let credentials = Credentials::new(
            remote.access_key_id.clone(),
            remote.secret_access_key.clone(),
            None,
            None,
            "svrc",
        );
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(remote.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;
        let client = S3Client::new(&sdk_config);

        info!(bucket = %remote.bucket, region = %remote.region, "Initialized S3 object store");

        Ok(Self {
            client,
            bucket: remote.bucket.clone(),
        })
    }

    /// The bucket this store is scoped to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, key: &str, path: &Path) -> Result<()> {
        info!(bucket = %self.bucket, key = %key, file = %path.display(), "Uploading bundle");

        let body = ByteStream::from_path(path).await.map_err(|e| {
            SvrError::upload(format!("failed to open {} for upload: {e}", path.display()))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let msg = describe_s3_error("put_object", e, key);
                error!(bucket = %self.bucket, key = %key, error = %msg, "Upload failed");
                SvrError::upload(msg)
            })?;

        debug!(bucket = %self.bucket, key = %key, "Upload complete");
        Ok(())
    }

    /// List every object under the prefix, following the SDK paginator so
    /// namespaces with more than one page of bundles are seen in full.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        debug!(bucket = %self.bucket, prefix = %prefix, "Listing remote bundles");

        let mut entries = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let output = page.map_err(|e| {
                let msg = describe_s3_error("list_objects_v2", e, prefix);
                error!(bucket = %self.bucket, prefix = %prefix, error = %msg, "Listing failed");
                SvrError::storage(msg)
            })?;

            for object in output.contents() {
                if let Some(key) = object.key() {
                    entries.push(ObjectEntry {
                        key: key.to_string(),
                        size: object.size().unwrap_or(0),
                    });
                }
            }
        }

        debug!(bucket = %self.bucket, prefix = %prefix, count = entries.len(), "Listing complete");
        Ok(entries)
    }

    async fn get_to_file(&self, key: &str, dest: &Path) -> Result<()> {
        info!(bucket = %self.bucket, key = %key, dest = %dest.display(), "Downloading bundle");

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = describe_s3_error("get_object", e, key);
                error!(bucket = %self.bucket, key = %key, error = %msg, "Download failed");
                SvrError::download(msg)
            })?;

        match stream_body_to_file(output.body, dest).await {
            Ok(()) => {
                debug!(bucket = %self.bucket, key = %key, "Download complete");
                Ok(())
            }
            Err(e) => {
                // A half-written archive must not look like a finished one.
                let _ = tokio::fs::remove_file(dest).await;
                error!(bucket = %self.bucket, key = %key, error = %e, "Download failed");
                Err(e)
            }
        }
    }
}

async fn stream_body_to_file(mut body: ByteStream, dest: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
        SvrError::download(format!("failed to create {}: {e}", dest.display()))
    })?;

    while let Some(chunk) = body
        .try_next()
        .await
        .map_err(|e| SvrError::download(format!("failed to read object stream: {e}")))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| SvrError::download(format!("failed to write {}: {e}", dest.display())))?;
    }

    file.flush()
        .await
        .map_err(|e| SvrError::download(format!("failed to flush {}: {e}", dest.display())))?;
    Ok(())
}

/// Fold AWS SDK error metadata into one human-readable line.
fn describe_s3_error<E>(op: &str, error: SdkError<E>, key: &str) -> String
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    match &error {
        SdkError::DispatchFailure(dispatch_err) => {
            format!("S3 {op} request failed to dispatch: {dispatch_err:?}")
        }
        SdkError::TimeoutError(_) => {
            format!("S3 {op} request timed out (key: {key})")
        }
        SdkError::ResponseError(response_err) => {
            format!("S3 {op} response error: {response_err:?}")
        }
        SdkError::ServiceError(service_err) => match service_err.err().code() {
            Some("NoSuchBucket") => "S3 bucket not found".to_string(),
            Some("NoSuchKey") => format!("S3 object '{key}' not found"),
            Some("AccessDenied") | Some("Forbidden") => {
                "access denied to S3 (check credentials and permissions)".to_string()
            }
            Some("InvalidBucketName") => "invalid S3 bucket name".to_string(),
            Some(code) => format!(
                "S3 service error ({code}): {}",
                service_err.err().message().unwrap_or("unknown error")
            ),
            None => format!("S3 {op} service error: {service_err:?}"),
        },
        _ => format!("S3 {op} error: {error}"),
    }
}
