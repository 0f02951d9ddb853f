//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, MinIO and others.
//!
//! # Credentials
//!
//! Credentials are read from the standard `AWS_ACCESS_KEY_ID` /
//! `AWS_SECRET_ACCESS_KEY` environment variables. A one-shot batch tool
//! doesn't warrant a credential-provider chain or a config file.
//!
//! # Access
//!
//! Every uploaded object gets a public-read ACL and a content type sniffed
//! from its first bytes, because the gallery pages are served straight out
//! of the bucket to anonymous visitors.

use crate::StorageBackend;
use crate::backend::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::DisplayErrorContext,
    primitives::{ByteStream, DateTime},
    types::{Object, ObjectCannedAcl},
};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Upper bound on concurrent S3 requests from one backend instance.
///
/// The pipeline already limits in-flight file work, but thumbnails and
/// manifest updates can stack extra requests on top of that.
const DEFAULT_CONCURRENT_REQUESTS: usize = 32;

/// S3-compatible storage backend.
///
/// Stores gallery objects in a bucket, keyed by the date-folder layout
/// (`<year>/<year>-<month>-<day>/<file>`).
///
/// # Supported Services
///
/// - AWS S3
/// - Backblaze B2 (via S3-compatible API)
/// - MinIO
/// - Other S3-compatible services via `endpoint`
///
/// # Examples
///
/// ```no_run
/// use shoebox_storage::backend::S3Backend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::from_env(
///     "gallery",
///     "my-photo-bucket",
///     "us-east-1",
///     None::<String>,
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend with credentials from the environment.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region or provider-specific region string
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    pub fn from_env(
        name: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
    ) -> Result<Self> {
        let key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .or_raise(|| ErrorKind::BackendError("AWS_ACCESS_KEY_ID is not set".to_string()))?;
        let key_secret = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_raise(|| ErrorKind::BackendError("AWS_SECRET_ACCESS_KEY is not set".to_string()))?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "shoebox-env");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Retry transient failures with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Ok(Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Validate a relative key and convert it to the string form S3 wants.
    fn key(&self, path: &Path) -> Result<String> {
        let validated = validate_path(path)?;
        match validated.to_str() {
            Some(key) => Ok(key.to_string()),
            None => exn::bail!(ErrorKind::InvalidPath(validated)),
        }
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> OwnedSemaphorePermit {
        // unwrap is safe: semaphore is never closed
        self.rate_limiter.clone().acquire_owned().await.unwrap()
    }

    /// Convert AWS DateTime to OffsetDateTime.
    fn timestamp(dt: &DateTime) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .or_raise(|| ErrorKind::BackendError("S3 datetime out of range".to_string()))
    }

    fn object_info(object: &Object) -> Result<FileInfo> {
        let key = object
            .key()
            .ok_or_raise(|| ErrorKind::BackendError("listing returned an object without a key".to_string()))?;
        let path = validate_path(key)?;
        let size = u64::try_from(object.size().unwrap_or_default()).unwrap_or_default();
        let modified = match object.last_modified() {
            Some(dt) => Self::timestamp(dt)?,
            None => OffsetDateTime::UNIX_EPOCH,
        };
        Ok(FileInfo::new(path, size, modified))
    }
}

/// Content type for an upload, sniffed from the buffer's magic bytes.
fn sniff_content_type(data: &[u8]) -> String {
    infer::get(data).map(|t| t.mime_type().to_string()).unwrap_or_else(|| "application/octet-stream".to_string())
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        // S3 prefixes are plain string prefixes. Terminate with a slash so
        // `2021/2021-03-05` does not also match `2021/2021-03-05-extra`,
        // keeping the semantics component-based like the other backends.
        let string_prefix = match &validated_prefix {
            Some(pfx) => match pfx.to_str() {
                Some(s) => Some(format!("{}/", s.trim_end_matches('/'))),
                None => {
                    let invalid = pfx.clone();
                    return Box::pin(futures::stream::once(async move {
                        Err(exn::Exn::from(ErrorKind::InvalidPath(invalid)))
                    }));
                },
            },
            None => None,
        };

        Box::pin(stream! {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(pfx) = &string_prefix {
                request = request.prefix(pfx);
            }
            let _permit = self.acquire_permit().await;
            let mut pages = request.into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(exn::Exn::from(ErrorKind::Network(DisplayErrorContext(&e).to_string())));
                        return;
                    },
                };
                for object in page.contents() {
                    yield Self::object_info(object);
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let key = self.key(path)?;
        let _permit = self.acquire_permit().await;
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|svc| svc.is_not_found()) => Ok(false),
            Err(e) => exn::bail!(ErrorKind::Network(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = self.key(path)?;
        let _permit = self.acquire_permit().await;
        match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(response) => {
                let data = response
                    .body
                    .collect()
                    .await
                    .or_raise(|| ErrorKind::Network(format!("interrupted body while fetching {key}")))?;
                Ok(data.into_bytes().to_vec())
            },
            // "No such key" is the caller's absent signal, everything else
            // is a genuine failure.
            Err(e) if e.as_service_error().is_some_and(|svc| svc.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            Err(e) => exn::bail!(ErrorKind::Network(DisplayErrorContext(&e).to_string())),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let key = self.key(path)?;
        let content_type = sniff_content_type(data);
        let _permit = self.acquire_permit().await;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            // Anonymous visitors read the gallery straight from the bucket.
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| ErrorKind::Network(DisplayErrorContext(&e).to_string()))?;
        tracing::debug!(key = %key, bytes = data.len(), bucket = %self.bucket, "PutObject");
        Ok(())
    }
}
