use crate::types::{BrowseError, BrowseResult};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use reqwest::Url;
use std::path::Path;
use std::sync::Arc;

/// Object key for `name` under an optional prefix
pub fn object_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Split an `s3://bucket/prefix` location into bucket and prefix
pub fn parse_s3_location(location: &str) -> BrowseResult<(String, String)> {
    let url = Url::parse(location)
        .map_err(|e| BrowseError::Config(format!("Invalid staging location {}: {}", location, e)))?;
    if url.scheme() != "s3" {
        return Err(BrowseError::Config(format!(
            "Unsupported staging location scheme '{}' in {}",
            url.scheme(),
            location
        )));
    }
    let bucket = url
        .host_str()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| BrowseError::Config(format!("Staging location has no bucket: {}", location)))?;
    Ok((bucket.to_string(), url.path().trim_matches('/').to_string()))
}

/// S3 bucket client with a private current-thread runtime.
///
/// Credentials and region come from the standard `AWS_*` environment.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    runtime: tokio::runtime::Runtime,
}

impl ObjectStorage {
    pub fn new(bucket: &str) -> BrowseResult<Self> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| BrowseError::Storage(format!("Failed to create S3 client: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
            runtime,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write bytes to a key in the bucket
    pub fn put(&self, key: &str, data: Bytes) -> BrowseResult<()> {
        let location = ObjectPath::from(key);
        log::debug!("Writing {} bytes to s3://{}/{}", data.len(), self.bucket, key);

        self.runtime
            .block_on(self.store.put(&location, data))
            .map_err(|e| BrowseError::Storage(format!("Failed to write {}: {}", key, e)))?;
        Ok(())
    }

    /// Upload a local file under `prefix`, keyed by its file name
    pub fn upload_file(&self, path: &Path, prefix: &str) -> BrowseResult<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BrowseError::InvalidFormat(format!("Invalid file name: {}", path.display())))?;
        let key = object_key(prefix, name);

        log::info!("Uploading {} to s3://{}/{}", path.display(), self.bucket, key);
        let data = std::fs::read(path)?;
        self.put(&key, Bytes::from(data))?;
        Ok(key)
    }
}

/// Publishes a produced file where downstream consumers can fetch it
pub trait Stager {
    /// Stage `local` as `remote_name` under `location`, returning its URL
    fn stage(&self, local: &Path, remote_name: &str, mime: &str, location: &str) -> BrowseResult<String>;
}

/// Stager for `s3://bucket/prefix` locations
#[derive(Debug, Default, Clone, Copy)]
pub struct S3Stager;

impl Stager for S3Stager {
    fn stage(&self, local: &Path, remote_name: &str, mime: &str, location: &str) -> BrowseResult<String> {
        let (bucket, prefix) = parse_s3_location(location)?;
        let key = object_key(&prefix, remote_name);
        log::info!("Staging {} ({}) to s3://{}/{}", local.display(), mime, bucket, key);

        let storage = ObjectStorage::new(&bucket)?;
        let data = std::fs::read(local)?;
        storage.put(&key, Bytes::from(data))?;
        Ok(format!("s3://{}/{}", bucket, key))
    }
}
