//! The S3-backed [`ObjectStore`]. One gateway request maps onto one SDK call,
//! plus the existence pre-checks the move/copy contract requires.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;
use std::collections::BTreeSet;

use crate::storage::{ObjectStore, StoreError, listing_prefix};

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Builds a client from the ambient AWS environment (credentials, region,
    /// endpoint overrides).
    pub async fn new(bucket: impl Into<String>) -> Self {
        let region = RegionProviderChain::default_provider().or_else("us-east-1");
        let cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;
        Self {
            client: Client::new(&cfg),
            bucket: bucket.into(),
        }
    }

    async fn head(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service = err.into_service_error();
                if service.is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::Backend(service.to_string()))
                }
            }
        }
    }

    /// Collects keys under `prefix`, following continuation tokens.
    /// `delimiter` limits the walk to one level and surfaces common prefixes.
    async fn list_keys(
        &self,
        prefix: &str,
        delimiter: bool,
    ) -> Result<(Vec<String>, Vec<String>), StoreError> {
        let mut keys = Vec::new();
        let mut prefixes = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if delimiter {
                req = req.delimiter("/");
            }
            if let Some(token) = continuation {
                req = req.continuation_token(token);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|o| o.key())
                    .map(String::from),
            );
            prefixes.extend(
                resp.common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix())
                    .map(String::from),
            );

            continuation = resp.next_continuation_token().map(String::from);
            if continuation.is_none() {
                break;
            }
        }

        Ok((keys, prefixes))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let key = path.trim_matches('/');
        if key.is_empty() {
            return Ok(false);
        }
        if self.head(key).await? {
            return Ok(true);
        }
        // Fall back to the directory convention: a marker object or any key
        // under the prefix counts as existing.
        let prefix = format!("{key}/");
        let resp = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(resp.key_count().unwrap_or(0) > 0)
    }

    async fn make_directory(&self, dir: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(listing_prefix(dir))
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn store(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path.trim_matches('/'))
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn move_object(&self, src: &str, dest: &str) -> Result<bool, StoreError> {
        self.copy_object(src, dest).await?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(src.trim_matches('/'))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn copy_object(&self, src: &str, dest: &str) -> Result<bool, StoreError> {
        if self.exists(dest).await? {
            return Err(StoreError::AlreadyExists(dest.to_string()));
        }
        if !self.exists(src).await? {
            return Err(StoreError::NotFound(src.to_string()));
        }
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src.trim_matches('/')))
            .key(dest.trim_matches('/'))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn delete(&self, path: &str) -> Result<bool, StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path.trim_matches('/'))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn delete_directory(&self, dir: &str) -> Result<bool, StoreError> {
        let prefix = listing_prefix(dir);
        if prefix.is_empty() {
            return Ok(false);
        }

        let (keys, _) = self.list_keys(&prefix, false).await?;
        // Batches arrive one listing page at a time, within the 1000-key
        // DeleteObjects limit.
        for chunk in keys.chunks(1000) {
            let objects = chunk
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| StoreError::Backend(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(true)
    }

    async fn files(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let prefix = listing_prefix(path);
        let (keys, _) = self.list_keys(&prefix, true).await?;
        Ok(keys.into_iter().filter(|k| !k.ends_with('/')).collect())
    }

    async fn all_files(&self) -> Result<Vec<String>, StoreError> {
        let (keys, _) = self.list_keys("", false).await?;
        Ok(keys.into_iter().filter(|k| !k.ends_with('/')).collect())
    }

    async fn directories(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let prefix = listing_prefix(path);
        let (_, prefixes) = self.list_keys(&prefix, true).await?;
        Ok(prefixes
            .into_iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .collect())
    }

    async fn all_directories(&self) -> Result<Vec<String>, StoreError> {
        let (keys, _) = self.list_keys("", false).await?;
        let mut dirs = BTreeSet::new();
        for key in keys {
            let mut from = 0;
            while let Some(i) = key[from..].find('/') {
                let end = from + i;
                if end > 0 {
                    dirs.insert(key[..end].to_string());
                }
                from = end + 1;
            }
        }
        Ok(dirs.into_iter().collect())
    }

    async fn download_url(&self, path: &str, expires: Duration) -> Result<String, StoreError> {
        let presign = PresigningConfig::expires_in(expires)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path.trim_matches('/'))
            .presigned(presign)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
