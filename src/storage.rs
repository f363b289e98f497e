//! The object-store client abstraction. The gateway delegates every storage
//! operation through [`ObjectStore`] and maps [`StoreError`] kinds onto HTTP
//! responses, so success and failure paths are visible in the signatures
//! rather than hidden in catch clauses.
//!
//! A "directory" is the usual object-store convention: a `/`-suffixed
//! zero-byte marker key, plus whatever keys share the prefix.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod memory;
pub mod s3;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The destination of a copy or move is already occupied.
    #[error("object {0} already exists")]
    AlreadyExists(String),
    /// The source object is absent.
    #[error("object {0} not found")]
    NotFound(String),
    /// Anything the backend reports that the gateway has no contract for.
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// True when `path` names an object, or a directory marker/prefix.
    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    async fn make_directory(&self, dir: &str) -> Result<(), StoreError>;

    /// Stores `data` at `path`, overwriting any previous object.
    async fn store(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Moves `src` to `dest`. Fails with [`StoreError::AlreadyExists`] when
    /// `dest` is occupied and [`StoreError::NotFound`] when `src` is absent;
    /// in both cases the source is left untouched.
    async fn move_object(&self, src: &str, dest: &str) -> Result<bool, StoreError>;

    /// Copies `src` to `dest`, with the same failure contract as
    /// [`ObjectStore::move_object`].
    async fn copy_object(&self, src: &str, dest: &str) -> Result<bool, StoreError>;

    /// Deletes one object. Returns whether the backend reported a deletion.
    async fn delete(&self, path: &str) -> Result<bool, StoreError>;

    /// Deletes every key under `dir`, marker included.
    async fn delete_directory(&self, dir: &str) -> Result<bool, StoreError>;

    /// Non-recursive listing of the object keys directly under `path`.
    async fn files(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Every object key in the bucket.
    async fn all_files(&self) -> Result<Vec<String>, StoreError>;

    /// Non-recursive listing of the directory prefixes directly under `path`.
    async fn directories(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Every directory prefix in the bucket.
    async fn all_directories(&self) -> Result<Vec<String>, StoreError>;

    /// Generates a time-limited presigned URL for a GET of `path`.
    async fn download_url(&self, path: &str, expires: Duration) -> Result<String, StoreError>;
}

/// Normalizes a listing path into a key prefix: empty stays empty, anything
/// else is trimmed of separators and given exactly one trailing `/`.
pub(crate) fn listing_prefix(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::listing_prefix;

    #[test]
    fn listing_prefix_normalizes_separators() {
        assert_eq!(listing_prefix(""), "");
        assert_eq!(listing_prefix("/"), "");
        assert_eq!(listing_prefix("docs"), "docs/");
        assert_eq!(listing_prefix("/docs/reports/"), "docs/reports/");
    }
}
