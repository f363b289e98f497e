//! An in-process [`ObjectStore`] backed by a `BTreeMap`. Used by the
//! integration tests and handy for running the gateway without a bucket.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::{ObjectStore, StoreError, listing_prefix};

struct StoredObject {
    data: Bytes,
    content_type: String,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    url_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object directly, bypassing the trait.
    pub fn insert(&self, path: &str, data: impl Into<Bytes>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            path.trim_matches('/').to_string(),
            StoredObject {
                data: data.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(path.trim_matches('/'))
            .map(|o| o.data.clone())
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(path.trim_matches('/'))
            .map(|o| o.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Number of presigned-URL requests served so far.
    pub fn url_calls(&self) -> usize {
        self.url_calls.load(Ordering::SeqCst)
    }

    fn contains(map: &BTreeMap<String, StoredObject>, path: &str) -> bool {
        let key = path.trim_matches('/');
        if key.is_empty() {
            return false;
        }
        let prefix = format!("{key}/");
        map.contains_key(key) || map.keys().any(|k| k.starts_with(&prefix))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let objects = self.objects.lock().unwrap();
        Ok(Self::contains(&objects, path))
    }

    async fn make_directory(&self, dir: &str) -> Result<(), StoreError> {
        let marker = listing_prefix(dir);
        self.objects.lock().unwrap().insert(
            marker,
            StoredObject {
                data: Bytes::new(),
                content_type: String::new(),
            },
        );
        Ok(())
    }

    async fn store(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.objects.lock().unwrap().insert(
            path.trim_matches('/').to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn move_object(&self, src: &str, dest: &str) -> Result<bool, StoreError> {
        let mut objects = self.objects.lock().unwrap();
        if Self::contains(&objects, dest) {
            return Err(StoreError::AlreadyExists(dest.to_string()));
        }
        let src_key = src.trim_matches('/').to_string();
        let Some(object) = objects.remove(&src_key) else {
            return Err(StoreError::NotFound(src.to_string()));
        };
        objects.insert(dest.trim_matches('/').to_string(), object);
        Ok(true)
    }

    async fn copy_object(&self, src: &str, dest: &str) -> Result<bool, StoreError> {
        let mut objects = self.objects.lock().unwrap();
        if Self::contains(&objects, dest) {
            return Err(StoreError::AlreadyExists(dest.to_string()));
        }
        let Some(object) = objects.get(src.trim_matches('/')) else {
            return Err(StoreError::NotFound(src.to_string()));
        };
        let copy = StoredObject {
            data: object.data.clone(),
            content_type: object.content_type.clone(),
        };
        objects.insert(dest.trim_matches('/').to_string(), copy);
        Ok(true)
    }

    async fn delete(&self, path: &str) -> Result<bool, StoreError> {
        let removed = self.objects.lock().unwrap().remove(path.trim_matches('/'));
        Ok(removed.is_some())
    }

    async fn delete_directory(&self, dir: &str) -> Result<bool, StoreError> {
        let prefix = listing_prefix(dir);
        if prefix.is_empty() {
            return Ok(false);
        }
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|key, _| !key.starts_with(&prefix) && *key != prefix[..prefix.len() - 1]);
        Ok(true)
    }

    async fn files(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let prefix = listing_prefix(path);
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(&prefix) && !key.ends_with('/'))
            .filter(|key| !key[prefix.len()..].contains('/'))
            .cloned()
            .collect())
    }

    async fn all_files(&self) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|key| !key.ends_with('/'))
            .cloned()
            .collect())
    }

    async fn directories(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let prefix = listing_prefix(path);
        let objects = self.objects.lock().unwrap();
        let mut dirs = BTreeSet::new();
        for key in objects.keys().filter(|key| key.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            if let Some(i) = rest.find('/') {
                if i > 0 {
                    dirs.insert(format!("{prefix}{}", &rest[..i]));
                }
            }
        }
        Ok(dirs.into_iter().collect())
    }

    async fn all_directories(&self) -> Result<Vec<String>, StoreError> {
        let objects = self.objects.lock().unwrap();
        let mut dirs = BTreeSet::new();
        for key in objects.keys() {
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
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        let key = path.trim_matches('/');
        Ok(format!(
            "https://storage.invalid/{key}?expires={}",
            expires.as_secs()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn files_listing_is_non_recursive() {
        let store = MemoryStore::new();
        store.insert("docs/a.txt", "a", "text/plain");
        store.insert("docs/sub/b.txt", "b", "text/plain");
        store.insert("root.txt", "r", "text/plain");

        assert_eq!(store.files("docs").await.unwrap(), vec!["docs/a.txt"]);
        assert_eq!(store.files("").await.unwrap(), vec!["root.txt"]);
        assert_eq!(
            store.all_files().await.unwrap(),
            vec!["docs/a.txt", "docs/sub/b.txt", "root.txt"]
        );
    }

    #[tokio::test]
    async fn directories_come_from_prefixes_and_markers() {
        let store = MemoryStore::new();
        store.insert("docs/a.txt", "a", "text/plain");
        store.insert("docs/sub/b.txt", "b", "text/plain");
        store.make_directory("empty").await.unwrap();

        assert_eq!(store.directories("").await.unwrap(), vec!["docs", "empty"]);
        assert_eq!(store.directories("docs").await.unwrap(), vec!["docs/sub"]);
        assert_eq!(
            store.all_directories().await.unwrap(),
            vec!["docs", "docs/sub", "empty"]
        );
    }

    #[tokio::test]
    async fn move_refuses_occupied_destination() {
        let store = MemoryStore::new();
        store.insert("a.txt", "a", "text/plain");
        store.insert("b.txt", "b", "text/plain");

        let err = store.move_object("a.txt", "b.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert!(store.get("a.txt").is_some());

        assert!(matches!(
            store.move_object("missing.txt", "c.txt").await.unwrap_err(),
            StoreError::NotFound(_)
        ));

        assert!(store.move_object("a.txt", "c.txt").await.unwrap());
        assert!(store.get("a.txt").is_none());
        assert!(store.get("c.txt").is_some());
    }

    #[tokio::test]
    async fn delete_directory_removes_marker_and_children() {
        let store = MemoryStore::new();
        store.make_directory("logs").await.unwrap();
        store.insert("logs/a.txt", "a", "text/plain");
        store.insert("logs/sub/b.txt", "b", "text/plain");
        store.insert("keep.txt", "k", "text/plain");

        assert!(store.delete_directory("logs").await.unwrap());
        assert_eq!(store.keys(), vec!["keep.txt"]);
    }
}
