use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Bucket-style object storage. Keys are `/`-separated relative paths.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores the object and returns its public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Maps a public URL produced by `put` back to its key.
    fn key_for_url(&self, url: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: Url,
}

pub const PUBLIC_PREFIX: &str = "storage/";

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: Url) -> Self {
        Self {
            root: root.into(),
            public_base,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(Error::BadRequest(format!("Invalid object key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &data).await.map_err(|e| {
            tracing::error!(key, error = %e, "failed to write object");
            Error::Internal(format!("Failed to save file: {}", e))
        })?;

        let url = self
            .public_base
            .join(&format!("{}{}", PUBLIC_PREFIX, key))
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let prefix = self.public_base.join(PUBLIC_PREFIX).ok()?;
        url.strip_prefix(prefix.as_str()).map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
        }
    }

    /// Detects the format from the file signature; declared types are not trusted.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct AvatarService {
    store: Arc<dyn ObjectStore>,
    max_bytes: usize,
}

impl AvatarService {
    pub fn new(store: Arc<dyn ObjectStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    pub fn avatar_key(cv_id: Uuid, data: &[u8], kind: ImageKind) -> String {
        let digest = hex::encode(Sha256::digest(data));
        format!("avatars/{}/{}.{}", cv_id, digest, kind.extension())
    }

    pub async fn upload(&self, cv_id: Uuid, data: Bytes) -> Result<String> {
        if data.is_empty() {
            return Err(Error::BadRequest("Avatar file is empty".into()));
        }
        if data.len() > self.max_bytes {
            return Err(Error::BadRequest(format!(
                "Avatar exceeds {} bytes",
                self.max_bytes
            )));
        }
        let kind = ImageKind::sniff(&data).ok_or_else(|| {
            Error::BadRequest("Unsupported image format, accepted: jpeg, png, webp".into())
        })?;

        let key = Self::avatar_key(cv_id, &data, kind);
        let url = self.store.put(&key, data, kind.content_type()).await?;
        tracing::info!(cv_id = %cv_id, key = %key, "avatar stored");
        Ok(url)
    }

    /// Best effort: a missing object is not an error.
    pub async fn remove(&self, avatar_url: &str) -> Result<()> {
        match self.store.key_for_url(avatar_url) {
            Some(key) => self.store.remove(&key).await,
            None => {
                tracing::warn!(avatar_url, "avatar url not owned by this store");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn sniff_recognises_supported_formats() {
        assert_eq!(ImageKind::sniff(&PNG), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"%PDF-1.7"), None);
        assert_eq!(ImageKind::sniff(b"GIF89a"), None);
    }

    #[test]
    fn avatar_key_is_content_addressed() {
        let cv_id = Uuid::new_v4();
        let a = AvatarService::avatar_key(cv_id, &PNG, ImageKind::Png);
        let b = AvatarService::avatar_key(cv_id, &PNG, ImageKind::Png);
        assert_eq!(a, b);
        assert!(a.starts_with(&format!("avatars/{}/", cv_id)));
        assert!(a.ends_with(".png"));
    }

    #[tokio::test]
    async fn upload_stores_sniffed_image() {
        let cv_id = Uuid::new_v4();
        let expected_key = AvatarService::avatar_key(cv_id, &PNG, ImageKind::Png);

        let mut store = MockObjectStore::new();
        store
            .expect_put()
            .withf({
                let expected_key = expected_key.clone();
                move |key, _, content_type| {
                    key.to_string() == expected_key && content_type.to_string() == "image/png"
                }
            })
            .times(1)
            .returning(|key, _, _| Ok(format!("http://cdn.test/storage/{}", key)));

        let service = AvatarService::new(Arc::new(store), 1024);
        let url = service.upload(cv_id, Bytes::from_static(&PNG)).await.unwrap();
        assert_eq!(url, format!("http://cdn.test/storage/{}", expected_key));
    }

    #[tokio::test]
    async fn upload_rejects_oversized_and_unknown_files() {
        let mut store = MockObjectStore::new();
        store.expect_put().never();
        let service = AvatarService::new(Arc::new(store), 8);

        let too_big = service.upload(Uuid::new_v4(), Bytes::from_static(&PNG)).await;
        assert!(matches!(too_big, Err(Error::BadRequest(_))));

        let not_image = service
            .upload(Uuid::new_v4(), Bytes::from_static(b"hello"))
            .await;
        assert!(matches!(not_image, Err(Error::BadRequest(_))));
    }

    #[test]
    fn local_store_round_trips_files() {
        let root = std::env::temp_dir().join(format!("cona-store-{}", Uuid::new_v4()));
        let base = Url::parse("http://localhost:8080/").unwrap();
        let store = LocalObjectStore::new(&root, base);

        tokio_test::block_on(async {
            let url = store
                .put("avatars/a/b.png", Bytes::from_static(&PNG), "image/png")
                .await
                .unwrap();
            assert_eq!(url, "http://localhost:8080/storage/avatars/a/b.png");
            assert!(root.join("avatars/a/b.png").exists());

            let key = store.key_for_url(&url).unwrap();
            assert_eq!(key, "avatars/a/b.png");
            store.remove(&key).await.unwrap();
            assert!(!root.join("avatars/a/b.png").exists());
            // Removing twice is fine.
            store.remove(&key).await.unwrap();
        });

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn local_store_rejects_escaping_keys() {
        let store = LocalObjectStore::new("/tmp/x", Url::parse("http://localhost/").unwrap());
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("/abs").is_err());
        assert!(store.resolve("").is_err());
    }
}
