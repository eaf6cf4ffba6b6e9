//! Filesystem photo store
//!
//! Layout under the photo folder:
//!
//! ```text
//! <folder>/<uuid>/<name>          live asset
//! <folder>/.trash/<uuid>/<name>   trashed asset
//! ```
//!
//! Links have the shape `<public_base_url>/photos/<uuid>/<name>`.

use super::{is_safe_name, BlobContent, BlobError, BlobStore, StoredBlob};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const TRASH_DIR: &str = ".trash";

pub struct FolderBlobStore {
    folder: PathBuf,
    url_prefix: String,
}

impl FolderBlobStore {
    /// `public_base_url` is where the HTTP gateway is reachable by kiosks
    pub fn new(folder: PathBuf, public_base_url: &str) -> Self {
        Self {
            folder,
            url_prefix: format!("{}/photos/", public_base_url.trim_end_matches('/')),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Create the photo folder if missing
    pub async fn ensure_folder(&self) -> Result<(), BlobError> {
        tokio::fs::create_dir_all(&self.folder).await?;
        Ok(())
    }

    /// Split a link into `(id, name)` if it has this store's shape
    fn parse_link<'a>(&self, url: &'a str) -> Option<(Uuid, &'a str)> {
        let rest = url.trim().strip_prefix(&self.url_prefix)?;
        let (id, name) = rest.split_once('/')?;
        let id = Uuid::parse_str(id).ok()?;
        is_safe_name(name).then_some((id, name))
    }

    fn asset_dir(&self, id: &Uuid) -> PathBuf {
        self.folder.join(id.to_string())
    }

    fn content_type_for(name: &str) -> String {
        mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

#[async_trait]
impl BlobStore for FolderBlobStore {
    fn owns(&self, url: &str) -> bool {
        self.parse_link(url).is_some()
    }

    async fn create(
        &self,
        name: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, BlobError> {
        if !is_safe_name(name) {
            return Err(BlobError::InvalidName(name.to_string()));
        }

        let id = Uuid::new_v4();
        let dir = self.asset_dir(&id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(name), bytes).await?;

        debug!(id = %id, name, size = bytes.len(), "Stored photo");
        Ok(StoredBlob {
            id: id.to_string(),
            url: format!("{}{}/{}", self.url_prefix, id, name),
        })
    }

    async fn trash(&self, url: &str) -> Result<(), BlobError> {
        let (id, _) = self
            .parse_link(url)
            .ok_or_else(|| BlobError::Foreign(url.to_string()))?;

        let source = self.asset_dir(&id);
        if !tokio::fs::try_exists(&source).await? {
            return Err(BlobError::NotFound(url.to_string()));
        }

        let trash = self.folder.join(TRASH_DIR);
        tokio::fs::create_dir_all(&trash).await?;
        tokio::fs::rename(&source, trash.join(id.to_string())).await?;
        Ok(())
    }

    async fn open(&self, id: &str, name: &str) -> Result<BlobContent, BlobError> {
        let uuid = Uuid::parse_str(id).map_err(|_| BlobError::NotFound(id.to_string()))?;
        if !is_safe_name(name) {
            return Err(BlobError::InvalidName(name.to_string()));
        }

        let path = self.asset_dir(&uuid).join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(BlobContent {
                content_type: Self::content_type_for(name),
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(format!("{}/{}", id, name)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
