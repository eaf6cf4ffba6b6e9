//! In-process photo store
//!
//! Clones share the same assets, so a test can keep a handle and inspect the
//! live and trashed sets.

use super::{is_safe_name, BlobContent, BlobError, BlobStore, StoredBlob};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const URL_PREFIX: &str = "memory://photos/";

#[derive(Debug, Clone)]
pub struct MemoryBlob {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct State {
    live: BTreeMap<String, MemoryBlob>,
    trashed: Vec<MemoryBlob>,
}

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<RwLock<State>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn live(&self) -> Vec<MemoryBlob> {
        self.state.read().await.live.values().cloned().collect()
    }

    pub async fn trashed(&self) -> Vec<MemoryBlob> {
        self.state.read().await.trashed.clone()
    }

    fn parse_link(url: &str) -> Option<(&str, &str)> {
        let rest = url.trim().strip_prefix(URL_PREFIX)?;
        let (id, name) = rest.split_once('/')?;
        Uuid::parse_str(id).ok()?;
        Some((id, name))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn owns(&self, url: &str) -> bool {
        Self::parse_link(url).is_some()
    }

    async fn create(
        &self,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, BlobError> {
        if !is_safe_name(name) {
            return Err(BlobError::InvalidName(name.to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let url = format!("{}{}/{}", URL_PREFIX, id, name);
        self.state.write().await.live.insert(
            id.clone(),
            MemoryBlob {
                id: id.clone(),
                name: name.to_string(),
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(StoredBlob { id, url })
    }

    async fn trash(&self, url: &str) -> Result<(), BlobError> {
        let (id, _) = Self::parse_link(url).ok_or_else(|| BlobError::Foreign(url.to_string()))?;
        let mut state = self.state.write().await;
        let blob = state
            .live
            .remove(id)
            .ok_or_else(|| BlobError::NotFound(url.to_string()))?;
        state.trashed.push(blob);
        Ok(())
    }

    async fn open(&self, id: &str, name: &str) -> Result<BlobContent, BlobError> {
        let state = self.state.read().await;
        match state.live.get(id) {
            Some(blob) if blob.name == name => Ok(BlobContent {
                content_type: blob.content_type.clone(),
                bytes: blob.bytes.clone(),
            }),
            _ => Err(BlobError::NotFound(format!("{}/{}", id, name))),
        }
    }
}
