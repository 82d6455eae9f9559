//! Filesystem store backend
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<store name>/<sha256(key)>.<write id>.body   response body
//! <root>/<store name>/<sha256(key)>.json              metadata, written last
//! ```
//!
//! The metadata file is the commit marker and names the body file it belongs
//! to. Every `put` writes its body under a fresh write id, so an interrupted
//! `put` leaves either the previous entry or the new one, never a mix. Body
//! files no metadata points at are ignored.

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::Response;
use crate::store::{validate_store_name, CacheStorage, CacheStore, EntryInfo};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

/// Stores persisted as directories under a root
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Use `root` as the storage root (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> ShellcacheResult<PathBuf> {
        validate_store_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> ShellcacheResult<Arc<dyn CacheStore>> {
        let dir = self.store_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellcacheError::store(name, format!("creating {}", dir.display()), e))?;
        Ok(Arc::new(DiskStore {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> ShellcacheResult<bool> {
        Ok(self.store_dir(name)?.is_dir())
    }

    async fn delete(&self, name: &str) -> ShellcacheResult<bool> {
        let dir = self.store_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted store directory {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellcacheError::store(name, "deleting store", e)),
        }
    }

    async fn names(&self) -> ShellcacheResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(ShellcacheError::io("reading storage root", e)),
        };

        let mut names = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::io("reading storage entry", e))?
        {
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Persisted metadata for one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    size_bytes: u64,
    stored_at: DateTime<Utc>,
    /// Body file written alongside this metadata
    body_file: String,
}

/// A single store directory
pub struct DiskStore {
    name: String,
    dir: PathBuf,
}

impl DiskStore {
    fn digest(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", Self::digest(key), META_EXT))
    }

    /// Body file named by the metadata, which must stay inside the store
    fn body_path(&self, meta: &EntryMeta) -> ShellcacheResult<PathBuf> {
        let plain = Path::new(&meta.body_file)
            .file_name()
            .is_some_and(|name| name == meta.body_file.as_str());
        if !plain {
            return Err(ShellcacheError::StoreCorrupt {
                store: self.name.clone(),
                reason: format!("bad body file {:?} for {}", meta.body_file, meta.key),
            });
        }
        Ok(self.dir.join(&meta.body_file))
    }

    async fn remove_body(&self, path: &Path) -> ShellcacheResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.err(format!("deleting {}", path.display()), e)),
        }
    }

    fn err(&self, context: impl Into<String>, source: std::io::Error) -> ShellcacheError {
        ShellcacheError::store(self.name.clone(), context, source)
    }

    async fn read_meta(&self, path: &Path) -> ShellcacheResult<Option<EntryMeta>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.err(format!("reading {}", path.display()), e)),
        };
        let meta = serde_json::from_str(&content).map_err(|e| ShellcacheError::StoreCorrupt {
            store: self.name.clone(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(Some(meta))
    }

    /// Write metadata beside its final name, then rename it into place
    async fn commit_meta(
        &self,
        key: &str,
        meta_path: &Path,
        meta: &EntryMeta,
    ) -> ShellcacheResult<()> {
        let staging = meta_path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec(meta)?)
            .await
            .map_err(|e| self.err(format!("writing metadata for {}", key), e))?;
        fs::rename(&staging, meta_path)
            .await
            .map_err(|e| self.err(format!("committing {}", key), e))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> ShellcacheResult<Option<Response>> {
        let Some(meta) = self.read_meta(&self.meta_path(key)).await? else {
            return Ok(None);
        };

        let body_path = self.body_path(&meta)?;
        let body = fs::read(&body_path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ShellcacheError::StoreCorrupt {
                    store: self.name.clone(),
                    reason: format!("missing body for {}", key),
                }
            } else {
                self.err(format!("reading body for {}", key), e)
            }
        })?;

        Ok(Some(Response {
            url: meta.url,
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, key: &str, response: Response) -> ShellcacheResult<()> {
        if !self.dir.is_dir() {
            return Err(self.err(
                format!("writing {}", key),
                std::io::Error::new(ErrorKind::NotFound, "store was deleted"),
            ));
        }

        let meta_path = self.meta_path(key);
        // Unreadable previous metadata is simply replaced
        let previous = self.read_meta(&meta_path).await.ok().flatten();

        let body_file = format!(
            "{}.{}.{}",
            Self::digest(key),
            Uuid::new_v4().simple(),
            BODY_EXT
        );
        let body_path = self.dir.join(&body_file);
        fs::write(&body_path, &response.body)
            .await
            .map_err(|e| self.err(format!("writing body for {}", key), e))?;

        let meta = EntryMeta {
            key: key.to_string(),
            url: response.url,
            status: response.status,
            headers: response.headers,
            size_bytes: response.body.len() as u64,
            stored_at: Utc::now(),
            body_file,
        };
        if let Err(e) = self.commit_meta(key, &meta_path, &meta).await {
            if let Err(cleanup) = self.remove_body(&body_path).await {
                warn!("Failed to discard uncommitted body for {}: {}", key, cleanup);
            }
            return Err(e);
        }

        if let Some(previous) = previous {
            if let Ok(old_body) = self.body_path(&previous) {
                if let Err(e) = self.remove_body(&old_body).await {
                    warn!("Failed to remove replaced body for {}: {}", key, e);
                }
            }
        }

        debug!("Stored {} in {}", key, self.name);
        Ok(())
    }

    async fn delete(&self, key: &str) -> ShellcacheResult<bool> {
        let meta_path = self.meta_path(key);
        let body_path = match self.read_meta(&meta_path).await {
            Ok(meta) => meta.and_then(|meta| self.body_path(&meta).ok()),
            Err(e) => {
                warn!("Deleting unreadable entry {}: {}", key, e);
                None
            }
        };

        let existed = match fs::remove_file(&meta_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(self.err(format!("deleting {}", key), e)),
        };

        if let Some(body_path) = body_path {
            self.remove_body(&body_path).await?;
        }

        Ok(existed)
    }

    async fn entries(&self) -> ShellcacheResult<Vec<EntryInfo>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(self.err("listing entries", e)),
        };

        let mut entries = vec![];
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| self.err("listing entries", e))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != META_EXT) {
                continue;
            }
            match self.read_meta(&path).await {
                Ok(Some(meta)) => entries.push(EntryInfo {
                    key: meta.key,
                    status: meta.status,
                    size_bytes: meta.size_bytes,
                    stored_at: meta.stored_at,
                }),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
