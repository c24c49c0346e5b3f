use crate::rewrite::ExportAliases;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRewrite {
    pub code: String,
    pub map: String,
    pub aliases: ExportAliases,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    hash: String,
    rewrite: CachedRewrite,
}

/// Rewritten output keyed by the hash of the Scala source, so unchanged blocks
/// skip the compiler entirely.
pub struct RewriteCache {
    cache_dir: PathBuf,
    salt: String,
}

impl RewriteCache {
    /// `salt` must change whenever the same source could rewrite differently.
    pub fn new(cache_dir: impl Into<PathBuf>, salt: impl Into<String>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            if let Err(e) = fs::create_dir_all(&cache_dir) {
                warn!(dir = %cache_dir.display(), error = %e, "could not create cache directory");
            }
        }
        Self {
            cache_dir,
            salt: salt.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn compute_hash(&self, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", hash))
    }

    pub fn get(&self, source: &str) -> Option<CachedRewrite> {
        let hash = self.compute_hash(source);
        let cache_path = self.entry_path(&hash);
        if !cache_path.exists() {
            return None;
        }

        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %cache_path.display(), error = %e, "corrupt cache entry removed");
                fs::remove_file(&cache_path).ok();
                return None;
            }
        };

        if entry.hash == hash {
            debug!(hash = %hash, "cache hit");
            Some(entry.rewrite)
        } else {
            None
        }
    }

    pub fn set(&self, source: &str, rewrite: &CachedRewrite) {
        let hash = self.compute_hash(source);
        let cache_path = self.entry_path(&hash);
        let entry = CacheEntry {
            hash,
            rewrite: rewrite.clone(),
        };

        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(&cache_path, data) {
                    warn!(path = %cache_path.display(), error = %e, "could not write cache entry");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize cache entry"),
        }
    }
}
