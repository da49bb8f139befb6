//! Durable, crash-tolerant persistence for page metadata, passage blobs,
//! vector blobs, and the inverted index.
//!
//! Layout under a single data root (spec'd, not negotiable):
//!
//! ```text
//! pages.meta           -- page_id -> PageRecord, plus url -> page_id
//! chunks/{page_id}.json
//! vectors/{page_id}.bin
//! index/inverted
//! model/*              -- provisioned, never written by this crate
//! ```
//!
//! Every write goes through [`atomic_write`]: write to a sibling temp file,
//! then rename over the destination, so a crash mid-write never leaves a
//! half-written file behind. The multi-file atomicity discipline across
//! `chunks` + `vectors` + the index + `pages.meta` is the caller's
//! (orchestrator's) responsibility -- this crate gives it the primitives and
//! the startup orphan-reaping pass described in spec's storage layout notes.

mod error;
mod paths;
mod schema;

use std::collections::HashSet;
use std::fs;
use std::io::Write;

use index::{InvertedIndexFile, PageVectors};

pub use error::StorageError;
pub use paths::DataRoot;
pub use schema::{PageRecord, PagesMetaFile, PersistedPassage};

/// Report of what a startup orphan-reaping pass found and removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub orphaned_chunks: Vec<String>,
    pub orphaned_vectors: Vec<String>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.orphaned_chunks.is_empty() && self.orphaned_vectors.is_empty()
    }
}

/// Handle to one data root. Cheap to clone callers' paths from; holds no
/// file handles or locks of its own -- concurrency control lives above this
/// crate, in the orchestrator.
#[derive(Debug, Clone)]
pub struct Store {
    root: DataRoot,
}

/// Writes `bytes` to `path` via a temp file in the same directory followed
/// by a rename, so the destination is either absent, fully the old content,
/// or fully the new content -- never partially written.
fn atomic_write(path: &std::path::Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = path.parent().ok_or_else(|| {
        StorageError::Io(format!("path `{}` has no parent directory", path.display()))
    })?;
    fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "write".to_string()),
        std::process::id()
    ));
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl Store {
    /// Opens (creating if absent) the data root at `root`. Does not perform
    /// orphan reaping; call [`Store::reap_orphans`] once at startup after
    /// loading `pages.meta`.
    pub fn open(root: impl Into<std::path::PathBuf>) -> Result<Self, StorageError> {
        let root = DataRoot::new(root);
        fs::create_dir_all(root.root())?;
        fs::create_dir_all(root.chunks_dir())?;
        fs::create_dir_all(root.vectors_dir())?;
        fs::create_dir_all(root.index_dir())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &DataRoot {
        &self.root
    }

    /// Loads `pages.meta`, or an empty one if the file does not exist yet.
    pub fn load_pages_meta(&self) -> Result<PagesMetaFile, StorageError> {
        let path = self.root.pages_meta_path();
        if !path.exists() {
            return Ok(PagesMetaFile::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_pages_meta(&self, meta: &PagesMetaFile) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(meta)?;
        atomic_write(&self.root.pages_meta_path(), &bytes)
    }

    /// Loads a page's passages, in persisted (`chunk_index`) order.
    pub fn load_chunks(&self, page_id: &str) -> Result<Vec<PersistedPassage>, StorageError> {
        let text = fs::read_to_string(self.root.chunks_path(page_id))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_chunks(
        &self,
        page_id: &str,
        passages: &[PersistedPassage],
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(passages)?;
        atomic_write(&self.root.chunks_path(page_id), &bytes)
    }

    pub fn delete_chunks(&self, page_id: &str) -> Result<(), StorageError> {
        remove_if_present(&self.root.chunks_path(page_id))
    }

    pub fn load_vectors(&self, page_id: &str) -> Result<PageVectors, StorageError> {
        let bytes = fs::read(self.root.vectors_path(page_id))?;
        PageVectors::from_bytes(&bytes).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    pub fn write_vectors(&self, page_id: &str, vectors: &PageVectors) -> Result<(), StorageError> {
        atomic_write(&self.root.vectors_path(page_id), &vectors.to_bytes())
    }

    pub fn delete_vectors(&self, page_id: &str) -> Result<(), StorageError> {
        remove_if_present(&self.root.vectors_path(page_id))
    }

    /// Loads the inverted index file, or `None` if it has never been
    /// written (first run) or the directory holds no file yet.
    pub fn load_inverted_index(&self) -> Result<Option<InvertedIndexFile>, StorageError> {
        let path = self.root.inverted_index_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub fn write_inverted_index(&self, file: &InvertedIndexFile) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(file)?;
        atomic_write(&self.root.inverted_index_path(), &bytes)
    }

    /// Removes a page's persisted `chunks`/`vectors` blobs. Does not touch
    /// `pages.meta` or the inverted index -- the caller updates those under
    /// its own lock discipline.
    pub fn delete_page_blobs(&self, page_id: &str) -> Result<(), StorageError> {
        self.delete_chunks(page_id)?;
        self.delete_vectors(page_id)?;
        Ok(())
    }

    /// Total bytes occupied by the data root, for [`stats`](crate) surfaces.
    pub fn bytes_on_disk(&self) -> Result<u64, StorageError> {
        fn walk(dir: &std::path::Path) -> Result<u64, StorageError> {
            let mut total = 0u64;
            if !dir.exists() {
                return Ok(0);
            }
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let meta = entry.metadata()?;
                if meta.is_dir() {
                    total += walk(&entry.path())?;
                } else {
                    total += meta.len();
                }
            }
            Ok(total)
        }
        walk(self.root.root())
    }

    /// Startup reconciliation pass: any `chunks/` or `vectors/` file whose
    /// page id is not a key of `meta` is orphaned (it was written before a
    /// crash that happened before the final `pages.meta` update step) and is
    /// deleted. Returns what it found for the caller to log.
    pub fn reap_orphans(&self, meta: &PagesMetaFile) -> Result<ReapReport, StorageError> {
        let valid: HashSet<&str> = meta.pages.keys().map(String::as_str).collect();
        let mut report = ReapReport::default();

        for (dir, suffix, bucket) in [
            (
                self.root.chunks_dir(),
                ".json",
                &mut report.orphaned_chunks,
            ),
            (self.root.vectors_dir(), ".bin", &mut report.orphaned_vectors),
        ] {
            if !dir.exists() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let name = file_name.to_string_lossy();
                let Some(page_id) = name.strip_suffix(suffix) else {
                    continue;
                };
                if !valid.contains(page_id) {
                    fs::remove_file(entry.path())?;
                    bucket.push(page_id.to_string());
                }
            }
        }

        Ok(report)
    }
}

fn remove_if_present(path: &std::path::Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
