//! Layout of a single data root on disk.

use std::path::{Path, PathBuf};

/// Resolves the conceptual layout (`pages.meta`, `chunks/`, `vectors/`,
/// `index/inverted`) against a concrete root directory.
#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_meta_path(&self) -> PathBuf {
        self.root.join("pages.meta")
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn chunks_path(&self, page_id: &str) -> PathBuf {
        self.chunks_dir().join(format!("{page_id}.json"))
    }

    pub fn vectors_dir(&self) -> PathBuf {
        self.root.join("vectors")
    }

    pub fn vectors_path(&self, page_id: &str) -> PathBuf {
        self.vectors_dir().join(format!("{page_id}.bin"))
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn inverted_index_path(&self) -> PathBuf {
        self.index_dir().join("inverted")
    }

    pub fn model_dir(&self) -> PathBuf {
        self.root.join("model")
    }
}
