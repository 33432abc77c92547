//! Asset sources.
//!
//! The renderer only needs raw bytes for its shader stages and texture file. Where those
//! bytes come from is up to the host: a directory on disk, an in-memory bundle, or a
//! combination of both.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Provider of named asset bytes.
pub trait AssetSource: Send + Sync {
    /// Read the full contents of the named asset.
    fn read(&self, name: &str) -> Result<Vec<u8>>;
}

/// Assets stored as files below a root directory.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssetSource {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!("Read asset {} ({} bytes)", path.display(), bytes.len());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(path.display().to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Assets held in memory, optionally layered over a fallback source.
#[derive(Default)]
pub struct MemoryAssetSource {
    entries: HashMap<String, Vec<u8>>,
    fallback: Option<Box<dyn AssetSource>>,
}

impl MemoryAssetSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset.
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Consult `fallback` for names not held in memory.
    pub fn with_fallback(mut self, fallback: impl AssetSource + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Add or replace an asset.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }
}

impl AssetSource for MemoryAssetSource {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        if let Some(bytes) = self.entries.get(name) {
            return Ok(bytes.clone());
        }
        match &self.fallback {
            Some(fallback) => fallback.read(name),
            None => Err(Error::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_prefers_own_entries() {
        let base = MemoryAssetSource::new()
            .with("a.bin", vec![1, 2])
            .with("b.bin", vec![3]);
        let layered = MemoryAssetSource::new()
            .with("a.bin", vec![9])
            .with_fallback(base);

        assert_eq!(layered.read("a.bin").unwrap(), vec![9]);
        assert_eq!(layered.read("b.bin").unwrap(), vec![3]);
        assert!(matches!(layered.read("c.bin"), Err(Error::NotFound(_))));
    }

    #[test]
    fn dir_source_reports_missing_files() {
        let source = DirAssetSource::new(std::env::temp_dir().join("quadview-missing-assets"));
        assert!(matches!(
            source.read("texture.vert.spv"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn dir_source_reads_files() {
        let dir = std::env::temp_dir().join(format!("quadview-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("blob.bin"), [7u8, 8, 9]).unwrap();

        let source = DirAssetSource::new(&dir);
        assert_eq!(source.read("blob.bin").unwrap(), vec![7, 8, 9]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
