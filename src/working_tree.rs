//! # Working Tree Module
//!
//! Directory temporanea condivisa fra le fasi della pipeline.
//!
//! L'extractor la popola, l'image optimizer la modifica in place e il packer
//! la legge. La rimozione è garantita in modo scoped: `close()` la elimina
//! riportando eventuali errori, mentre il `Drop` di `TempDir` la elimina
//! comunque sui percorsi di errore.

use anyhow::{Context, Result};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

const TREE_PREFIX: &str = "office-image-optimizer-";

/// Uniquely named temporary directory owned by a single run
#[derive(Debug)]
pub struct WorkingTree {
    dir: TempDir,
}

impl WorkingTree {
    /// Create a fresh working tree in the system temp directory
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(TREE_PREFIX)
            .tempdir()
            .context("Failed to create temporary working tree")?;
        debug!("Created working tree: {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a fresh working tree inside `parent`
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(TREE_PREFIX)
            .tempdir_in(parent)
            .with_context(|| {
                format!("Failed to create temporary working tree in {}", parent.display())
            })?;
        debug!("Created working tree: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the tree and all its descendants, reporting failures
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("Failed to remove working tree {}", path.display()))?;
        debug!("Removed working tree: {}", path.display());
        Ok(())
    }
}
