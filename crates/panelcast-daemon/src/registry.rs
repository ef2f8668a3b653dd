//! File-backed text surfaces
//!
//! Surface `i` of block `B` lives at `<root>/<B>/<i>.txt`. A surface whose
//! file does not exist yet reads as empty text.

use panelcast_core::{check_index, ResolveError, SurfaceError, SurfaceRegistry, TextSurface};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::config::BlockConfig;

/// Registry over the blocks declared in the daemon configuration
#[derive(Debug, Clone)]
pub struct FileSurfaceRegistry {
    root: PathBuf,
    /// Block name -> surface count
    blocks: HashMap<String, usize>,
}

impl FileSurfaceRegistry {
    pub fn new(root: PathBuf, blocks: &[BlockConfig]) -> Self {
        let blocks = blocks
            .iter()
            .map(|b| (b.name.clone(), b.surfaces))
            .collect();
        Self { root, blocks }
    }

    /// Path of a surface file (not checked against the block list)
    pub fn surface_path(&self, block: &str, index: usize) -> PathBuf {
        self.root.join(block).join(format!("{}.txt", index))
    }
}

impl SurfaceRegistry for FileSurfaceRegistry {
    fn resolve(&self, block: &str, index: i64) -> Result<Box<dyn TextSurface + '_>, ResolveError> {
        let count = *self
            .blocks
            .get(block)
            .ok_or_else(|| ResolveError::UnknownBlock(block.to_string()))?;
        if count == 0 {
            return Err(ResolveError::NotTextSurfaceProvider(block.to_string()));
        }
        let index = check_index(block, index, count)?;
        Ok(Box::new(FileSurface {
            path: self.surface_path(block, index),
        }))
    }
}

/// One text surface stored in a file
#[derive(Debug)]
pub struct FileSurface {
    path: PathBuf,
}

impl TextSurface for FileSurface {
    fn read_text(&self) -> Result<String, SurfaceError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_text(&self, text: &str, append: bool) -> Result<(), SurfaceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if append {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            file.write_all(text.as_bytes())?;
        } else {
            std::fs::write(&self.path, text)?;
        }
        debug!(path = %self.path.display(), bytes = text.len(), "Wrote surface");
        Ok(())
    }
}
