//! Text surfaces and the registry that resolves them

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a surface reference could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("block '{0}' not found")]
    UnknownBlock(String),
    #[error("block '{0}' is not a text surface provider")]
    NotTextSurfaceProvider(String),
    #[error("block '{block}' has no text surface with index {index} (surface count {count})")]
    SurfaceOutOfRange { block: String, index: i64, count: usize },
}

/// Failure while reading or writing a resolved surface
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Identifies one text surface of a block
///
/// Two references point at the same surface iff block name and index match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceRef {
    /// Block that provides the surface
    pub block: String,
    /// Index into the block's surfaces (negative values never resolve)
    pub index: i64,
}

impl SurfaceRef {
    pub fn new(block: impl Into<String>, index: i64) -> Self {
        Self {
            block: block.into(),
            index,
        }
    }
}

impl std::fmt::Display for SurfaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.block, self.index)
    }
}

/// A live display surface holding text
pub trait TextSurface {
    /// Full current text content
    fn read_text(&self) -> Result<String, SurfaceError>;

    /// Replace (or with `append`, extend) the text content
    fn write_text(&self, text: &str, append: bool) -> Result<(), SurfaceError>;
}

/// Host-supplied lookup from (block, index) to a live surface
pub trait SurfaceRegistry {
    fn resolve(&self, block: &str, index: i64) -> Result<Box<dyn TextSurface + '_>, ResolveError>;

    fn resolve_ref(&self, surface: &SurfaceRef) -> Result<Box<dyn TextSurface + '_>, ResolveError> {
        self.resolve(&surface.block, surface.index)
    }
}

/// Shared bounds check for registries that know their surface count
pub fn check_index(block: &str, index: i64, count: usize) -> Result<usize, ResolveError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < count)
        .ok_or_else(|| ResolveError::SurfaceOutOfRange {
            block: block.to_string(),
            index,
            count,
        })
}
