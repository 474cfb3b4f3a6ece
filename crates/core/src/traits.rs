use crate::error::{IngestError, SearchError};
use crate::extractor::PageText;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub score: f32,
}

/// Nearest-neighbour lookup over vectors addressed by insertion position.
pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimensions(&self) -> usize;

    /// Best-first; equal scores keep insertion order.
    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, SearchError>;
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}
