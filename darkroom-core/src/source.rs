//! Immutable pixel sources referenced by image and sticker layers.
//!
//! Sources are append-only for the lifetime of a document, so a handle held
//! in any history snapshot always resolves.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pixel::PixelBuffer;

/// Handle to a pixel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(Uuid);

impl SourceId {
    /// Create a new unique source ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only store of decoded pixel sources.
#[derive(Debug, Clone, Default)]
pub struct SourceStore {
    sources: HashMap<SourceId, Arc<PixelBuffer>>,
}

impl SourceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source and return its handle.
    pub fn add(&mut self, pixels: PixelBuffer) -> SourceId {
        let id = SourceId::new();
        tracing::debug!(
            "Source {id} added ({}x{})",
            pixels.width(),
            pixels.height()
        );
        self.sources.insert(id, Arc::new(pixels));
        id
    }

    /// Resolve a handle.
    #[must_use]
    pub fn get(&self, id: SourceId) -> Option<&Arc<PixelBuffer>> {
        self.sources.get(&id)
    }

    /// Number of stored sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
