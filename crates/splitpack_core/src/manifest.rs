use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::compilation::Compilation;
use crate::hooks::ChunkCreatedListener;
use crate::types::Chunk;

/// Chunk inclusion lists for every emitted manifest (one HTML page, one asset manifest...).
///
/// Each manifest names the chunks it loads. When a pass creates a chunk for an entry, every
/// manifest that loads that entry gains the new chunk.
#[derive(Debug, Default)]
pub struct ManifestChunks {
  manifests: RwLock<IndexMap<String, Vec<String>>>,
}

impl ManifestChunks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&self, filename: impl Into<String>, chunks: Vec<String>) {
    self.manifests.write().insert(filename.into(), chunks);
  }

  pub fn chunks_for(&self, filename: &str) -> Option<Vec<String>> {
    self.manifests.read().get(filename).cloned()
  }

  pub fn filenames(&self) -> Vec<String> {
    self.manifests.read().keys().cloned().collect()
  }

  /// Output files referenced by a manifest, resolved through the chunk list.
  ///
  /// Chunk names without a live chunk are skipped.
  pub fn files_for(&self, filename: &str, compilation: &Compilation) -> Vec<String> {
    let Some(chunk_names) = self.chunks_for(filename) else {
      return Vec::new();
    };

    chunk_names
      .iter()
      .filter_map(|name| compilation.chunk_by_name(name))
      .filter_map(|chunk_id| compilation.chunk(chunk_id))
      .flat_map(|chunk| chunk.files.iter().cloned())
      .collect()
  }
}

impl ChunkCreatedListener for ManifestChunks {
  fn on_chunk_created_for_entry(&self, entry_name: &str, chunk: &Chunk) {
    let mut manifests = self.manifests.write();

    for (filename, chunks) in manifests.iter_mut() {
      if chunks.iter().any(|name| name == entry_name) && !chunks.contains(&chunk.name) {
        tracing::debug!(manifest = %filename, chunk = %chunk.name, "Adding chunk to manifest");
        chunks.push(chunk.name.clone());
      }
    }
  }
}
