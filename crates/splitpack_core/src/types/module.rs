use std::path::PathBuf;

use indexmap::IndexSet;
use serde::Serialize;

use super::ChunkId;

/// Handle of a module inside a [`crate::Compilation`].
///
/// Modules are compared by handle, never by value. Two modules built from the same source
/// are still distinct nodes.
pub type ModuleId = usize;

/// Provenance record explaining why a module is part of a chunk.
///
/// A reason with no `source_entry` is the chunk's own attribution. A reason with an entry
/// records that the chunk holds the module on behalf of that entrypoint.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReason {
  pub source_chunk: Option<ChunkId>,
  pub source_entry: Option<String>,
}

impl ModuleReason {
  pub fn chunk(chunk_id: ChunkId) -> Self {
    ModuleReason {
      source_chunk: Some(chunk_id),
      source_entry: None,
    }
  }

  pub fn entry(chunk_id: ChunkId, entry_name: impl Into<String>) -> Self {
    ModuleReason {
      source_chunk: Some(chunk_id),
      source_entry: Some(entry_name.into()),
    }
  }

  pub fn is_from_chunk(&self, chunk_id: ChunkId) -> bool {
    self.source_chunk == Some(chunk_id)
  }
}

/// One compiled source unit
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  pub id: ModuleId,

  /// Human readable identifier, used for debugging output only
  pub identifier: String,

  /// The file this module was built from.
  ///
  /// Runtime and concatenated modules have no resource and are never redistributed.
  pub resource: Option<PathBuf>,

  pub(crate) reasons: Vec<ModuleReason>,
  pub(crate) chunks: IndexSet<ChunkId>,
}

impl Module {
  pub fn new(id: ModuleId, identifier: impl Into<String>, resource: Option<PathBuf>) -> Self {
    Module {
      id,
      identifier: identifier.into(),
      resource,
      reasons: Vec::new(),
      chunks: IndexSet::new(),
    }
  }

  pub fn is_concrete(&self) -> bool {
    self.resource.is_some()
  }

  pub fn reasons(&self) -> &[ModuleReason] {
    &self.reasons
  }

  /// Chunks this module currently belongs to
  pub fn chunks(&self) -> impl Iterator<Item = ChunkId> + '_ {
    self.chunks.iter().copied()
  }

  pub fn is_in_chunk(&self, chunk_id: ChunkId) -> bool {
    self.chunks.contains(&chunk_id)
  }
}
