use indexmap::IndexSet;
use serde::Serialize;

use super::ModuleId;

/// Handle of a chunk inside a [`crate::Compilation`]
pub type ChunkId = usize;

/// A named container of modules that becomes one emitted output bundle
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
  pub id: ChunkId,
  pub name: String,

  /// Provenance note for chunks created by an optimization pass
  pub chunk_reason: Option<String>,

  /// Output files this chunk emits, relative to the output directory
  pub files: Vec<String>,

  pub(crate) modules: IndexSet<ModuleId>,
  pub(crate) groups: IndexSet<String>,
}

impl Chunk {
  pub fn new(id: ChunkId, name: impl Into<String>) -> Self {
    Chunk {
      id,
      name: name.into(),
      chunk_reason: None,
      files: Vec::new(),
      modules: IndexSet::new(),
      groups: IndexSet::new(),
    }
  }

  /// Modules in insertion order
  pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
    self.modules.iter().copied()
  }

  pub fn contains_module(&self, module_id: ModuleId) -> bool {
    self.modules.contains(&module_id)
  }

  pub fn number_of_modules(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }

  /// Names of the entrypoint groups this chunk is attached to
  pub fn groups(&self) -> impl Iterator<Item = &str> + '_ {
    self.groups.iter().map(String::as_str)
  }

  pub fn is_in_group(&self, entry_name: &str) -> bool {
    self.groups.contains(entry_name)
  }
}
