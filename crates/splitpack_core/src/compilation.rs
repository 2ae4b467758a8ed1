use std::path::PathBuf;

use indexmap::IndexMap;

use crate::diagnostic::DiagnosticBuilder;
use crate::diagnostic::DiagnosticError;
use crate::diagnostic::ErrorKind;
use crate::diagnostic_error;
use crate::hooks::CompilationHooks;
use crate::types::{Chunk, ChunkId, Entrypoint, Module, ModuleId, ModuleReason, OutputAsset};

/// A mutable snapshot of one build pass: modules, chunks, entrypoints and the output assets.
///
/// Every graph edit keeps both sides of the edge in sync:
/// - chunk `modules` and module `chunks`
/// - entrypoint `chunks` and chunk `groups`
///
/// Chunks live in an ordered map which doubles as the compilation's chunk list. Removing a
/// chunk drops all of its edges.
#[derive(Clone, Debug, Default)]
pub struct Compilation {
  modules: Vec<Module>,
  chunks: IndexMap<ChunkId, Chunk>,
  next_chunk_id: ChunkId,
  entrypoints: IndexMap<String, Entrypoint>,
  assets: IndexMap<String, OutputAsset>,
  hooks: CompilationHooks,
}

impl Compilation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn hooks(&self) -> &CompilationHooks {
    &self.hooks
  }

  pub fn hooks_mut(&mut self) -> &mut CompilationHooks {
    &mut self.hooks
  }

  pub fn add_module(&mut self, identifier: impl Into<String>, resource: Option<PathBuf>) -> ModuleId {
    let module_id = self.modules.len();
    self.modules.push(Module::new(module_id, identifier, resource));
    module_id
  }

  pub fn module(&self, module_id: ModuleId) -> Option<&Module> {
    self.modules.get(module_id)
  }

  pub fn modules(&self) -> impl Iterator<Item = &Module> {
    self.modules.iter()
  }

  /// Appends a new, empty chunk to the end of the chunk list
  pub fn add_chunk(&mut self, name: impl Into<String>) -> ChunkId {
    let chunk_id = self.next_chunk_id;
    self.next_chunk_id += 1;

    let chunk = Chunk::new(chunk_id, name);
    tracing::trace!(chunk_id, name = %chunk.name, "Added chunk");
    self.chunks.insert(chunk_id, chunk);
    chunk_id
  }

  pub fn chunk(&self, chunk_id: ChunkId) -> Option<&Chunk> {
    self.chunks.get(&chunk_id)
  }

  pub fn chunk_mut(&mut self, chunk_id: ChunkId) -> Option<&mut Chunk> {
    self.chunks.get_mut(&chunk_id)
  }

  /// The chunk list, in creation order
  pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
    self.chunks.values()
  }

  /// First chunk in the chunk list with the given name
  pub fn chunk_by_name(&self, name: &str) -> Option<ChunkId> {
    self
      .chunks
      .values()
      .find(|chunk| chunk.name == name)
      .map(|chunk| chunk.id)
  }

  /// Removes a chunk from the chunk list along with every edge that points at it.
  ///
  /// Files the chunk was going to emit are left in the asset map.
  pub fn remove_chunk(&mut self, chunk_id: ChunkId) -> Option<Chunk> {
    let chunk = self.chunks.shift_remove(&chunk_id)?;

    for module_id in chunk.modules() {
      if let Some(module) = self.modules.get_mut(module_id) {
        module.chunks.shift_remove(&chunk_id);
      }
    }

    for entry_name in chunk.groups() {
      if let Some(entrypoint) = self.entrypoints.get_mut(entry_name) {
        entrypoint.chunks.retain(|id| *id != chunk_id);
      }
    }

    tracing::trace!(chunk_id, name = %chunk.name, "Removed chunk");
    Some(chunk)
  }

  /// Adds a module to a chunk. Returns false when the module was already there or either
  /// node is unknown.
  pub fn connect_chunk_and_module(&mut self, chunk_id: ChunkId, module_id: ModuleId) -> bool {
    let (Some(chunk), Some(module)) = (
      self.chunks.get_mut(&chunk_id),
      self.modules.get_mut(module_id),
    ) else {
      return false;
    };

    let inserted = chunk.modules.insert(module_id);
    module.chunks.insert(chunk_id);
    inserted
  }

  pub fn disconnect_chunk_and_module(&mut self, chunk_id: ChunkId, module_id: ModuleId) -> bool {
    let (Some(chunk), Some(module)) = (
      self.chunks.get_mut(&chunk_id),
      self.modules.get_mut(module_id),
    ) else {
      return false;
    };

    module.chunks.shift_remove(&chunk_id);
    chunk.modules.shift_remove(&module_id)
  }

  pub fn add_entrypoint(&mut self, name: impl Into<String>) -> &mut Entrypoint {
    let name = name.into();
    self
      .entrypoints
      .entry(name.clone())
      .or_insert_with(|| Entrypoint::new(name))
  }

  pub fn entrypoint(&self, name: &str) -> Option<&Entrypoint> {
    self.entrypoints.get(name)
  }

  /// Entrypoints in declaration order
  pub fn entrypoints(&self) -> impl Iterator<Item = &Entrypoint> {
    self.entrypoints.values()
  }

  /// Attaches a chunk to an entrypoint group.
  ///
  /// Attaching is idempotent: a chunk appears at most once in an entrypoint's chunk list.
  pub fn connect_entrypoint_and_chunk(&mut self, entry_name: &str, chunk_id: ChunkId) -> bool {
    let (Some(entrypoint), Some(chunk)) = (
      self.entrypoints.get_mut(entry_name),
      self.chunks.get_mut(&chunk_id),
    ) else {
      return false;
    };

    chunk.groups.insert(entrypoint.name.clone());
    if entrypoint.chunks.contains(&chunk_id) {
      return false;
    }

    entrypoint.chunks.push(chunk_id);
    tracing::trace!(entry = entry_name, chunk_id, "Attached chunk to entrypoint");
    true
  }

  pub fn disconnect_entrypoint_and_chunk(&mut self, entry_name: &str, chunk_id: ChunkId) -> bool {
    let Some(entrypoint) = self.entrypoints.get_mut(entry_name) else {
      return false;
    };

    if let Some(chunk) = self.chunks.get_mut(&chunk_id) {
      chunk.groups.shift_remove(entry_name);
    }

    let Some(index) = entrypoint.chunks.iter().position(|id| *id == chunk_id) else {
      return false;
    };

    entrypoint.chunks.remove(index);
    tracing::trace!(entry = entry_name, chunk_id, "Detached chunk from entrypoint");
    true
  }

  pub fn add_module_reason(&mut self, module_id: ModuleId, reason: ModuleReason) {
    if let Some(module) = self.modules.get_mut(module_id) {
      module.reasons.push(reason);
    }
  }

  /// Drops every reason on the module matching the predicate, returning how many were removed
  pub fn remove_module_reasons<F>(&mut self, module_id: ModuleId, predicate: F) -> usize
  where
    F: Fn(&ModuleReason) -> bool,
  {
    let Some(module) = self.modules.get_mut(module_id) else {
      return 0;
    };

    let before = module.reasons.len();
    module.reasons.retain(|reason| !predicate(reason));
    before - module.reasons.len()
  }

  pub fn emit_asset(&mut self, filename: impl Into<String>, asset: OutputAsset) {
    self.assets.insert(filename.into(), asset);
  }

  pub fn delete_asset(&mut self, filename: &str) -> Option<OutputAsset> {
    self.assets.shift_remove(filename)
  }

  pub fn asset(&self, filename: &str) -> Option<&OutputAsset> {
    self.assets.get(filename)
  }

  pub fn assets(&self) -> impl Iterator<Item = (&str, &OutputAsset)> {
    self.assets.iter().map(|(name, asset)| (name.as_str(), asset))
  }

  /// Checks that every edge points at a live node and that both sides of each edge agree.
  ///
  /// Hosts run this before optimization passes; the passes themselves assume a consistent graph.
  #[tracing::instrument(level = "debug", skip_all)]
  pub fn validate(&self) -> Result<(), DiagnosticError> {
    for chunk in self.chunks.values() {
      for module_id in chunk.modules() {
        let Some(module) = self.modules.get(module_id) else {
          return Err(inconsistent(format!(
            "Chunk {} references unknown module {module_id}",
            chunk.name
          )));
        };

        if !module.is_in_chunk(chunk.id) {
          return Err(inconsistent(format!(
            "Module {} is in chunk {} but does not list it",
            module.identifier, chunk.name
          )));
        }
      }

      for entry_name in chunk.groups() {
        let attached = self
          .entrypoints
          .get(entry_name)
          .is_some_and(|entrypoint| entrypoint.has_chunk(chunk.id));

        if !attached {
          return Err(inconsistent(format!(
            "Chunk {} lists entrypoint {entry_name} which does not load it",
            chunk.name
          )));
        }
      }
    }

    for module in &self.modules {
      for chunk_id in module.chunks() {
        if !self
          .chunks
          .get(&chunk_id)
          .is_some_and(|chunk| chunk.contains_module(module.id))
        {
          return Err(inconsistent(format!(
            "Module {} lists chunk {chunk_id} which does not contain it",
            module.identifier
          )));
        }
      }
    }

    for entrypoint in self.entrypoints.values() {
      for chunk_id in entrypoint.chunks() {
        if !self
          .chunks
          .get(chunk_id)
          .is_some_and(|chunk| chunk.is_in_group(&entrypoint.name))
        {
          return Err(inconsistent(format!(
            "Entrypoint {} loads chunk {chunk_id} which is missing or not in its group",
            entrypoint.name
          )));
        }
      }
    }

    Ok(())
  }
}

fn inconsistent(message: String) -> DiagnosticError {
  diagnostic_error!(
    DiagnosticBuilder::default()
      .kind(ErrorKind::InconsistentGraph)
      .origin("splitpack_core")
      .message(message)
  )
}
