use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexSet;
use regex::Regex;
use splitpack_core::plugin::ChunkOptimizerPlugin;
use splitpack_core::types::{ChunkId, ModuleId, ModuleReason, OutputAsset};
use splitpack_core::Compilation;

/// Builds chunk graphs by module name.
///
/// Names starting with `src/` resolve to project sources, every other name resolves to a
/// package under `node_modules`.
#[derive(Debug, Default)]
pub struct CompilationFixture {
  pub compilation: Compilation,
  modules: HashMap<String, ModuleId>,
}

impl CompilationFixture {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the module with this name, creating a concrete module the first time
  pub fn module(&mut self, name: &str) -> ModuleId {
    if let Some(module_id) = self.modules.get(name) {
      return *module_id;
    }

    let resource = if name.starts_with("src/") {
      PathBuf::from("/project").join(name)
    } else {
      PathBuf::from("/project/node_modules").join(name).join("index.js")
    };

    let module_id = self.compilation.add_module(name, Some(resource));
    self.modules.insert(name.to_string(), module_id);
    module_id
  }

  /// Creates a module without a resource, like a bundler runtime module
  pub fn runtime_module(&mut self, name: &str) -> ModuleId {
    let module_id = self.compilation.add_module(name, None);
    self.modules.insert(name.to_string(), module_id);
    module_id
  }

  /// Creates a chunk emitting `js/<name>.js` that contains the named modules
  pub fn chunk(&mut self, name: &str, modules: &[&str]) -> ChunkId {
    let chunk_id = self.compilation.add_chunk(name);

    for module_name in modules {
      let module_id = self.module(module_name);
      self.compilation.connect_chunk_and_module(chunk_id, module_id);
      self
        .compilation
        .add_module_reason(module_id, ModuleReason::chunk(chunk_id));
    }

    emit_chunk_file(&mut self.compilation, chunk_id);
    chunk_id
  }

  /// Creates an entrypoint with a single chunk holding `src/<name>.js` followed by `modules`
  pub fn entry(&mut self, name: &str, modules: &[&str]) -> ChunkId {
    let entry_module = format!("src/{name}.js");
    let mut chunk_modules = vec![entry_module.as_str()];
    chunk_modules.extend_from_slice(modules);

    let chunk_id = self.chunk(name, &chunk_modules);
    self.compilation.add_entrypoint(name);
    self.compilation.connect_entrypoint_and_chunk(name, chunk_id);
    chunk_id
  }

  /// Handle of a module created earlier.
  ///
  /// Panics when the name is unknown, tests should only ask for modules they declared.
  pub fn id(&self, name: &str) -> ModuleId {
    match self.modules.get(name) {
      Some(module_id) => *module_id,
      None => panic!("Unknown fixture module {name}"),
    }
  }

  pub fn module_set(&self, names: &[&str]) -> IndexSet<ModuleId> {
    names.iter().map(|name| self.id(name)).collect()
  }

  /// See [`extract_shared_chunk`]
  pub fn extract_shared_chunk(&mut self, name: &str, pattern: &str) -> Option<ChunkId> {
    match Regex::new(pattern) {
      Ok(test) => extract_shared_chunk(&mut self.compilation, name, &test),
      Err(error) => panic!("Invalid fixture pattern {pattern}: {error}"),
    }
  }
}

fn emit_chunk_file(compilation: &mut Compilation, chunk_id: ChunkId) {
  let Some(chunk) = compilation.chunk_mut(chunk_id) else {
    return;
  };

  let filename = format!("js/{}.js", chunk.name);
  chunk.files.push(filename.clone());
  let contents = format!("/* {} */", chunk.name);
  compilation.emit_asset(filename, OutputAsset::from(contents));
}

/// Moves every module whose resource matches `test` out of the entry chunks into one shared
/// chunk, the way a split-chunks cache group does.
///
/// The shared chunk is attached to every entry that lost a module to it. Each moved module is
/// attributed to the shared chunk itself and to every entry in its group. Returns None when no
/// module matched.
pub fn extract_shared_chunk(
  compilation: &mut Compilation,
  name: &str,
  test: &Regex,
) -> Option<ChunkId> {
  let mut moved: Vec<(String, ChunkId, ModuleId)> = Vec::new();

  for entrypoint in compilation.entrypoints() {
    for chunk_id in entrypoint.chunks() {
      let Some(chunk) = compilation.chunk(*chunk_id) else {
        continue;
      };

      for module_id in chunk.modules() {
        let matches = compilation
          .module(module_id)
          .and_then(|module| module.resource.as_ref())
          .is_some_and(|resource| test.is_match(&resource.to_string_lossy()));

        if matches {
          moved.push((entrypoint.name.clone(), *chunk_id, module_id));
        }
      }
    }
  }

  if moved.is_empty() {
    return None;
  }

  let shared_chunk_id = compilation.add_chunk(name);
  let mut shared_modules = IndexSet::new();

  for (entry_name, chunk_id, module_id) in &moved {
    compilation.disconnect_chunk_and_module(*chunk_id, *module_id);
    compilation.remove_module_reasons(*module_id, |reason| reason.is_from_chunk(*chunk_id));
    compilation.connect_chunk_and_module(shared_chunk_id, *module_id);
    compilation.connect_entrypoint_and_chunk(entry_name, shared_chunk_id);
    shared_modules.insert(*module_id);
  }

  let entries = compilation
    .chunk(shared_chunk_id)
    .map(|chunk| chunk.groups().map(String::from).collect::<Vec<_>>())
    .unwrap_or_default();

  for module_id in shared_modules {
    compilation.add_module_reason(module_id, ModuleReason::chunk(shared_chunk_id));
    for entry_name in &entries {
      compilation.add_module_reason(module_id, ModuleReason::entry(shared_chunk_id, entry_name));
    }
  }

  emit_chunk_file(compilation, shared_chunk_id);
  Some(shared_chunk_id)
}

/// Runs [`extract_shared_chunk`] in `optimize_chunks_advanced` at the default stage
#[derive(Debug)]
pub struct ExtractSharedChunkPlugin {
  name: String,
  test: Regex,
}

impl ExtractSharedChunkPlugin {
  pub fn new(name: &str, pattern: &str) -> Self {
    match Regex::new(pattern) {
      Ok(test) => ExtractSharedChunkPlugin {
        name: name.to_string(),
        test,
      },
      Err(error) => panic!("Invalid fixture pattern {pattern}: {error}"),
    }
  }
}

impl ChunkOptimizerPlugin for ExtractSharedChunkPlugin {
  fn name(&self) -> &'static str {
    "ExtractSharedChunkPlugin"
  }

  fn optimize_chunks_advanced(&mut self, compilation: &mut Compilation) -> anyhow::Result<()> {
    extract_shared_chunk(compilation, &self.name, &self.test);
    Ok(())
  }
}
