use indexmap::IndexMap;
use splitpack_core::Compilation;

use crate::module_set::ModuleSet;
use crate::TargetEntries;

/// Modules each tracked entrypoint loads, keyed by entry name in declaration order
pub type EntryUsage = IndexMap<String, ModuleSet>;

/// Records every concrete module reachable through the chunks each entrypoint loads.
///
/// Entries rejected by the filter are absent from the result. Modules without a resource
/// (runtime and concatenated modules) are never recorded.
#[tracing::instrument(level = "debug", skip_all)]
pub fn collect_usage(compilation: &Compilation, targets: &TargetEntries) -> EntryUsage {
  let mut usage = EntryUsage::new();

  for entrypoint in compilation.entrypoints() {
    if !targets.includes(&entrypoint.name) {
      tracing::trace!(entry = %entrypoint.name, "Skipping entry outside target entries");
      continue;
    }

    let modules = entrypoint
      .chunks()
      .iter()
      .filter_map(|chunk_id| compilation.chunk(*chunk_id))
      .flat_map(|chunk| chunk.modules())
      .filter(|module_id| {
        compilation
          .module(*module_id)
          .is_some_and(|module| module.is_concrete())
      })
      .collect::<ModuleSet>();

    tracing::debug!(entry = %entrypoint.name, modules = modules.len(), "Collected entry usage");
    usage.insert(entrypoint.name.clone(), modules);
  }

  usage
}
