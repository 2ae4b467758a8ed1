use std::fmt::Debug;

use anyhow::Context;

use crate::compilation::Compilation;

/// Rewrites the chunk graph after chunks have been built and before assets are emitted.
///
/// Every plugin's `optimize_chunks` runs first, in registration order. Then every plugin's
/// `optimize_chunks_advanced` runs, ordered by [`ChunkOptimizerPlugin::stage`]. Plugins that
/// need to observe the graph before another plugin rewrites it read it in `optimize_chunks`
/// and act on it in `optimize_chunks_advanced` with a later stage.
pub trait ChunkOptimizerPlugin: Debug + Send {
  fn name(&self) -> &'static str;

  /// Ordering of `optimize_chunks_advanced`, lower runs first
  fn stage(&self) -> i32 {
    0
  }

  fn optimize_chunks(&mut self, _compilation: &mut Compilation) -> anyhow::Result<()> {
    Ok(())
  }

  fn optimize_chunks_advanced(&mut self, _compilation: &mut Compilation) -> anyhow::Result<()> {
    Ok(())
  }
}

/// Runs both chunk optimization phases over the compilation
#[tracing::instrument(level = "info", skip_all, fields(plugins = plugins.len()))]
pub fn run_chunk_optimization(
  compilation: &mut Compilation,
  plugins: &mut [Box<dyn ChunkOptimizerPlugin>],
) -> anyhow::Result<()> {
  for plugin in plugins.iter_mut() {
    let name = plugin.name();
    tracing::debug!(plugin = name, "optimize_chunks");
    plugin
      .optimize_chunks(compilation)
      .with_context(|| format!("{name} failed in optimize_chunks"))?;
  }

  let mut order = (0..plugins.len()).collect::<Vec<_>>();
  order.sort_by_key(|index| plugins[*index].stage());

  for index in order {
    let plugin = &mut plugins[index];
    let name = plugin.name();
    tracing::debug!(plugin = name, stage = plugin.stage(), "optimize_chunks_advanced");
    plugin
      .optimize_chunks_advanced(compilation)
      .with_context(|| format!("{name} failed in optimize_chunks_advanced"))?;
  }

  Ok(())
}
