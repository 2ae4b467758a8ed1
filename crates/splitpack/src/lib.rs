//! Runs configured chunk optimization passes over a host compilation.
//!
//! The host builds a [`Compilation`], hands over any plugins of its own (typically the
//! split-chunks pass that extracts the shared vendors chunk) and reads the patched manifests
//! back from [`Splitpack::manifests`] when it emits HTML.

use std::path::Path;
use std::sync::Arc;

use splitpack_config::SplitpackConfig;
use splitpack_config::SplitpackRcConfigLoader;
use splitpack_core::debug_tools::chunk_graph_dot;
use splitpack_core::debug_tools::ChunkGraphStats;
use splitpack_core::debug_tools::DebugTools;
use splitpack_core::manifest::ManifestChunks;
use splitpack_core::plugin::run_chunk_optimization;
use splitpack_core::plugin::ChunkOptimizerPlugin;
use splitpack_core::types::OutputAsset;
use splitpack_core::Compilation;
use splitpack_plugin_remove_unused_dependencies::RemoveUnusedDependenciesOptions;
use splitpack_plugin_remove_unused_dependencies::RemoveUnusedDependenciesPlugin;

pub use tracer::init_tracing;
pub use tracer::Tracer;
pub use tracer::TracerMode;

pub mod tracer;

pub const CHUNK_GRAPH_DOT_FILENAME: &str = "chunk-graph.dot";
pub const CHUNK_STATS_FILENAME: &str = "chunk-stats.json";

pub struct Splitpack {
  config: SplitpackConfig,
  manifests: Arc<ManifestChunks>,
  debug_tools: DebugTools,
}

impl Splitpack {
  pub fn new(config: SplitpackConfig) -> Self {
    let manifests = Arc::new(ManifestChunks::new());
    for manifest in &config.manifests {
      manifests.register(manifest.filename.clone(), manifest.chunks.clone());
    }

    Splitpack {
      config,
      manifests,
      debug_tools: DebugTools::from_env(),
    }
  }

  pub fn from_config_file(path: &Path) -> anyhow::Result<Self> {
    let file = SplitpackRcConfigLoader::load(path)?;
    Ok(Self::new(file.contents))
  }

  pub fn with_debug_tools(mut self, debug_tools: DebugTools) -> Self {
    self.debug_tools = debug_tools;
    self
  }

  pub fn config(&self) -> &SplitpackConfig {
    &self.config
  }

  /// Manifest chunk lists, patched with every chunk created for their entries
  pub fn manifests(&self) -> Arc<ManifestChunks> {
    self.manifests.clone()
  }

  fn plugins(
    &self,
    extra_plugins: Vec<Box<dyn ChunkOptimizerPlugin>>,
  ) -> Vec<Box<dyn ChunkOptimizerPlugin>> {
    let mut plugins = extra_plugins;

    if let Some(options) = &self.config.remove_unused_dependencies {
      plugins.push(Box::new(RemoveUnusedDependenciesPlugin::new(
        RemoveUnusedDependenciesOptions {
          target_entries: options.target_entries.clone(),
          shared_chunk_name: options.shared_chunk_name.clone(),
        },
      )));
    }

    plugins
  }

  /// Runs the host's `extra_plugins` together with the configured passes. Within a phase,
  /// plugins with the same stage run in the order they were given.
  #[tracing::instrument(level = "info", skip_all)]
  pub fn optimize(
    &self,
    compilation: &mut Compilation,
    extra_plugins: Vec<Box<dyn ChunkOptimizerPlugin>>,
  ) -> anyhow::Result<()> {
    compilation
      .hooks_mut()
      .tap_chunk_created_for_entry(self.manifests.clone());

    compilation.validate()?;

    let mut plugins = self.plugins(extra_plugins);
    tracing::debug!(plugins = plugins.len(), "Running chunk optimization");
    run_chunk_optimization(compilation, &mut plugins)?;

    self.emit_debug_reports(compilation)?;
    Ok(())
  }

  fn emit_debug_reports(&self, compilation: &mut Compilation) -> anyhow::Result<()> {
    if self.debug_tools.chunk_graph_dot {
      let dot = chunk_graph_dot(compilation);
      compilation.emit_asset(CHUNK_GRAPH_DOT_FILENAME, OutputAsset::from(dot));
    }

    if self.debug_tools.chunk_stats {
      let stats = serde_json::to_string_pretty(&ChunkGraphStats::from_compilation(compilation))?;
      compilation.emit_asset(CHUNK_STATS_FILENAME, OutputAsset::from(stats));
    }

    Ok(())
  }
}
