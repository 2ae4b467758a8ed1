//! Removes unused dependencies from the shared vendors chunk.
//!
//! Split-chunks style optimizations put every dependency that any entry uses into one shared
//! chunk. Pages that only need part of it still download all of it. This plugin records what
//! each entry uses before the shared chunk is extracted, then gives each entry a chunk holding
//! only the shared modules it needs, sharing those chunks between entries that need the same
//! subset.

use indexmap::IndexSet;
use splitpack_core::plugin::ChunkOptimizerPlugin;
use splitpack_core::Compilation;

pub use self::module_set::{sets_equal, ModuleSet};
pub use self::partitioner::{
  partition, DedupRegistry, PartitionOutcome, PartitionReport, EXTRACTED_CHUNK_REASON,
};
pub use self::usage_collector::{collect_usage, EntryUsage};

mod module_set;
mod partitioner;
mod usage_collector;

pub const DEFAULT_SHARED_CHUNK_NAME: &str = "vendors";

/// Entries taking part in the pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TargetEntries {
  #[default]
  All,
  Only(IndexSet<String>),
}

impl TargetEntries {
  pub fn only<I>(names: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    TargetEntries::Only(names.into_iter().collect())
  }

  pub fn includes(&self, entry_name: &str) -> bool {
    match self {
      TargetEntries::All => true,
      TargetEntries::Only(names) => names.contains(entry_name),
    }
  }
}

impl From<Option<Vec<String>>> for TargetEntries {
  fn from(names: Option<Vec<String>>) -> Self {
    names.map(TargetEntries::only).unwrap_or_default()
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveUnusedDependenciesOptions {
  /// When set, only these entries are re-partitioned; every other entry is left untouched
  pub target_entries: Option<Vec<String>>,
  pub shared_chunk_name: String,
}

impl Default for RemoveUnusedDependenciesOptions {
  fn default() -> Self {
    RemoveUnusedDependenciesOptions {
      target_entries: None,
      shared_chunk_name: DEFAULT_SHARED_CHUNK_NAME.to_string(),
    }
  }
}

/// Runs the usage collector in `optimize_chunks` and the partitioner in
/// `optimize_chunks_advanced`, after the shared chunk has been extracted.
#[derive(Debug)]
pub struct RemoveUnusedDependenciesPlugin {
  shared_chunk_name: String,
  targets: TargetEntries,
  usage: Option<EntryUsage>,
  last_report: Option<PartitionReport>,
}

impl RemoveUnusedDependenciesPlugin {
  /// Runs after split-chunks style plugins, which use the default stage
  pub const STAGE: i32 = 100;

  pub fn new(options: RemoveUnusedDependenciesOptions) -> Self {
    RemoveUnusedDependenciesPlugin {
      shared_chunk_name: options.shared_chunk_name,
      targets: TargetEntries::from(options.target_entries),
      usage: None,
      last_report: None,
    }
  }

  /// Report of the most recent partition pass
  pub fn last_report(&self) -> Option<&PartitionReport> {
    self.last_report.as_ref()
  }
}

impl Default for RemoveUnusedDependenciesPlugin {
  fn default() -> Self {
    Self::new(RemoveUnusedDependenciesOptions::default())
  }
}

impl ChunkOptimizerPlugin for RemoveUnusedDependenciesPlugin {
  fn name(&self) -> &'static str {
    "RemoveUnusedDependenciesPlugin"
  }

  fn stage(&self) -> i32 {
    Self::STAGE
  }

  fn optimize_chunks(&mut self, compilation: &mut Compilation) -> anyhow::Result<()> {
    self.usage = Some(collect_usage(compilation, &self.targets));
    Ok(())
  }

  #[tracing::instrument(
    level = "debug",
    skip_all,
    fields(plugin = "RemoveUnusedDependenciesPlugin")
  )]
  fn optimize_chunks_advanced(&mut self, compilation: &mut Compilation) -> anyhow::Result<()> {
    let usage = match self.usage.take() {
      Some(usage) => usage,
      None => {
        tracing::debug!("No usage collected before optimize_chunks_advanced, collecting now");
        collect_usage(compilation, &self.targets)
      }
    };

    if compilation.chunk_by_name(&self.shared_chunk_name).is_none() {
      tracing::warn!(
        shared_chunk = %self.shared_chunk_name,
        "Shared chunk not found, leaving chunks untouched"
      );
    }

    let report = partition(compilation, &usage, &self.shared_chunk_name);
    tracing::debug!(
      created = report.created_chunks.len(),
      released = report.released_modules.len(),
      removed = report.shared_chunk_removed,
      "Partitioned shared chunk"
    );

    self.last_report = Some(report);
    Ok(())
  }
}
