use std::collections::HashMap;

use indexmap::IndexMap;
use splitpack_core::hash::fingerprint_handles;
use splitpack_core::types::{ChunkId, ModuleId, ModuleReason};
use splitpack_core::Compilation;

use crate::module_set::{sets_equal, ModuleSet};
use crate::usage_collector::EntryUsage;

pub const EXTRACTED_CHUNK_REASON: &str = "extracted remaining shared modules";

/// What happened to one entry's shared-dependency slot
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PartitionOutcome {
  /// The entry uses every shared module and stays on the shared chunk
  KeptShared,
  /// The entry moved to a chunk created earlier in the pass for an identical module subset
  Reused(ChunkId),
  /// A new chunk was created holding exactly the shared modules the entry uses
  Created(ChunkId),
  /// The entry uses none of the shared modules and lost the shared chunk
  Detached,
}

/// Summary of a partition pass
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PartitionReport {
  /// None when the compilation had no shared chunk, in which case nothing was changed
  pub shared_chunk: Option<ChunkId>,
  pub outcomes: IndexMap<String, PartitionOutcome>,
  pub created_chunks: Vec<ChunkId>,
  /// Modules disconnected from the shared chunk because no attached entry needs them
  pub released_modules: Vec<ModuleId>,
  pub shared_chunk_removed: bool,
}

/// Chunks created during one pass, keyed by their exact module membership
#[derive(Debug, Default)]
pub struct DedupRegistry {
  entries: Vec<(ChunkId, ModuleSet)>,
  by_fingerprint: HashMap<u64, Vec<usize>>,
}

impl DedupRegistry {
  pub fn register(&mut self, chunk_id: ChunkId, modules: ModuleSet) {
    let fingerprint = fingerprint_handles(modules.iter().copied());
    self
      .by_fingerprint
      .entry(fingerprint)
      .or_default()
      .push(self.entries.len());
    self.entries.push((chunk_id, modules));
  }

  /// First registered chunk whose module set equals `modules`
  pub fn find(&self, modules: &ModuleSet) -> Option<ChunkId> {
    let fingerprint = fingerprint_handles(modules.iter().copied());

    self
      .by_fingerprint
      .get(&fingerprint)?
      .iter()
      .map(|index| &self.entries[*index])
      .find(|(_, candidate)| sets_equal(candidate, modules))
      .map(|(chunk_id, _)| *chunk_id)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Splits the shared chunk so each entry in `usage` only loads the shared modules it uses.
///
/// Entries are processed in `usage` order; that order decides which entry names a chunk that
/// several entries end up sharing. Entries absent from `usage` keep their chunks untouched.
///
/// The pass is a silent no-op when no chunk is named `shared_chunk_name`.
#[tracing::instrument(level = "debug", skip_all, fields(shared_chunk = shared_chunk_name))]
pub fn partition(
  compilation: &mut Compilation,
  usage: &EntryUsage,
  shared_chunk_name: &str,
) -> PartitionReport {
  let mut report = PartitionReport::default();

  let Some(shared_chunk_id) = compilation.chunk_by_name(shared_chunk_name) else {
    tracing::debug!("No shared chunk found, nothing to partition");
    return report;
  };
  report.shared_chunk = Some(shared_chunk_id);

  let shared_modules = compilation
    .chunk(shared_chunk_id)
    .map(|chunk| chunk.modules().collect::<ModuleSet>())
    .unwrap_or_default();

  let mut registry = DedupRegistry::default();

  for (entry_name, used_modules) in usage {
    let outcome = partition_entry(
      compilation,
      &mut registry,
      shared_chunk_id,
      &shared_modules,
      entry_name,
      used_modules,
    );

    if let PartitionOutcome::Created(chunk_id) = outcome {
      report.created_chunks.push(chunk_id);
    }
    report.outcomes.insert(entry_name.clone(), outcome);
  }

  report.released_modules = release_unneeded_modules(compilation, shared_chunk_id, usage);

  let shared_is_empty = compilation
    .chunk(shared_chunk_id)
    .is_some_and(|chunk| chunk.is_empty());
  if shared_is_empty {
    remove_shared_chunk(compilation, shared_chunk_id);
    report.shared_chunk_removed = true;
  }

  report
}

fn partition_entry(
  compilation: &mut Compilation,
  registry: &mut DedupRegistry,
  shared_chunk_id: ChunkId,
  shared_modules: &ModuleSet,
  entry_name: &str,
  used_modules: &ModuleSet,
) -> PartitionOutcome {
  let remaining = shared_modules
    .iter()
    .copied()
    .filter(|module_id| used_modules.contains(module_id))
    .collect::<ModuleSet>();

  for module_id in shared_modules.difference(&remaining) {
    compilation.remove_module_reasons(*module_id, |reason| {
      reason.is_from_chunk(shared_chunk_id) && reason.source_entry.as_deref() == Some(entry_name)
    });
  }

  if sets_equal(&remaining, shared_modules) {
    tracing::debug!(entry = entry_name, "Entry uses every shared module, keeping shared chunk");
    compilation.connect_entrypoint_and_chunk(entry_name, shared_chunk_id);
    return PartitionOutcome::KeptShared;
  }

  compilation.disconnect_entrypoint_and_chunk(entry_name, shared_chunk_id);

  if remaining.is_empty() {
    tracing::debug!(entry = entry_name, "Entry uses no shared modules");
    return PartitionOutcome::Detached;
  }

  if let Some(existing_chunk_id) = registry.find(&remaining) {
    tracing::debug!(
      entry = entry_name,
      chunk_id = existing_chunk_id,
      modules = remaining.len(),
      "Reusing extracted chunk with identical modules"
    );
    compilation.connect_entrypoint_and_chunk(entry_name, existing_chunk_id);
    notify_chunk_for_entry(compilation, entry_name, existing_chunk_id);
    return PartitionOutcome::Reused(existing_chunk_id);
  }

  let chunk_id = compilation.add_chunk(format!("{entry_name}-vendors"));
  if let Some(chunk) = compilation.chunk_mut(chunk_id) {
    chunk.chunk_reason = Some(EXTRACTED_CHUNK_REASON.to_string());
  }

  for module_id in &remaining {
    compilation.connect_chunk_and_module(chunk_id, *module_id);
    compilation.add_module_reason(*module_id, ModuleReason::entry(chunk_id, entry_name));
  }

  tracing::debug!(
    entry = entry_name,
    chunk_id,
    modules = remaining.len(),
    "Created chunk for remaining shared modules"
  );

  registry.register(chunk_id, remaining);
  compilation.connect_entrypoint_and_chunk(entry_name, chunk_id);

  notify_chunk_for_entry(compilation, entry_name, chunk_id);

  PartitionOutcome::Created(chunk_id)
}

/// Tells manifest listeners the entry now loads `chunk_id`, whether it was created for this
/// entry or reused from an earlier one
fn notify_chunk_for_entry(compilation: &Compilation, entry_name: &str, chunk_id: ChunkId) {
  if let Some(chunk) = compilation.chunk(chunk_id) {
    compilation
      .hooks()
      .call_chunk_created_for_entry(entry_name, chunk);
  }
}

/// Disconnects shared modules that no entry still loading the shared chunk needs, then strips
/// the shared chunk's own attribution from the modules that stay.
///
/// Modules without a resource are never in any usage set and are never released, so they keep
/// the shared chunk alive.
///
/// Entries still attached but absent from `usage` were never inspected, so every shared module
/// is kept for them.
fn release_unneeded_modules(
  compilation: &mut Compilation,
  shared_chunk_id: ChunkId,
  usage: &EntryUsage,
) -> Vec<ModuleId> {
  let Some(shared_chunk) = compilation.chunk(shared_chunk_id) else {
    return Vec::new();
  };

  let mut needed = ModuleSet::new();
  let mut keep_all = false;
  for entry_name in shared_chunk.groups() {
    match usage.get(entry_name) {
      Some(used_modules) => needed.extend(used_modules.iter().copied()),
      None => keep_all = true,
    }
  }

  let released = if keep_all {
    Vec::new()
  } else {
    shared_chunk
      .modules()
      .filter(|module_id| !needed.contains(module_id))
      .filter(|module_id| {
        compilation
          .module(*module_id)
          .is_some_and(|module| module.is_concrete())
      })
      .collect::<Vec<_>>()
  };

  for module_id in &released {
    compilation.disconnect_chunk_and_module(shared_chunk_id, *module_id);
    compilation.remove_module_reasons(*module_id, |reason| reason.is_from_chunk(shared_chunk_id));
  }

  let kept = compilation
    .chunk(shared_chunk_id)
    .map(|chunk| chunk.modules().collect::<Vec<_>>())
    .unwrap_or_default();

  for module_id in kept {
    compilation.remove_module_reasons(module_id, |reason| {
      reason.is_from_chunk(shared_chunk_id) && reason.source_entry.is_none()
    });
  }

  if !released.is_empty() {
    tracing::debug!(modules = released.len(), "Released modules from shared chunk");
  }

  released
}

fn remove_shared_chunk(compilation: &mut Compilation, shared_chunk_id: ChunkId) {
  let files = compilation
    .chunk(shared_chunk_id)
    .map(|chunk| chunk.files.clone())
    .unwrap_or_default();

  for file in &files {
    compilation.delete_asset(file);
  }

  if let Some(chunk) = compilation.remove_chunk(shared_chunk_id) {
    tracing::info!(chunk = %chunk.name, files = files.len(), "Removed empty shared chunk");
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;
  use pretty_assertions::assert_eq;
  use splitpack_core::hooks::ChunkCreatedListener;
  use splitpack_core::manifest::ManifestChunks;
  use splitpack_core::types::Chunk;
  use splitpack_test_fixtures::CompilationFixture;

  use super::*;
  use crate::usage_collector::collect_usage;
  use crate::TargetEntries;

  /// Entries are declared with their dependencies in their own chunk, usage is collected, then
  /// every `node_modules` dependency is moved into a shared `vendors` chunk.
  fn split(entries: &[(&str, &[&str])], targets: &TargetEntries) -> (CompilationFixture, EntryUsage) {
    let mut fixture = CompilationFixture::new();
    for (name, modules) in entries {
      fixture.entry(name, modules);
    }

    let usage = collect_usage(&fixture.compilation, targets);
    fixture.extract_shared_chunk("vendors", "node_modules");

    (fixture, usage)
  }

  fn chunk_modules(fixture: &CompilationFixture, chunk_id: ChunkId) -> ModuleSet {
    fixture
      .compilation
      .chunk(chunk_id)
      .map(|chunk| chunk.modules().collect())
      .unwrap_or_default()
  }

  fn chunk_names(fixture: &CompilationFixture, entry_name: &str) -> Vec<String> {
    let compilation = &fixture.compilation;
    compilation
      .entrypoint(entry_name)
      .map(|entrypoint| {
        entrypoint
          .chunks()
          .iter()
          .filter_map(|chunk_id| compilation.chunk(*chunk_id))
          .map(|chunk| chunk.name.clone())
          .collect()
      })
      .unwrap_or_default()
  }

  #[derive(Debug, Default)]
  struct RecordingListener {
    calls: Mutex<Vec<(String, String)>>,
  }

  impl ChunkCreatedListener for RecordingListener {
    fn on_chunk_created_for_entry(&self, entry_name: &str, chunk: &Chunk) {
      self
        .calls
        .lock()
        .push((entry_name.to_string(), chunk.name.clone()));
    }
  }

  #[test]
  fn shared_subsets_are_deduplicated_and_empty_shared_chunk_is_removed() {
    let (mut fixture, usage) = split(
      &[("x", &["m1", "m2"]), ("y", &["m1", "m2"]), ("z", &["m3"])],
      &TargetEntries::All,
    );
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();
    assert!(fixture.compilation.asset("js/vendors.js").is_some());

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    let x_vendors = fixture.compilation.chunk_by_name("x-vendors").unwrap();
    let z_vendors = fixture.compilation.chunk_by_name("z-vendors").unwrap();

    assert_eq!(report.shared_chunk, Some(vendors));
    assert_eq!(
      report.outcomes,
      IndexMap::from([
        (String::from("x"), PartitionOutcome::Created(x_vendors)),
        (String::from("y"), PartitionOutcome::Reused(x_vendors)),
        (String::from("z"), PartitionOutcome::Created(z_vendors)),
      ])
    );
    assert_eq!(report.created_chunks, vec![x_vendors, z_vendors]);
    assert!(report.shared_chunk_removed);

    assert_eq!(chunk_modules(&fixture, x_vendors), fixture.module_set(&["m1", "m2"]));
    assert_eq!(chunk_modules(&fixture, z_vendors), fixture.module_set(&["m3"]));
    assert_eq!(chunk_names(&fixture, "x"), vec!["x", "x-vendors"]);
    assert_eq!(chunk_names(&fixture, "y"), vec!["y", "x-vendors"]);
    assert_eq!(chunk_names(&fixture, "z"), vec!["z", "z-vendors"]);

    assert_eq!(fixture.compilation.chunk(vendors), None);
    assert_eq!(fixture.compilation.chunk_by_name("vendors"), None);
    assert!(fixture.compilation.asset("js/vendors.js").is_none());
    assert!(fixture.compilation.validate().is_ok());
  }

  #[test]
  fn full_usage_entry_keeps_the_shared_chunk() {
    let (mut fixture, usage) = split(
      &[("w", &["m1", "m2", "m3"]), ("x", &["m1", "m2"]), ("z", &["m3"])],
      &TargetEntries::All,
    );
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.outcomes["w"], PartitionOutcome::KeptShared);
    assert!(!report.shared_chunk_removed);
    assert_eq!(report.released_modules, Vec::<ModuleId>::new());
    assert_eq!(chunk_names(&fixture, "w"), vec!["w", "vendors"]);
    assert_eq!(
      chunk_modules(&fixture, vendors),
      fixture.module_set(&["m1", "m2", "m3"])
    );
    assert_eq!(
      fixture.compilation.chunk(vendors).unwrap().groups().collect::<Vec<_>>(),
      vec!["w"]
    );
    assert!(fixture.compilation.asset("js/vendors.js").is_some());
    assert!(fixture.compilation.validate().is_ok());
  }

  #[test]
  fn entries_needing_everything_share_the_original_chunk() {
    let (mut fixture, usage) = split(
      &[("a", &["m1", "m2"]), ("b", &["m2", "m1"])],
      &TargetEntries::All,
    );
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.created_chunks, Vec::<ChunkId>::new());
    assert!(fixture.compilation.entrypoint("a").unwrap().has_chunk(vendors));
    assert!(fixture.compilation.entrypoint("b").unwrap().has_chunk(vendors));
    assert_eq!(fixture.compilation.chunks().count(), 3);
  }

  #[test]
  fn disjoint_subsets_get_distinct_chunks() {
    let (mut fixture, usage) = split(
      &[("a", &["m1"]), ("b", &["m2"]), ("c", &["m3"])],
      &TargetEntries::All,
    );

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.created_chunks.len(), 3);
    for (entry_name, module_name) in [("a", "m1"), ("b", "m2"), ("c", "m3")] {
      let PartitionOutcome::Created(chunk_id) = report.outcomes[entry_name] else {
        panic!("expected a new chunk for {entry_name}");
      };
      assert_eq!(
        chunk_modules(&fixture, chunk_id),
        fixture.module_set(&[module_name])
      );
      assert_eq!(
        fixture.compilation.chunk(chunk_id).unwrap().chunk_reason.as_deref(),
        Some(EXTRACTED_CHUNK_REASON)
      );
    }
  }

  #[test]
  fn entries_without_shared_modules_attach_nothing() {
    let (mut fixture, usage) = split(
      &[("a", &["m1", "m2"]), ("plain", &[])],
      &TargetEntries::All,
    );
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();
    // Attached the way a host attaches the shared chunk to every entry in its group
    fixture.compilation.connect_entrypoint_and_chunk("plain", vendors);

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.outcomes["plain"], PartitionOutcome::Detached);
    assert_eq!(chunk_names(&fixture, "plain"), vec!["plain"]);
    assert_eq!(report.outcomes["a"], PartitionOutcome::KeptShared);
  }

  #[test]
  fn filtered_out_entries_keep_their_chunks() {
    let targets = TargetEntries::only(vec![String::from("a")]);
    let (mut fixture, usage) = split(&[("a", &["m1"]), ("b", &["m1", "m2"])], &targets);
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();
    let b_before = fixture.compilation.entrypoint("b").unwrap().clone();

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.outcomes.keys().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(fixture.compilation.entrypoint("b"), Some(&b_before));
    assert_eq!(chunk_modules(&fixture, vendors), fixture.module_set(&["m1", "m2"]));
    assert!(!report.shared_chunk_removed);
    assert_eq!(chunk_names(&fixture, "a"), vec!["a", "a-vendors"]);
  }

  #[test]
  fn unused_modules_lose_the_shared_chunk_reason() {
    let (mut fixture, usage) = split(
      &[("w", &["m1", "m2"]), ("x", &["m1"])],
      &TargetEntries::All,
    );
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();
    let m2 = fixture.id("m2");

    partition(&mut fixture.compilation, &usage, "vendors");

    let reasons = fixture.compilation.module(m2).unwrap().reasons().to_vec();
    assert!(reasons.contains(&ModuleReason::entry(vendors, "w")));
    assert!(!reasons.contains(&ModuleReason::entry(vendors, "x")));
    assert!(!reasons.contains(&ModuleReason::chunk(vendors)));
  }

  #[test]
  fn released_modules_drop_every_shared_chunk_reason() {
    let (mut fixture, usage) = split(&[("x", &["m1"]), ("y", &["m2"])], &TargetEntries::All);
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();
    let m1 = fixture.id("m1");

    let report = partition(&mut fixture.compilation, &usage, "vendors");
    let x_vendors = fixture.compilation.chunk_by_name("x-vendors").unwrap();

    assert_eq!(report.released_modules, vec![m1, fixture.id("m2")]);
    assert_eq!(
      fixture.compilation.module(m1).unwrap().reasons(),
      &[ModuleReason::entry(x_vendors, "x")]
    );
    assert!(!fixture.compilation.module(m1).unwrap().is_in_chunk(vendors));
  }

  #[test]
  fn notifies_listeners_for_created_and_reused_chunks() {
    let (mut fixture, usage) = split(
      &[("x", &["m1"]), ("y", &["m1"]), ("w", &["m1", "m2"])],
      &TargetEntries::All,
    );
    let listener = Arc::new(RecordingListener::default());
    fixture
      .compilation
      .hooks_mut()
      .tap_chunk_created_for_entry(listener.clone());

    partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(
      *listener.calls.lock(),
      vec![
        (String::from("x"), String::from("x-vendors")),
        (String::from("y"), String::from("x-vendors")),
      ]
    );
  }

  #[test]
  fn resource_less_modules_stay_in_the_shared_chunk() {
    let (mut fixture, usage) = split(&[("x", &["m1"]), ("y", &["m2"])], &TargetEntries::All);
    let vendors = fixture.compilation.chunk_by_name("vendors").unwrap();
    let concatenated = fixture.runtime_module("concatenated");
    fixture
      .compilation
      .connect_chunk_and_module(vendors, concatenated);

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.released_modules, vec![fixture.id("m1"), fixture.id("m2")]);
    assert!(!report.shared_chunk_removed);
    assert_eq!(chunk_modules(&fixture, vendors), ModuleSet::from([concatenated]));
    assert!(fixture
      .compilation
      .module(concatenated)
      .unwrap()
      .is_in_chunk(vendors));
    assert!(fixture.compilation.asset("js/vendors.js").is_some());
    assert!(fixture.compilation.validate().is_ok());
  }

  #[test]
  fn manifests_include_chunks_created_for_their_entries() {
    let (mut fixture, usage) = split(&[("a", &["m1"]), ("b", &["m2"])], &TargetEntries::All);
    let manifests = Arc::new(ManifestChunks::new());
    manifests.register("a.html", vec![String::from("a")]);
    manifests.register("b.html", vec![String::from("b")]);
    fixture
      .compilation
      .hooks_mut()
      .tap_chunk_created_for_entry(manifests.clone());

    partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(
      manifests.chunks_for("a.html"),
      Some(vec![String::from("a"), String::from("a-vendors")])
    );
    assert_eq!(
      manifests.chunks_for("b.html"),
      Some(vec![String::from("b"), String::from("b-vendors")])
    );
  }

  #[test]
  fn manifests_include_reused_chunks() {
    let (mut fixture, usage) = split(
      &[("x", &["m1", "m2"]), ("y", &["m1", "m2"]), ("z", &["m3"])],
      &TargetEntries::All,
    );
    let manifests = Arc::new(ManifestChunks::new());
    manifests.register("y.html", vec![String::from("y")]);
    fixture
      .compilation
      .hooks_mut()
      .tap_chunk_created_for_entry(manifests.clone());

    partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(
      manifests.chunks_for("y.html"),
      Some(vec![String::from("y"), String::from("x-vendors")])
    );
  }

  #[test]
  fn missing_shared_chunk_is_a_no_op() {
    let mut fixture = CompilationFixture::new();
    fixture.entry("a", &["m1"]);
    let usage = collect_usage(&fixture.compilation, &TargetEntries::All);
    let before = chunk_names(&fixture, "a");

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report, PartitionReport::default());
    assert_eq!(chunk_names(&fixture, "a"), before);
    assert_eq!(fixture.compilation.chunks().count(), 1);
  }

  #[test]
  fn empty_usage_only_prunes_an_empty_shared_chunk() {
    let mut fixture = CompilationFixture::new();
    fixture.entry("a", &[]);
    let vendors = fixture.chunk("vendors", &[]);
    fixture.compilation.connect_entrypoint_and_chunk("a", vendors);
    let usage = collect_usage(&fixture.compilation, &TargetEntries::All);

    let report = partition(&mut fixture.compilation, &usage, "vendors");

    assert_eq!(report.outcomes["a"], PartitionOutcome::KeptShared);
    assert!(report.shared_chunk_removed);
    assert_eq!(chunk_names(&fixture, "a"), vec!["a"]);
  }

  #[test]
  fn registry_matches_by_membership() {
    let mut registry = DedupRegistry::default();
    registry.register(7, ModuleSet::from([1, 2, 3]));
    registry.register(8, ModuleSet::from([4]));

    assert_eq!(registry.find(&ModuleSet::from([3, 2, 1])), Some(7));
    assert_eq!(registry.find(&ModuleSet::from([4])), Some(8));
    assert_eq!(registry.find(&ModuleSet::from([1, 2])), None);
    assert_eq!(registry.len(), 2);
  }
}
